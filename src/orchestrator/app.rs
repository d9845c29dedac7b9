//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：打开数据目录，加载题库、用户、知识点
//! 2. **命令分发**：把一条命令交给对应的服务或流程
//! 3. **身份传递**：从会话中取出当前操作者，显式传给需要身份的操作
//! 4. **结果输出**：打印列表、统计信息和导出路径

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ExportError, IdentityError, IntakeError};
use crate::infrastructure::{BlobStore, FileBlobStore};
use crate::models::{Identity, Question, QuestionFilter, UploadedFile};
use crate::orchestrator::command::Command;
use crate::services::export::{export_word, ExamBuilder, ExportPayload, PdfExporter};
use crate::services::{IdentityService, KnowledgeBase, LlmService, OcrProvider, QuestionStore, RemoveOutcome};
use crate::utils::logging::log_startup;
use crate::utils::truncate_text;
use crate::workflow::{save_single, FileOutcome, IntakeBatch, IntakeFlow};

/// 应用主结构
pub struct App {
    config: Config,
    questions: QuestionStore,
    identity: IdentityService,
    knowledge: KnowledgeBase,
}

impl App {
    /// 初始化应用，数据保存在 `data_dir`
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.data_dir, &config.llm_model_name);
        let store = FileBlobStore::open(&config.data_dir)
            .with_context(|| format!("无法打开数据目录 {}", config.data_dir))?;
        Self::with_store(config, Arc::new(store))
    }

    /// 使用指定的存储初始化应用
    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        let questions = QuestionStore::open(Arc::clone(&store)).context("加载题库失败")?;
        let identity = IdentityService::open(Arc::clone(&store)).context("加载用户数据失败")?;
        let knowledge = KnowledgeBase::open(store).context("加载知识点失败")?;
        Ok(Self {
            config,
            questions,
            identity,
            knowledge,
        })
    }

    pub fn questions(&self) -> &QuestionStore {
        &self.questions
    }

    pub fn identity(&self) -> &IdentityService {
        &self.identity
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// 当前登录的操作者
    pub fn require_session(&self) -> Result<Identity> {
        self.identity
            .current_session()
            .context("请先登录（exam_bank login <用户名> <密码>）")
    }

    /// 执行一条命令
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Register { username, secret } => {
                let user = self.identity.register(&username, &secret)?;
                self.identity.set_session(Some(&user))?;
                println!("注册成功，已登录为 {}", Identity::from(&user));
            }
            Command::Login { username, secret } => {
                let user = self.identity.login(&username, &secret)?;
                self.identity.set_session(Some(&user))?;
                println!("已登录为 {}", Identity::from(&user));
            }
            Command::Logout => {
                self.identity.set_session(None)?;
                println!("已退出登录");
            }
            Command::WhoAmI => match self.identity.current_session() {
                Some(identity) => println!("{}", identity),
                None => println!("未登录"),
            },
            Command::Users => {
                let identity = self.require_session()?;
                for user in self.identity.list_users(&identity)? {
                    println!("{}\t{}\t{:?}\t{}", user.id, user.username, user.role, user.created_at.format("%Y-%m-%d"));
                }
            }
            Command::UserRemove { user_id } => {
                let identity = self.require_session()?;
                if self.identity.delete_user(&identity, &user_id)? {
                    println!("已删除用户 {}", user_id);
                } else {
                    println!("用户 {} 不存在", user_id);
                }
            }
            Command::List { keywords } => {
                let filter = if keywords.is_empty() {
                    QuestionFilter::default()
                } else {
                    QuestionFilter::keyword(keywords.join(" "))
                };
                let questions = self.questions.filter(&filter);
                for q in &questions {
                    print_question(q);
                }
                println!("共 {} 道题", questions.len());
            }
            Command::Remove { id } => {
                let identity = self.require_session()?;
                match self.questions.remove(&id, &identity)? {
                    RemoveOutcome::Removed => println!("已删除题目 {}", id),
                    RemoveOutcome::NotFound => println!("题目 {} 不存在", id),
                    RemoveOutcome::Denied => {
                        return Err(IdentityError::PermissionDenied(format!("删除题目 {}", id)).into())
                    }
                }
            }
            Command::Topics => {
                for node in self.knowledge.tree()? {
                    println!("{}\t{}", node.id, node.name);
                    for sub in &node.children {
                        println!("  {}\t{}", sub.id, sub.name);
                    }
                }
            }
            Command::TopicAdd { name } => {
                let node = self.knowledge.add_topic(&name)?;
                println!("已新增知识点 {} ({})", node.name, node.id);
            }
            Command::SubPointAdd { topic_id, name } => {
                let sub = self.knowledge.add_sub_point(&topic_id, &name)?;
                println!("已新增子知识点 {} ({})", sub.name, sub.id);
            }
            Command::SubPointRename { topic_id, sub_id, name } => {
                self.knowledge.rename_sub_point(&topic_id, &sub_id, &name)?;
                println!("已重命名子知识点 {}", sub_id);
            }
            Command::SubPointRemove { topic_id, sub_id } => {
                self.knowledge.remove_sub_point(&topic_id, &sub_id)?;
                println!("已删除子知识点 {}", sub_id);
            }
            Command::Import { files } => {
                let identity = self.require_session()?;
                let batch = self
                    .import_paths(LlmService::new(&self.config), &files, &identity)
                    .await?;
                for outcome in &batch.outcomes {
                    if let FileOutcome::FileError { file_name, error } = outcome {
                        println!("✗ {}: {}", file_name, error);
                    }
                }
            }
            Command::ExportWord { title, ids } => {
                let questions = self.select_for_export(&ids)?;
                let author = self.identity.current_session().map(|i| i.username);
                let payload = export_word(&questions, &title, author.as_deref())?;
                self.write_export(&payload)?;
            }
            Command::ExportPdf { title, ids } => {
                let questions = self.select_for_export(&ids)?;
                let author = self.identity.current_session().map(|i| i.username);
                let payload = PdfExporter::new(&self.config)
                    .export(&questions, &title, author.as_deref())
                    .await?;
                self.write_export(&payload)?;
            }
        }
        Ok(())
    }

    /// 从磁盘读取文件后导入
    ///
    /// 读取失败的文件记为该文件的错误，其余文件照常处理
    pub async fn import_paths<P: OcrProvider>(
        &self,
        provider: P,
        paths: &[PathBuf],
        identity: &Identity,
    ) -> Result<IntakeBatch> {
        let mut uploads = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in paths {
            match read_upload(path) {
                Ok(upload) => uploads.push(upload),
                Err(error) => {
                    warn!("❌ {}", error);
                    unreadable.push(FileOutcome::FileError {
                        file_name: path.display().to_string(),
                        error,
                    });
                }
            }
        }

        let mut batch = self.import_files(provider, &uploads, identity).await?;
        batch.outcomes.extend(unreadable);
        Ok(batch)
    }

    /// 识别一批文件，并把全部草稿保存进题库
    ///
    /// 重试后公式仍有问题的草稿同样保存，并在日志中提示人工检查
    pub async fn import_files<P: OcrProvider>(
        &self,
        provider: P,
        files: &[UploadedFile],
        identity: &Identity,
    ) -> Result<IntakeBatch> {
        let flow = IntakeFlow::new(provider, &self.config);
        let mut batch = flow.run_batch(files).await;

        for draft in batch.drafts.iter_mut() {
            if draft.has_error {
                warn!(
                    "⚠️ {} 第 {} 题公式可能有误，请人工检查: {}",
                    draft.source_name,
                    draft.item_index + 1,
                    draft.last_error.as_deref().unwrap_or_default()
                );
            }
            save_single(draft, &self.questions, identity)?;
        }
        let saved = batch.prune_saved();
        info!("💾 共保存 {} 道题，题库现有 {} 道", saved, self.questions.count());
        Ok(batch)
    }

    /// 按命令参数选出要导出的题目，未指定时导出全部
    pub fn select_for_export(&self, ids: &[String]) -> Result<Vec<Question>> {
        let bank = self.questions.list();
        let mut builder = ExamBuilder::new();
        if ids.is_empty() {
            builder.select_all(&bank);
        } else {
            for id in ids {
                if !builder.is_selected(id) {
                    builder.toggle(id);
                }
            }
        }

        let selected = builder.selected(&bank);
        if selected.len() < builder.len() {
            warn!("⚠️ 有 {} 个题目 ID 不存在，已忽略", builder.len() - selected.len());
        }
        if !builder.can_export() || selected.is_empty() {
            return Err(ExportError::NoQuestionsSelected.into());
        }
        Ok(selected)
    }

    fn write_export(&self, payload: &ExportPayload) -> Result<()> {
        let path = payload.write_to(&self.config.export_dir)?;
        println!("已导出: {}", path.display());
        Ok(())
    }
}

fn read_upload(path: &Path) -> Result<UploadedFile, IntakeError> {
    let bytes = fs::read(path).map_err(|e| IntakeError::file_parse(path.display().to_string(), format!("无法读取文件: {}", e)))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, bytes))
}

fn print_question(q: &Question) {
    let difficulty = q.difficulty.name();
    let question_type = q.question_type.map(|t| t.name()).unwrap_or("-");
    let author = q.author_name.as_deref().unwrap_or("-");
    println!(
        "{}\t[{}|{}|{}]\t{}\t{}",
        q.id,
        q.category,
        difficulty,
        question_type,
        author,
        truncate_text(&q.content.replace('\n', " "), 40)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryBlobStore;
    use crate::models::{OcrItem, OcrRequest};
    use async_trait::async_trait;

    /// 每个文件都识别出同一道题
    struct OneItemProvider;

    #[async_trait]
    impl OcrProvider for OneItemProvider {
        async fn recognize(&self, _request: &OcrRequest, _is_retry: bool) -> Result<Vec<OcrItem>, IntakeError> {
            Ok(vec![OcrItem::new("$x=1$", "x=1")])
        }

        fn model_name(&self) -> &str {
            "one-item"
        }
    }

    fn app() -> App {
        App::with_store(Config::default(), Arc::new(MemoryBlobStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_register_logs_in() {
        let app = app();
        app.run(Command::Register {
            username: "alice".to_string(),
            secret: "pw".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(app.require_session().unwrap().username, "alice");

        app.run(Command::Logout).await.unwrap();
        assert!(app.require_session().is_err());
    }

    #[tokio::test]
    async fn test_remove_by_other_user_is_denied() {
        let app = app();
        app.questions()
            .upsert(Question::new("q1", "题目").with_owner("someone", "bob"))
            .unwrap();
        app.run(Command::Register {
            username: "alice".to_string(),
            secret: "pw".to_string(),
        })
        .await
        .unwrap();

        assert!(app.run(Command::Remove { id: "q1".to_string() }).await.is_err());
        assert_eq!(app.questions().count(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_stop_import() {
        let app = app();
        let alice = app.identity().register("alice", "pw").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let scan = dir.path().join("scan.png");
        fs::write(&scan, [0x89, b'P', b'N', b'G']).unwrap();
        let missing = dir.path().join("missing.png");

        let batch = app
            .import_paths(OneItemProvider, &[missing, scan], &Identity::from(&alice))
            .await
            .unwrap();

        assert_eq!(batch.failed_files(), 1);
        assert_eq!(batch.outcomes.len(), 2);
        let failed = batch.outcomes.iter().find(|o| o.is_error()).unwrap();
        assert!(failed.file_name().ends_with("missing.png"));
        assert!(matches!(
            failed,
            FileOutcome::FileError {
                error: IntakeError::FileParseError { .. },
                ..
            }
        ));
        assert_eq!(app.questions().count(), 1);
    }

    #[test]
    fn test_select_for_export() {
        let app = app();
        assert!(app.select_for_export(&[]).is_err());

        app.questions().upsert(Question::new("q1", "一")).unwrap();
        app.questions().upsert(Question::new("q2", "二")).unwrap();
        assert_eq!(app.select_for_export(&[]).unwrap().len(), 2);

        let ids = vec!["q1".to_string(), "missing".to_string()];
        let selected = app.select_for_export(&ids).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "q1");

        assert!(app.select_for_export(&["missing".to_string()]).is_err());
    }
}
