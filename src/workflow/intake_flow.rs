//! OCR 录入流程 - 流程层
//!
//! 核心职责：定义"一批文件"变成题目草稿、再保存进题库的完整流程
//!
//! 流程顺序：
//! 1. 文件预处理（base64 内联 / Word 提取文本）
//! 2. 识别 → 每道题生成一个草稿
//! 3. 公式校验失败 → 带重试提示重新识别，最多 `ocr_max_retries` 次
//! 4. 人工修改 → 单独保存进题库，保存后草稿只读

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, IntakeError};
use crate::models::{DraftEdit, DraftStatus, Identity, OcrDraft, OcrItem, Question, UploadedFile};
use crate::services::document::prepare_request;
use crate::services::latex;
use crate::services::{KnowledgeBase, OcrProvider, QuestionStore};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_file_start};
use crate::utils::truncate_text;
use crate::workflow::intake_ctx::IntakeCtx;

/// 单个文件的处理结果
#[derive(Debug)]
pub enum FileOutcome {
    /// 识别成功（可能为 0 道题）
    Drafted { file_name: String, drafts: usize },
    /// 该文件失败，不影响其余文件
    FileError { file_name: String, error: IntakeError },
}

impl FileOutcome {
    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Drafted { file_name, .. } | FileOutcome::FileError { file_name, .. } => file_name,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FileOutcome::FileError { .. })
    }
}

/// 一批文件的识别结果
#[derive(Debug, Default)]
pub struct IntakeBatch {
    pub drafts: Vec<OcrDraft>,
    pub outcomes: Vec<FileOutcome>,
}

impl IntakeBatch {
    pub fn draft(&self, id: &str) -> Option<&OcrDraft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    pub fn draft_mut(&mut self, id: &str) -> Option<&mut OcrDraft> {
        self.drafts.iter_mut().find(|d| d.id == id)
    }

    /// 重试后公式仍有问题的草稿数
    pub fn flagged_count(&self) -> usize {
        self.drafts.iter().filter(|d| d.has_error).count()
    }

    pub fn failed_files(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }

    /// 移除已保存的草稿
    pub fn prune_saved(&mut self) -> usize {
        let before = self.drafts.len();
        self.drafts.retain(|d| !d.is_saved());
        before - self.drafts.len()
    }

    /// 丢弃整批草稿
    pub fn clear(&mut self) {
        self.drafts.clear();
        self.outcomes.clear();
    }
}

/// OCR 录入流程
///
/// - 编排预处理、识别、校验、重试
/// - 决定何时重试、何时放弃
/// - 只依赖业务能力（services）
pub struct IntakeFlow<P: OcrProvider> {
    provider: P,
    max_retries: u32,
}

impl<P: OcrProvider> IntakeFlow<P> {
    /// 创建新的录入流程
    pub fn new(provider: P, config: &Config) -> Self {
        Self {
            provider,
            max_retries: config.ocr_max_retries,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 逐个处理一批文件
    ///
    /// 前一个文件的识别完全结束（成功或失败）后才开始下一个
    pub async fn run_batch(&self, files: &[UploadedFile]) -> IntakeBatch {
        let total = files.len();
        log_batch_start(total);

        let mut batch = IntakeBatch::default();
        for (i, file) in files.iter().enumerate() {
            let ctx = IntakeCtx::new(i + 1, total, &file.name);
            log_file_start(ctx.file_index, total, &file.name);

            match self.process_file(file, &ctx).await {
                Ok(drafts) => {
                    info!("{} ✅ 识别到 {} 道题", ctx, drafts.len());
                    batch.outcomes.push(FileOutcome::Drafted {
                        file_name: file.name.clone(),
                        drafts: drafts.len(),
                    });
                    batch.drafts.extend(drafts);
                }
                Err(error) => {
                    warn!("{} ❌ {}", ctx, error);
                    batch.outcomes.push(FileOutcome::FileError {
                        file_name: file.name.clone(),
                        error,
                    });
                }
            }
        }

        log_batch_complete(batch.drafts.len(), batch.flagged_count(), batch.failed_files(), total);
        batch
    }

    /// 处理单个文件：预处理 → 识别 → 逐题校验
    pub async fn process_file(&self, file: &UploadedFile, ctx: &IntakeCtx) -> Result<Vec<OcrDraft>, IntakeError> {
        let request = Arc::new(prepare_request(file)?);
        let items = self.provider.recognize(&request, false).await?;
        debug!("{} 模型 {} 返回 {} 项", ctx, self.provider.model_name(), items.len());

        let mut drafts = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let mut draft = OcrDraft::new(&file.name, index, item, Arc::clone(&request));
            self.validate_and_repair(&mut draft).await;
            drafts.push(draft);
        }
        Ok(drafts)
    }

    /// 校验草稿公式，不通过时重新识别，直到通过或次数用尽
    ///
    /// 重新识别调用失败同样计入次数
    pub async fn validate_and_repair(&self, draft: &mut OcrDraft) {
        if draft.is_saved() {
            return;
        }

        loop {
            match latex::validate_draft(&draft.text, &draft.formula) {
                Ok(()) => {
                    draft.status = DraftStatus::Drafted;
                    draft.has_error = false;
                    draft.last_error = None;
                    return;
                }
                Err(issue) => {
                    draft.last_error = Some(issue.to_string());
                    if draft.retry_count >= self.max_retries {
                        draft.status = DraftStatus::Exhausted;
                        draft.has_error = true;
                        warn!(
                            "⚠️ {} 第 {} 题重试 {} 次后公式仍有问题: {}",
                            draft.source_name,
                            draft.item_index + 1,
                            draft.retry_count,
                            issue
                        );
                        return;
                    }
                }
            }

            draft.status = DraftStatus::Retrying;
            draft.retry_count += 1;
            info!(
                "🔁 {} 第 {} 题公式校验失败，第 {}/{} 次重新识别",
                draft.source_name,
                draft.item_index + 1,
                draft.retry_count,
                self.max_retries
            );

            match self.provider.recognize(draft.source(), true).await {
                Ok(items) => match pick_retry_item(items, draft.item_index) {
                    Some(item) => {
                        debug!("重新识别结果: {}", truncate_text(&item.text, 60));
                        draft.text = item.text;
                        draft.formula = item.latex;
                    }
                    None => debug!("重新识别结果中没有对应的题目，保留原结果"),
                },
                Err(e) => warn!("⚠️ 重新识别失败: {}", e),
            }
        }
    }

    /// 人工修改后重新校验，剩余重试次数继续有效
    pub async fn revalidate(&self, draft: &mut OcrDraft) -> Result<(), IntakeError> {
        ensure_editable(draft)?;
        self.validate_and_repair(draft).await;
        Ok(())
    }
}

/// 重新识别时取回对应的那道题
///
/// 结果数量变化时，只有唯一一道题才认为是同一道
fn pick_retry_item(mut items: Vec<OcrItem>, index: usize) -> Option<OcrItem> {
    if index < items.len() {
        Some(items.swap_remove(index))
    } else if items.len() == 1 {
        items.pop()
    } else {
        None
    }
}

fn ensure_editable(draft: &OcrDraft) -> Result<(), IntakeError> {
    if draft.is_saved() {
        Err(IntakeError::DraftReadOnly(draft.id.clone()))
    } else {
        Ok(())
    }
}

/// 人工修改草稿
///
/// 分类必须在当前知识点集合中；修改题干或公式后立即重新校验，但不会自动重试
pub fn edit_draft(draft: &mut OcrDraft, edit: DraftEdit, knowledge: &KnowledgeBase) -> AppResult<()> {
    ensure_editable(draft)?;

    if let Some(category) = &edit.category {
        if !knowledge.contains(category)? {
            return Err(IntakeError::UnknownCategory(category.clone()).into());
        }
    }

    let math_changed = edit.text.is_some() || edit.formula.is_some();
    if let Some(text) = edit.text {
        draft.text = text;
    }
    if let Some(formula) = edit.formula {
        draft.formula = formula;
    }
    if let Some(category) = edit.category {
        draft.category = category;
    }
    if let Some(question_type) = edit.question_type {
        draft.question_type = question_type;
    }
    if let Some(difficulty) = edit.difficulty {
        draft.difficulty = difficulty;
    }
    if let Some(tags) = edit.tags {
        draft.tags = tags;
    }

    if math_changed {
        match latex::validate_draft(&draft.text, &draft.formula) {
            Ok(()) => {
                draft.has_error = false;
                draft.last_error = None;
                draft.status = DraftStatus::Drafted;
            }
            Err(issue) => {
                draft.has_error = true;
                draft.last_error = Some(issue.to_string());
            }
        }
    }
    Ok(())
}

/// 保存单个草稿进题库
///
/// 公式有问题的草稿同样可以保存；保存后草稿只读
pub fn save_single(draft: &mut OcrDraft, store: &QuestionStore, identity: &Identity) -> AppResult<Question> {
    ensure_editable(draft)?;

    let mut question = Question::new(uuid::Uuid::new_v4().to_string(), draft.text.clone())
        .with_owner(&identity.user_id, &identity.username);
    question.formula = Some(draft.formula.trim().to_string()).filter(|f| !f.is_empty());
    question.tags = draft.tags.clone();
    question.category = draft.category.clone();
    question.question_type = draft.question_type;
    question.difficulty = draft.difficulty;

    store.upsert(question.clone())?;

    draft.status = DraftStatus::Saved;
    draft.saved_question_id = Some(question.id.clone());
    info!("💾 {} 第 {} 题已保存 ({})", draft.source_name, draft.item_index + 1, question.id);
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::infrastructure::MemoryBlobStore;
    use crate::models::{Difficulty, QuestionType, Role, UNCATEGORIZED};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预设结果的识别服务
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<Vec<OcrItem>, IntakeError>>>,
        calls: Mutex<Vec<bool>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<Vec<OcrItem>, IntakeError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<bool> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OcrProvider for ScriptedProvider {
        async fn recognize(&self, _request: &crate::models::OcrRequest, is_retry: bool) -> Result<Vec<OcrItem>, IntakeError> {
            self.calls.lock().unwrap().push(is_retry);
            self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn flow(replies: Vec<Result<Vec<OcrItem>, IntakeError>>) -> IntakeFlow<ScriptedProvider> {
        IntakeFlow::new(ScriptedProvider::new(replies), &Config::default())
    }

    fn image(name: &str) -> UploadedFile {
        UploadedFile::new(name, vec![0x89, b'P', b'N', b'G'])
    }

    fn alice() -> Identity {
        Identity {
            user_id: "u-alice".to_string(),
            username: "alice".to_string(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_single_image_becomes_one_draft() {
        let flow = flow(vec![Ok(vec![OcrItem::new("$x=1$", "x=1")])]);
        let batch = flow.run_batch(&[image("q.png")]).await;

        assert_eq!(batch.drafts.len(), 1);
        let draft = &batch.drafts[0];
        assert_eq!(draft.status, DraftStatus::Drafted);
        assert_eq!(draft.category, UNCATEGORIZED);
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.question_type, None);
        assert!(draft.tags.is_empty());
        assert_eq!(draft.retry_count, 0);
        assert_eq!(flow.provider().calls(), vec![false]);
    }

    #[tokio::test]
    async fn test_invalid_math_is_retried_twice_then_flagged() {
        let bad = || Ok(vec![OcrItem::new("$x=1", "x=1")]);
        let flow = flow(vec![bad(), bad(), bad()]);
        let mut batch = flow.run_batch(&[image("q.png")]).await;

        let draft = &mut batch.drafts[0];
        assert_eq!(draft.retry_count, 2);
        assert_eq!(draft.status, DraftStatus::Exhausted);
        assert!(draft.has_error);
        assert!(draft.last_error.is_some());
        assert_eq!(flow.provider().calls(), vec![false, true, true]);

        let store = QuestionStore::open(Arc::new(MemoryBlobStore::new())).unwrap();
        let saved = save_single(draft, &store, &alice()).unwrap();
        assert_eq!(store.list()[0].id, saved.id);
    }

    #[tokio::test]
    async fn test_retry_repairs_draft() {
        let flow = flow(vec![
            Ok(vec![OcrItem::new("求 $\\frac{1}{2$", "\\frac{1}{2")]),
            Ok(vec![OcrItem::new("求 $\\frac{1}{2}$", "\\frac{1}{2}")]),
        ]);
        let batch = flow.run_batch(&[image("q.png")]).await;

        let draft = &batch.drafts[0];
        assert_eq!(draft.status, DraftStatus::Drafted);
        assert_eq!(draft.retry_count, 1);
        assert!(!draft.has_error);
        assert_eq!(draft.formula, "\\frac{1}{2}");
    }

    #[tokio::test]
    async fn test_failed_retry_call_counts_as_attempt() {
        let flow = flow(vec![
            Ok(vec![OcrItem::new("$x", "x")]),
            Err(IntakeError::ocr_call("scripted", "timeout")),
            Err(IntakeError::ocr_call("scripted", "timeout")),
        ]);
        let batch = flow.run_batch(&[image("q.png")]).await;
        assert_eq!(batch.drafts[0].retry_count, 2);
        assert_eq!(batch.drafts[0].status, DraftStatus::Exhausted);
    }

    #[tokio::test]
    async fn test_file_errors_do_not_stop_the_batch() {
        let flow = flow(vec![
            Err(IntakeError::ocr_call("scripted", "503")),
            Ok(vec![OcrItem::new("$a$", "a"), OcrItem::new("$b$", "b")]),
            Ok(Vec::new()),
        ]);
        let files = [
            UploadedFile::new("notes.txt", b"hello".to_vec()),
            image("a.png"),
            image("b.png"),
            image("c.png"),
        ];
        let batch = flow.run_batch(&files).await;

        assert_eq!(batch.outcomes.len(), 4);
        assert!(matches!(
            &batch.outcomes[0],
            FileOutcome::FileError { error: IntakeError::FileParseError { .. }, .. }
        ));
        assert!(matches!(
            &batch.outcomes[1],
            FileOutcome::FileError { error: IntakeError::OcrCallFailure { .. }, .. }
        ));
        assert!(matches!(&batch.outcomes[2], FileOutcome::Drafted { drafts: 2, .. }));
        assert!(matches!(&batch.outcomes[3], FileOutcome::Drafted { drafts: 0, .. }));
        assert_eq!(batch.failed_files(), 2);
        assert_eq!(batch.drafts.len(), 2);
        assert_eq!(batch.drafts[1].item_index, 1);
        // 不支持的文件不会调用识别服务
        assert_eq!(flow.provider().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_saved_draft_is_read_only() {
        let flow = flow(vec![Ok(vec![OcrItem::new("$y=2$", "y=2")])]);
        let mut batch = flow.run_batch(&[image("q.png")]).await;
        let store = QuestionStore::open(Arc::new(MemoryBlobStore::new())).unwrap();
        let knowledge = KnowledgeBase::open(Arc::new(MemoryBlobStore::new())).unwrap();

        let draft = &mut batch.drafts[0];
        let question = save_single(draft, &store, &alice()).unwrap();
        assert_eq!(question.author_name.as_deref(), Some("alice"));
        assert_eq!(question.user_id.as_deref(), Some("u-alice"));
        assert_eq!(question.formula.as_deref(), Some("y=2"));
        assert_eq!(draft.saved_question_id.as_deref(), Some(question.id.as_str()));

        let err = save_single(draft, &store, &alice()).unwrap_err();
        assert!(matches!(err, AppError::Intake(IntakeError::DraftReadOnly(_))));
        let err = edit_draft(draft, DraftEdit::default(), &knowledge).unwrap_err();
        assert!(matches!(err, AppError::Intake(IntakeError::DraftReadOnly(_))));
        assert!(matches!(flow.revalidate(draft).await, Err(IntakeError::DraftReadOnly(_))));
        assert_eq!(store.count(), 1);

        assert_eq!(batch.prune_saved(), 1);
        assert!(batch.drafts.is_empty());
    }

    #[tokio::test]
    async fn test_edit_draft_validates_category() {
        let flow = flow(vec![Ok(vec![OcrItem::new("$x$", "x")])]);
        let mut batch = flow.run_batch(&[image("q.png")]).await;
        let knowledge = KnowledgeBase::open(Arc::new(MemoryBlobStore::new())).unwrap();
        let draft = &mut batch.drafts[0];

        let edit = DraftEdit {
            category: Some("量子力学".to_string()),
            ..Default::default()
        };
        let err = edit_draft(draft, edit, &knowledge).unwrap_err();
        assert!(matches!(err, AppError::Intake(IntakeError::UnknownCategory(_))));
        assert_eq!(draft.category, UNCATEGORIZED);

        let edit = DraftEdit {
            category: Some("函数".to_string()),
            question_type: Some(Some(QuestionType::FillBlank)),
            difficulty: Some(Difficulty::Hard),
            tags: Some(vec!["期中".to_string()]),
            text: Some("$x".to_string()),
            ..Default::default()
        };
        edit_draft(draft, edit, &knowledge).unwrap();
        assert_eq!(draft.category, "函数");
        assert_eq!(draft.question_type, Some(QuestionType::FillBlank));
        assert!(draft.has_error);

        batch.clear();
        assert!(batch.drafts.is_empty() && batch.outcomes.is_empty());
    }
}
