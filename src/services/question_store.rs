//! 题库存储服务 - 业务能力层
//!
//! 题目列表整体序列化为一块数据，每次操作都是读取 → 修改 → 整块写回

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::infrastructure::BlobStore;
use crate::models::schema::{self, Decoded};
use crate::models::{Identity, Question, QuestionFilter};

/// 题目列表的存储键
pub const QUESTIONS_KEY: &str = "exam_bank.questions";

/// 删除操作的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
    /// 既不是作者也不是管理员，题库保持不变
    Denied,
}

/// 题库存储服务
pub struct QuestionStore {
    store: Arc<dyn BlobStore>,
}

impl QuestionStore {
    /// 打开题库，旧版数据在此时迁移并写回
    pub fn open(store: Arc<dyn BlobStore>) -> Result<Self, StorageError> {
        let this = Self { store };
        if let Some(raw) = this.store.get(QUESTIONS_KEY)? {
            let decoded: Decoded<Vec<Question>> = schema::decode(QUESTIONS_KEY, &raw)?;
            if decoded.needs_write_back() {
                let questions = decoded.into_inner();
                info!("🔄 迁移旧版题库数据，共 {} 道题", questions.len());
                this.write(&questions)?;
            }
        }
        Ok(this)
    }

    /// 返回全部题目；没有数据或数据无法读取时返回空列表
    pub fn list(&self) -> Vec<Question> {
        match self.read() {
            Ok(questions) => questions,
            Err(e) => {
                warn!("⚠️ 读取题库失败，按空题库处理: {}", e);
                Vec::new()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Question> {
        self.list().into_iter().find(|q| q.id == id)
    }

    pub fn count(&self) -> usize {
        self.list().len()
    }

    /// 按条件筛选，保持存储顺序
    pub fn filter(&self, filter: &QuestionFilter) -> Vec<Question> {
        self.list().into_iter().filter(|q| filter.matches(q)).collect()
    }

    /// 新增或更新题目
    ///
    /// 标识已存在时原位替换，否则插入到最前面。不校验字段内容。
    /// 现有数据无法读取时返回错误，不覆盖原数据。
    pub fn upsert(&self, question: Question) -> Result<(), StorageError> {
        let mut questions = self.read()?;
        match questions.iter().position(|q| q.id == question.id) {
            Some(pos) => {
                debug!("更新题目 {} (位置 {})", question.id, pos);
                questions[pos] = question;
            }
            None => {
                debug!("新增题目 {}", question.id);
                questions.insert(0, question);
            }
        }
        self.write(&questions)
    }

    /// 删除题目，只有作者或管理员可以删除
    pub fn remove(&self, id: &str, identity: &Identity) -> Result<RemoveOutcome, StorageError> {
        let mut questions = self.read()?;
        let Some(pos) = questions.iter().position(|q| q.id == id) else {
            return Ok(RemoveOutcome::NotFound);
        };

        if !identity.can_manage(&questions[pos]) {
            warn!("⚠️ {} 无权删除题目 {}，已忽略", identity, id);
            return Ok(RemoveOutcome::Denied);
        }

        questions.remove(pos);
        self.write(&questions)?;
        info!("🗑️ 已删除题目 {}", id);
        Ok(RemoveOutcome::Removed)
    }

    fn read(&self) -> Result<Vec<Question>, StorageError> {
        match self.store.get(QUESTIONS_KEY)? {
            Some(raw) => Ok(schema::decode(QUESTIONS_KEY, &raw)?.into_inner()),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, questions: &[Question]) -> Result<(), StorageError> {
        let raw = schema::encode(QUESTIONS_KEY, &questions)?;
        self.store.set(QUESTIONS_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryBlobStore;
    use crate::models::Role;

    fn identity(user_id: &str, role: Role) -> Identity {
        Identity {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            role,
        }
    }

    fn open_empty() -> QuestionStore {
        QuestionStore::open(Arc::new(MemoryBlobStore::new())).unwrap()
    }

    #[test]
    fn test_list_on_empty_store() {
        assert!(open_empty().list().is_empty());
    }

    #[test]
    fn test_fresh_id_is_inserted_first() {
        let store = open_empty();
        store.upsert(Question::new("a", "A")).unwrap();
        store.upsert(Question::new("b", "B")).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_existing_id_is_replaced_in_place() {
        let store = open_empty();
        for id in ["a", "b", "c"] {
            store.upsert(Question::new(id, id)).unwrap();
        }

        store.upsert(Question::new("b", "新内容")).unwrap();

        let list = store.list();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].id, "b");
        assert_eq!(list[1].content, "新内容");
    }

    #[test]
    fn test_remove_respects_ownership() {
        let store = open_empty();
        store
            .upsert(Question::new("q1", "1+1").with_owner("u1", "alice"))
            .unwrap();
        let before = store.list();

        let outcome = store.remove("q1", &identity("u2", Role::User)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Denied);
        assert_eq!(store.list(), before);

        let outcome = store.remove("q1", &identity("u1", Role::User)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(store.list().is_empty());

        let outcome = store.remove("q1", &identity("u1", Role::User)).unwrap();
        assert_eq!(outcome, RemoveOutcome::NotFound);
    }

    #[test]
    fn test_ownerless_question_needs_admin() {
        let store = open_empty();
        store.upsert(Question::new("q1", "旧题")).unwrap();

        let outcome = store.remove("q1", &identity("u1", Role::User)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Denied);
        assert_eq!(store.count(), 1);

        let outcome = store.remove("q1", &identity("root", Role::Admin)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
    }

    #[test]
    fn test_unreadable_blob_is_never_overwritten() {
        let blob = Arc::new(MemoryBlobStore::new());
        let store = QuestionStore::open(blob.clone()).unwrap();
        let newer = r#"{"version":2,"records":[{"id":"a","content":"A"},{"id":"b","content":"B"}]}"#;
        blob.set(QUESTIONS_KEY, newer).unwrap();

        assert!(matches!(
            store.upsert(Question::new("c", "C")),
            Err(StorageError::UnsupportedVersion { found: 2, .. })
        ));
        assert!(store.remove("a", &identity("root", Role::Admin)).is_err());
        assert_eq!(blob.get(QUESTIONS_KEY).unwrap().as_deref(), Some(newer));

        blob.set(QUESTIONS_KEY, "{broken").unwrap();
        assert!(matches!(
            store.upsert(Question::new("c", "C")),
            Err(StorageError::CorruptBlob { .. })
        ));
        assert_eq!(blob.get(QUESTIONS_KEY).unwrap().as_deref(), Some("{broken"));
    }

    #[test]
    fn test_admin_can_remove_any() {
        let store = open_empty();
        store
            .upsert(Question::new("q1", "1+1").with_owner("u1", "alice"))
            .unwrap();
        let outcome = store.remove("q1", &identity("root", Role::Admin)).unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);
    }

    #[test]
    fn test_legacy_array_is_migrated_on_open() {
        let blob = Arc::new(MemoryBlobStore::new().with_entry(
            QUESTIONS_KEY,
            r#"[{"id":"old","content":"$x$","createdAt":1700000000000}]"#,
        ));
        let store = QuestionStore::open(blob.clone()).unwrap();

        assert_eq!(store.list()[0].id, "old");
        let raw = blob.get(QUESTIONS_KEY).unwrap().unwrap();
        assert!(raw.starts_with(r#"{"version":1"#));
    }

    #[test]
    fn test_corrupt_blob_lists_empty() {
        let blob = Arc::new(MemoryBlobStore::new());
        let store = QuestionStore::open(blob.clone()).unwrap();
        blob.set(QUESTIONS_KEY, "{broken").unwrap();
        assert!(store.list().is_empty());
    }
}
