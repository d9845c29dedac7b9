//! 知识点服务 - 业务能力层
//!
//! 两级知识点树：一级知识点只能追加，子知识点可以增删改。
//! 重命名或删除不会同步修改已保存题目的分类。

use std::sync::Arc;

use tracing::info;

use crate::error::{AppResult, KnowledgeError, StorageError};
use crate::infrastructure::BlobStore;
use crate::models::knowledge::default_tree;
use crate::models::schema::{self, Decoded};
use crate::models::{KnowledgePointNode, SubPoint, UNCATEGORIZED};

pub const KNOWLEDGE_KEY: &str = "exam_bank.knowledge_points";

/// 知识点服务
pub struct KnowledgeBase {
    store: Arc<dyn BlobStore>,
}

impl KnowledgeBase {
    /// 打开知识点服务，首次使用时写入默认知识点
    pub fn open(store: Arc<dyn BlobStore>) -> Result<Self, StorageError> {
        let this = Self { store };
        match this.store.get(KNOWLEDGE_KEY)? {
            None => {
                info!("📚 写入默认知识点");
                this.write(&default_tree())?;
            }
            Some(raw) => {
                let decoded: Decoded<Vec<KnowledgePointNode>> = schema::decode(KNOWLEDGE_KEY, &raw)?;
                if decoded.needs_write_back() {
                    info!("🔄 迁移旧版知识点数据");
                    this.write(&decoded.into_inner())?;
                }
            }
        }
        Ok(this)
    }

    /// 完整的知识点树
    pub fn tree(&self) -> Result<Vec<KnowledgePointNode>, StorageError> {
        match self.store.get(KNOWLEDGE_KEY)? {
            Some(raw) => Ok(schema::decode(KNOWLEDGE_KEY, &raw)?.into_inner()),
            None => Ok(default_tree()),
        }
    }

    /// 可作为题目分类的全部名称（含"未分类"）
    pub fn labels(&self) -> Result<Vec<String>, StorageError> {
        let mut labels = vec![UNCATEGORIZED.to_string()];
        for node in self.tree()? {
            labels.push(node.name.clone());
            labels.extend(node.children.into_iter().map(|c| c.name));
        }
        Ok(labels)
    }

    pub fn contains(&self, label: &str) -> Result<bool, StorageError> {
        Ok(self.labels()?.iter().any(|l| l == label))
    }

    /// 追加一级知识点
    pub fn add_topic(&self, name: &str) -> AppResult<KnowledgePointNode> {
        let name = non_empty(name)?;
        let mut tree = self.tree()?;
        let node = KnowledgePointNode::new(format!("kp-{}", short_id()), name);
        tree.push(node.clone());
        self.write(&tree)?;
        info!("✓ 新增知识点 {}", node.name);
        Ok(node)
    }

    /// 在一级知识点下追加子知识点
    pub fn add_sub_point(&self, topic_id: &str, name: &str) -> AppResult<SubPoint> {
        let name = non_empty(name)?;
        let mut tree = self.tree()?;
        let topic = find_topic(&mut tree, topic_id)?;
        let sub = SubPoint {
            id: format!("{}-{}", topic.id, short_id()),
            name: name.to_string(),
        };
        topic.children.push(sub.clone());
        self.write(&tree)?;
        Ok(sub)
    }

    pub fn rename_sub_point(&self, topic_id: &str, sub_id: &str, name: &str) -> AppResult<()> {
        let name = non_empty(name)?;
        let mut tree = self.tree()?;
        let topic = find_topic(&mut tree, topic_id)?;
        let sub = topic
            .children
            .iter_mut()
            .find(|s| s.id == sub_id)
            .ok_or_else(|| KnowledgeError::SubPointNotFound(sub_id.to_string()))?;
        sub.name = name.to_string();
        self.write(&tree)?;
        Ok(())
    }

    pub fn remove_sub_point(&self, topic_id: &str, sub_id: &str) -> AppResult<()> {
        let mut tree = self.tree()?;
        let topic = find_topic(&mut tree, topic_id)?;
        let before = topic.children.len();
        topic.children.retain(|s| s.id != sub_id);
        if topic.children.len() == before {
            return Err(KnowledgeError::SubPointNotFound(sub_id.to_string()).into());
        }
        self.write(&tree)?;
        Ok(())
    }

    fn write(&self, tree: &[KnowledgePointNode]) -> Result<(), StorageError> {
        let raw = schema::encode(KNOWLEDGE_KEY, &tree)?;
        self.store.set(KNOWLEDGE_KEY, &raw)
    }
}

fn non_empty(name: &str) -> Result<&str, KnowledgeError> {
    let name = name.trim();
    if name.is_empty() {
        Err(KnowledgeError::EmptyName)
    } else {
        Ok(name)
    }
}

fn find_topic<'a>(
    tree: &'a mut [KnowledgePointNode],
    topic_id: &str,
) -> Result<&'a mut KnowledgePointNode, KnowledgeError> {
    tree.iter_mut()
        .find(|n| n.id == topic_id)
        .ok_or_else(|| KnowledgeError::TopicNotFound(topic_id.to_string()))
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryBlobStore;

    fn open() -> KnowledgeBase {
        KnowledgeBase::open(Arc::new(MemoryBlobStore::new())).unwrap()
    }

    #[test]
    fn test_default_tree_is_seeded() {
        let kb = open();
        let tree = kb.tree().unwrap();
        assert!(!tree.is_empty());
        assert!(kb.contains("函数").unwrap());
        assert!(kb.contains("等差数列").unwrap());
        assert!(kb.contains(UNCATEGORIZED).unwrap());
        assert!(!kb.contains("量子力学").unwrap());
    }

    #[test]
    fn test_topics_are_appended() {
        let kb = open();
        let before = kb.tree().unwrap().len();
        let node = kb.add_topic("平面向量").unwrap();

        let tree = kb.tree().unwrap();
        assert_eq!(tree.len(), before + 1);
        assert_eq!(tree.last().unwrap().id, node.id);
    }

    #[test]
    fn test_sub_point_lifecycle() {
        let kb = open();
        let node = kb.add_topic("平面向量").unwrap();
        let sub = kb.add_sub_point(&node.id, "数量积").unwrap();
        assert!(kb.contains("数量积").unwrap());

        kb.rename_sub_point(&node.id, &sub.id, "向量数量积").unwrap();
        assert!(kb.contains("向量数量积").unwrap());
        assert!(!kb.contains("数量积").unwrap());

        kb.remove_sub_point(&node.id, &sub.id).unwrap();
        assert!(!kb.contains("向量数量积").unwrap());
    }

    #[test]
    fn test_errors() {
        let kb = open();
        assert!(kb.add_topic("  ").is_err());
        assert!(kb.add_sub_point("missing", "x").is_err());
        assert!(kb.remove_sub_point("kp-func", "missing").is_err());
    }
}
