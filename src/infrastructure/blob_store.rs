//! 键值存储 - 基础设施层
//!
//! 以字符串为键、整块 JSON 文本为值的同步存储，只暴露读 / 写 / 删除能力。
//! 每次写入都是整块替换，不同进程同时写入时后写者覆盖先写者。

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

/// 键值存储能力
///
/// 职责：
/// - 按键读写整块字符串
/// - 不认识 Question / User
/// - 不做版本迁移
pub trait BlobStore: Send + Sync {
    /// 读取键对应的值，不存在时返回 `None`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 整块写入
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除键，不存在时视为成功
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// 基于目录的存储，每个键对应一个 `<key>.json` 文件
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// 打开（必要时创建）数据目录
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::WriteFailed {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadFailed {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        debug!("写入 {} ({} 字节)", key, value.len());

        // 先写临时文件再重命名，读者不会看到写了一半的内容
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| StorageError::WriteFailed {
                key: key.to_string(),
                source,
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::WriteFailed {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// 内存存储，用于测试和临时会话
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一条数据
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.lock().insert(key.to_string(), value.to_string());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // 锁中毒只会发生在持锁线程 panic 时，数据本身仍然完整
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();

        assert_eq!(store.get("exam_bank.questions").unwrap(), None);

        store.set("exam_bank.questions", "[1,2,3]").unwrap();
        assert_eq!(
            store.get("exam_bank.questions").unwrap().as_deref(),
            Some("[1,2,3]")
        );

        store.set("exam_bank.questions", "[]").unwrap();
        assert_eq!(store.get("exam_bank.questions").unwrap().as_deref(), Some("[]"));

        store.remove("exam_bank.questions").unwrap();
        store.remove("exam_bank.questions").unwrap();
        assert_eq!(store.get("exam_bank.questions").unwrap(), None);
    }

    #[test]
    fn test_file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::open(dir.path()).unwrap();
        store.set("k", "v").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_memory_store_with_entry() {
        let store = MemoryBlobStore::new().with_entry("a", "1");
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }
}
