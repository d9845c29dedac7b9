//! 试卷导出 - 业务能力层
//!
//! - `builder`：组卷选择
//! - `layout`：选项排列与小问换行
//! - `word`：HTML 形式的 `.doc`
//! - `pdf`：浏览器打印为 PDF

pub mod builder;
pub mod layout;
pub mod pdf;
pub mod word;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ExportError;

pub use builder::ExamBuilder;
pub use pdf::{render_print_html, PdfExporter};
pub use word::{export_word, render_word_document};

/// 导出结果
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ExportPayload {
    /// 写入导出目录
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.file_name);
        fs::create_dir_all(dir)
            .and_then(|_| fs::write(&path, &self.bytes))
            .map_err(|source| ExportError::WriteFailed {
                path: path.display().to_string(),
                source,
            })?;
        info!("💾 已导出: {}", path.display());
        Ok(path)
    }
}

/// 由试卷标题得到文件名（不含扩展名）
pub(crate) fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "试卷".to_string()
    } else {
        stem
    }
}
