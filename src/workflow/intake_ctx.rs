//! 录入上下文
//!
//! 封装"我正在处理这一批中的第几个文件"这一信息

use std::fmt::Display;

/// 录入上下文
#[derive(Debug, Clone)]
pub struct IntakeCtx {
    /// 文件在批次中的序号（从1开始）
    pub file_index: usize,

    /// 本批文件总数
    pub total_files: usize,

    /// 文件名
    pub file_name: String,
}

impl IntakeCtx {
    /// 创建新的录入上下文
    pub fn new(file_index: usize, total_files: usize, file_name: impl Into<String>) -> Self {
        Self {
            file_index,
            total_files,
            file_name: file_name.into(),
        }
    }
}

impl Display for IntakeCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[文件 {}/{} {}]",
            self.file_index, self.total_files, self.file_name
        )
    }
}
