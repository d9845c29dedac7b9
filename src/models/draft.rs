use std::sync::Arc;

use crate::models::ocr::{OcrItem, OcrRequest};
use crate::models::question::{Difficulty, QuestionType, UNCATEGORIZED};

/// 草稿状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    /// 已识别，可编辑
    Drafted,
    /// 公式校验失败，正在重新识别
    Retrying,
    /// 重试次数用尽，公式仍有问题；仍可编辑、保存
    Exhausted,
    /// 已保存进题库，只读
    Saved,
}

/// 识别得到的题目草稿，保存前只存在于当前会话
#[derive(Debug, Clone)]
pub struct OcrDraft {
    /// 会话内标识，用于定位草稿
    pub id: String,
    pub source_name: String,
    /// 在同一文件识别结果中的位置
    pub item_index: usize,
    pub text: String,
    pub formula: String,
    pub category: String,
    pub question_type: Option<QuestionType>,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub retry_count: u32,
    pub status: DraftStatus,
    pub has_error: bool,
    pub last_error: Option<String>,
    pub saved_question_id: Option<String>,
    pub(crate) source: Arc<OcrRequest>,
}

impl OcrDraft {
    pub fn new(
        source_name: impl Into<String>,
        item_index: usize,
        item: OcrItem,
        source: Arc<OcrRequest>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_name: source_name.into(),
            item_index,
            text: item.text,
            formula: item.latex,
            category: UNCATEGORIZED.to_string(),
            question_type: None,
            difficulty: Difficulty::default(),
            tags: Vec::new(),
            retry_count: 0,
            status: DraftStatus::Drafted,
            has_error: false,
            last_error: None,
            saved_question_id: None,
            source,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.status == DraftStatus::Saved
    }

    /// 对应的识别请求（重试时复用）
    pub fn source(&self) -> &OcrRequest {
        &self.source
    }
}

/// 对草稿的一次人工修改，`None` 表示不修改该字段
#[derive(Debug, Clone, Default)]
pub struct DraftEdit {
    pub text: Option<String>,
    pub formula: Option<String>,
    pub category: Option<String>,
    pub question_type: Option<Option<QuestionType>>,
    pub difficulty: Option<Difficulty>,
    pub tags: Option<Vec<String>>,
}
