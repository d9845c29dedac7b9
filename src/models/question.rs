use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::schema::deserialize_timestamp;

/// 未分类题目使用的分类名
pub const UNCATEGORIZED: &str = "未分类";

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

/// 难度，按 简单 < 中等 < 困难 排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "简单")]
    Easy,
    #[default]
    #[serde(alias = "中等")]
    Medium,
    #[serde(alias = "困难")]
    Hard,
}

impl Difficulty {
    /// 获取中文名称
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "简单",
            Difficulty::Medium => "中等",
            Difficulty::Hard => "困难",
        }
    }

    /// 从中文或英文名称解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "简单" | "易" | "easy" => Some(Difficulty::Easy),
            "中等" | "中" | "medium" => Some(Difficulty::Medium),
            "困难" | "难" | "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// 单选题
    #[serde(alias = "单选题", alias = "single")]
    SingleChoice,
    /// 多选题
    #[serde(alias = "多选题", alias = "multiple")]
    MultiChoice,
    /// 填空题
    #[serde(alias = "填空题", alias = "fill")]
    FillBlank,
    /// 解答题
    #[serde(alias = "解答题", alias = "answer")]
    FreeResponse,
}

impl QuestionType {
    pub fn name(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "单选题",
            QuestionType::MultiChoice => "多选题",
            QuestionType::FillBlank => "填空题",
            QuestionType::FreeResponse => "解答题",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "单选题" | "单选" | "single_choice" => Some(QuestionType::SingleChoice),
            "多选题" | "多选" | "multi_choice" => Some(QuestionType::MultiChoice),
            "填空题" | "填空" | "fill_blank" => Some(QuestionType::FillBlank),
            "解答题" | "解答" | "free_response" => Some(QuestionType::FreeResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 题库中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// 题干全文，公式使用 `$...$` 包裹
    pub content: String,
    /// 核心公式
    #[serde(default, alias = "latex", skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 知识点分类，只在赋值时校验
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

impl Question {
    /// 使用默认分类和难度创建题目
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            formula: None,
            tags: Vec::new(),
            category: default_category(),
            question_type: None,
            difficulty: Difficulty::default(),
            created_at: Utc::now(),
            user_id: None,
            author_name: None,
        }
    }

    /// 设置归属用户
    pub fn with_owner(mut self, user_id: impl Into<String>, author_name: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.author_name = Some(author_name.into());
        self
    }
}

/// 题目筛选条件，所有条件同时满足才算命中
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    /// 在题干、公式、标签中搜索
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub tag: Option<String>,
    pub user_id: Option<String>,
}

impl QuestionFilter {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, q: &Question) -> bool {
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let hit = q.content.contains(keyword)
                || q.formula.as_deref().is_some_and(|f| f.contains(keyword))
                || q.tags.iter().any(|t| t.contains(keyword));
            if !hit {
                return false;
            }
        }
        if self.category.as_ref().is_some_and(|c| c != &q.category) {
            return false;
        }
        if self.difficulty.is_some_and(|d| d != q.difficulty) {
            return false;
        }
        if self.question_type.is_some() && self.question_type != q.question_type {
            return false;
        }
        if self.tag.as_ref().is_some_and(|t| !q.tags.contains(t)) {
            return false;
        }
        if self.user_id.is_some() && self.user_id != q.user_id {
            return false;
        }
        true
    }
}
