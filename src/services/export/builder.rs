//! 组卷选择
//!
//! 记录用户勾选了哪些题目；导出时按题库顺序取出。

use std::collections::HashSet;

use crate::models::Question;

/// 组卷器
#[derive(Debug, Default, Clone)]
pub struct ExamBuilder {
    selected: HashSet<String>,
}

impl ExamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 勾选或取消勾选
    ///
    /// # 返回
    /// 操作后是否处于选中状态
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn select_all(&mut self, questions: &[Question]) {
        self.selected.extend(questions.iter().map(|q| q.id.clone()));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// 没有选中题目时不能导出
    pub fn can_export(&self) -> bool {
        !self.is_empty()
    }

    /// 按题库顺序取出已选题目，已被删除的题目自动忽略
    pub fn selected(&self, questions: &[Question]) -> Vec<Question> {
        questions
            .iter()
            .filter(|q| self.selected.contains(&q.id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> Vec<Question> {
        vec![
            Question::new("q1", "第一题"),
            Question::new("q2", "第二题"),
            Question::new("q3", "第三题"),
        ]
    }

    #[test]
    fn test_toggle_and_order() {
        let mut builder = ExamBuilder::new();
        assert!(!builder.can_export());

        assert!(builder.toggle("q3"));
        assert!(builder.toggle("q1"));
        assert!(builder.can_export());

        let ids: Vec<String> = builder.selected(&bank()).into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["q1", "q3"]);

        assert!(!builder.toggle("q3"));
        assert!(!builder.is_selected("q3"));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut builder = ExamBuilder::new();
        builder.select_all(&bank());
        assert_eq!(builder.len(), 3);

        // 已删除的题目不会出现在导出列表中
        assert_eq!(builder.selected(&bank()[..2]).len(), 2);

        builder.clear();
        assert!(!builder.can_export());
        assert!(builder.selected(&bank()).is_empty());
    }
}
