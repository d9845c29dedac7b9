//! 识别能力 - 业务能力层
//!
//! 定义"把一个文件识别成若干道题"的能力边界，以及识别结果的解析规则。
//! 流程层只依赖 `OcrProvider`，测试时可以替换为脚本化的实现。

use async_trait::async_trait;
use tracing::debug;

use crate::error::IntakeError;
use crate::models::{OcrItem, OcrRequest};
use crate::utils::truncate_text;

/// 识别系统提示词
pub const OCR_SYSTEM_PROMPT: &str = r#"你是一名数学试卷录入员。请识别输入中的全部题目，按出现顺序输出。

输出要求：
1. 只输出一个 JSON 数组，不要输出任何解释或 Markdown 标记
2. 数组每个元素形如 {"text": "...", "latex": "..."}
3. text 为完整题干（含选项），所有数学内容用 $...$ 包裹
4. latex 为该题最核心的一个公式，不带 $ 分隔符；没有公式时为空字符串
5. 选择题的选项使用 A. B. C. D. 标记，小问使用 (1) (2) 标记
6. 没有识别到题目时输出 []"#;

/// 重试时追加的提示
pub const OCR_RETRY_HINT: &str = "上一次的识别结果中公式无法正常排版。请重新识别，\
逐一检查每个 $ 分隔符是否成对出现、花括号是否配对、\\begin 与 \\end 是否对应。";

/// 识别能力
///
/// 职责：
/// - 一次调用处理一个文件
/// - 返回有序的识别结果
/// - 不创建草稿，不做公式校验
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// 识别一个文件
    ///
    /// `is_retry` 为真时提示模型重点检查公式分隔符
    async fn recognize(&self, request: &OcrRequest, is_retry: bool) -> Result<Vec<OcrItem>, IntakeError>;

    /// 模型名称，用于日志和错误信息
    fn model_name(&self) -> &str;
}

/// 构建发送给模型的用户消息
pub fn build_user_message(request: &OcrRequest, is_retry: bool) -> String {
    let mut message = match &request.text_content {
        Some(text) => format!("以下是从 Word 文档中提取的文字，请从中整理出题目：\n\n{}", text),
        None => "请识别图片 / 文档中的全部题目。".to_string(),
    };
    if is_retry {
        message.push_str("\n\n");
        message.push_str(OCR_RETRY_HINT);
    }
    message
}

/// 解析识别结果
///
/// - 空响应视为没有识别到题目
/// - 允许外层包裹 ```json 代码块
/// - 其余不符合 `[{text, latex}]` 结构的内容返回 `UnparseableResponse`
pub fn parse_ocr_response(response: &str) -> Result<Vec<OcrItem>, IntakeError> {
    let body = strip_code_fence(response.trim());
    if body.is_empty() {
        debug!("识别结果为空");
        return Ok(Vec::new());
    }

    serde_json::from_str::<Vec<OcrItem>>(body).map_err(|e| {
        debug!("识别结果解析失败: {}", e);
        IntakeError::UnparseableResponse {
            preview: truncate_text(body, 80),
        }
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // 去掉语言标记所在的第一行
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_array() {
        let items = parse_ocr_response(r#"[{"text":"$x=1$","latex":"x=1"}]"#).unwrap();
        assert_eq!(items, vec![OcrItem::new("$x=1$", "x=1")]);
    }

    #[test]
    fn test_parse_fenced_array() {
        let response = "```json\n[{\"text\":\"求 $y$\",\"latex\":\"y\"},{\"text\":\"无公式\",\"latex\":\"\"}]\n```";
        let items = parse_ocr_response(response).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].latex, "");
    }

    #[test]
    fn test_empty_response_is_zero_results() {
        assert!(parse_ocr_response("").unwrap().is_empty());
        assert!(parse_ocr_response("  \n ").unwrap().is_empty());
        assert!(parse_ocr_response("```json\n```").unwrap().is_empty());
        assert!(parse_ocr_response("[]").unwrap().is_empty());
    }

    #[test]
    fn test_wrong_shape_is_unparseable() {
        for response in [
            "好的，以下是识别结果",
            r#"{"text":"$x$","latex":"x"}"#,
            r#"[{"content":"$x$"}]"#,
        ] {
            let err = parse_ocr_response(response).unwrap_err();
            assert!(matches!(err, IntakeError::UnparseableResponse { .. }), "{}", response);
        }
    }

    #[test]
    fn test_retry_message_carries_hint() {
        let req = OcrRequest::text("1. 求 $x$");
        let first = build_user_message(&req, false);
        assert!(first.contains("1. 求 $x$"));
        assert!(!first.contains(OCR_RETRY_HINT));
        assert!(build_user_message(&req, true).ends_with(OCR_RETRY_HINT));
    }
}
