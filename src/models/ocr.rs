use serde::{Deserialize, Serialize};

/// 用户上传的文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// 声明的媒体类型，为空时按扩展名推断
    pub mime_type: Option<String>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: None,
        }
    }

    pub fn with_mime(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// 识别请求
///
/// 图片 / PDF 以 base64 内联发送；Word 文档在本地提取文本后只发送文本
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

impl OcrRequest {
    pub fn inline(base64: String, mime_type: impl Into<String>) -> Self {
        Self {
            base64: Some(base64),
            mime_type: Some(mime_type.into()),
            text_content: None,
        }
    }

    pub fn text(text_content: impl Into<String>) -> Self {
        Self {
            text_content: Some(text_content.into()),
            ..Default::default()
        }
    }

    /// 内联数据对应的 data URL
    pub fn data_url(&self) -> Option<String> {
        match (&self.base64, &self.mime_type) {
            (Some(data), Some(mime)) => Some(format!("data:{};base64,{}", mime, data)),
            _ => None,
        }
    }
}

/// 识别结果中的一道题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrItem {
    /// 完整题干，公式用 `$...$` 包裹
    pub text: String,
    /// 核心公式
    pub latex: String,
}

impl OcrItem {
    pub fn new(text: impl Into<String>, latex: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            latex: latex.into(),
        }
    }
}
