//! LLM 服务 - 业务能力层
//!
//! 只负责"调用多模态模型识别题目"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini, Doubao 等）

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartFile,
        ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, FileObject,
        ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::IntakeError;
use crate::models::{OcrItem, OcrRequest};
use crate::services::ocr_provider::{build_user_message, parse_ocr_response, OcrProvider, OCR_SYSTEM_PROMPT};

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 识别单个文件
/// - 提供通用的 LLM 调用接口
/// - 不出现草稿 / 题库
/// - 不关心流程顺序
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `attachments`: 附件 URL 列表（可选，支持 data URL），会追加到用户消息中
    ///
    /// # 返回
    /// 返回 LLM 的响应内容；模型没有返回内容时为空字符串
    ///
    /// # 示例
    /// ```no_run
    /// # use exam_bank::services::LlmService;
    /// # async fn example(service: &LlmService) -> anyhow::Result<()> {
    /// let response = service.send_to_llm(
    ///     "请识别这道题",
    ///     Some("你是一名数学试卷录入员"),
    ///     None
    /// ).await?;
    /// println!("LLM 响应: {}", response);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        attachments: Option<&[String]>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match attachments.filter(|a| !a.is_empty()) {
            Some(urls) => {
                let mut content_parts: Vec<ChatCompletionRequestUserMessageContentPart> =
                    Vec::new();

                content_parts.push(ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: user_message.to_string(),
                    },
                ));

                for url in urls {
                    content_parts.push(attachment_part(url)?);
                }

                debug!("包含 {} 个附件", urls.len());

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(
                        content_parts,
                    ))
                    .build()?
            }
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.1)
            .max_tokens(4096u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

/// 附件转为消息片段：PDF 作为文件发送，其余按图片发送
fn attachment_part(data_url: &str) -> Result<ChatCompletionRequestUserMessageContentPart> {
    if data_url.starts_with("data:application/pdf") {
        // FileObject 的字段不公开，只能通过反序列化构造
        let file: FileObject = serde_json::from_value(serde_json::json!({
            "file_data": data_url,
            "filename": "document.pdf",
        }))?;
        return Ok(ChatCompletionRequestUserMessageContentPart::File(
            ChatCompletionRequestMessageContentPartFile { file },
        ));
    }

    Ok(ChatCompletionRequestUserMessageContentPart::ImageUrl(
        ChatCompletionRequestMessageContentPartImage {
            image_url: ImageUrl {
                url: data_url.to_string(),
                detail: Some(ImageDetail::High),
            },
        },
    ))
}

#[async_trait]
impl OcrProvider for LlmService {
    async fn recognize(&self, request: &OcrRequest, is_retry: bool) -> Result<Vec<OcrItem>, IntakeError> {
        let user_message = build_user_message(request, is_retry);
        let attachments: Vec<String> = request.data_url().into_iter().collect();

        let response = self
            .send_to_llm(&user_message, Some(OCR_SYSTEM_PROMPT), Some(attachments.as_slice()))
            .await
            .map_err(|e| IntakeError::ocr_call(&self.model_name, e))?;

        let items = parse_ocr_response(&response)?;
        debug!("识别到 {} 道题", items.len());
        Ok(items)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
