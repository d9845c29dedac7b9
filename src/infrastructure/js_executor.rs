//! JS 执行器 - 基础设施层
//!
//! 持有打印窗口对应的 page 资源，只暴露"执行 JS"和"轮询等待"的能力

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::sleep;
use tracing::debug;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 Question / 试卷
/// - 不处理导出流程
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（用于写入内容、打印等操作）
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> Result<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 按固定间隔轮询一个布尔表达式，直到为真或次数用尽
    ///
    /// # 返回
    /// 表达式在次数内变为真时返回 `true`
    pub async fn poll_until(&self, condition: &str, interval: Duration, max_polls: u32) -> Result<bool> {
        for attempt in 1..=max_polls {
            if self.eval_as::<bool>(condition).await.unwrap_or(false) {
                debug!("条件 `{}` 在第 {} 次轮询时满足", condition, attempt);
                return Ok(true);
            }
            sleep(interval).await;
        }
        Ok(false)
    }
}
