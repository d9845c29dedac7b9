use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 本地数据目录（题库、用户、会话、知识点）
    pub data_dir: String,
    /// 导出文件存放目录
    pub export_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM / OCR 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单个草稿自动重试的最大次数
    pub ocr_max_retries: u32,
    // --- 打印 / 浏览器配置 ---
    /// 已打开的浏览器调试端口，设置后直接连接而不是启动无头浏览器
    pub browser_debug_port: Option<u16>,
    /// 无头浏览器可执行文件路径，为空时由 chromiumoxide 自动查找
    pub browser_executable: Option<String>,
    pub mathjax_url: String,
    pub tailwind_url: String,
    /// 轮询排版完成状态的间隔
    pub typeset_poll_interval_ms: u64,
    /// 最多轮询次数
    pub typeset_max_polls: u32,
    /// 排版完成后等待多久再打印
    pub print_settle_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            export_dir: "exports".to_string(),
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
            ocr_max_retries: 2,
            browser_debug_port: None,
            browser_executable: None,
            mathjax_url: "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js".to_string(),
            tailwind_url: "https://cdn.tailwindcss.com".to_string(),
            typeset_poll_interval_ms: 200,
            typeset_max_polls: 50,
            print_settle_delay_ms: 500,
        }
    }
}

impl Config {
    /// 加载配置
    ///
    /// 配置文件路径来自 `EXAM_BANK_CONFIG`，默认 `exam_bank.toml`，文件不存在时跳过
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("EXAM_BANK_CONFIG").unwrap_or_else(|_| "exam_bank.toml".to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        base.overlay_env()
    }

    /// 从 TOML 文件读取配置，缺失的字段使用默认值
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 使用环境变量覆盖配置
    pub fn overlay_env(self) -> Result<Self, ConfigError> {
        Ok(Self {
            data_dir: std::env::var("DATA_DIR").unwrap_or(self.data_dir),
            export_dir: std::env::var("EXPORT_DIR").unwrap_or(self.export_dir),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            ocr_max_retries: parse_env("OCR_MAX_RETRIES", "u32")?.unwrap_or(self.ocr_max_retries),
            browser_debug_port: parse_env("BROWSER_DEBUG_PORT", "u16")?.or(self.browser_debug_port),
            browser_executable: std::env::var("BROWSER_EXECUTABLE").ok().or(self.browser_executable),
            mathjax_url: std::env::var("MATHJAX_URL").unwrap_or(self.mathjax_url),
            tailwind_url: std::env::var("TAILWIND_URL").unwrap_or(self.tailwind_url),
            typeset_poll_interval_ms: parse_env("TYPESET_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(self.typeset_poll_interval_ms),
            typeset_max_polls: parse_env("TYPESET_MAX_POLLS", "u32")?.unwrap_or(self.typeset_max_polls),
            print_settle_delay_ms: parse_env("PRINT_SETTLE_DELAY_MS", "u64")?
                .unwrap_or(self.print_settle_delay_ms),
        })
    }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            data_dir = "/tmp/bank"
            ocr_max_retries = 1
            browser_debug_port = 9222
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, "/tmp/bank");
        assert_eq!(config.ocr_max_retries, 1);
        assert_eq!(config.browser_debug_port, Some(9222));
        assert_eq!(config.export_dir, "exports");
        assert_eq!(config.typeset_poll_interval_ms, 200);
    }

    #[test]
    fn test_default_retry_bound_is_two() {
        assert_eq!(Config::default().ocr_max_retries, 2);
    }
}
