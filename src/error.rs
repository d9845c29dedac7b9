use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 存储相关错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 身份 / 会话错误
    #[error("身份错误: {0}")]
    Identity(#[from] IdentityError),
    /// 知识点错误
    #[error("知识点错误: {0}")]
    Knowledge(#[from] KnowledgeError),
    /// OCR 录入错误
    #[error("录入错误: {0}")]
    Intake(#[from] IntakeError),
    /// 导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 存储相关错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取失败
    #[error("读取 {key} 失败: {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入失败
    #[error("写入 {key} 失败: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 数据损坏，无法反序列化
    #[error("{key} 中的数据无法解析: {source}")]
    CorruptBlob {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// 不支持的数据版本
    #[error("{key} 的数据版本 {found} 高于当前支持的版本 {supported}")]
    UnsupportedVersion {
        key: String,
        found: u32,
        supported: u32,
    },
}

/// 身份 / 会话错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// 用户名已存在
    #[error("用户名 {0} 已被注册")]
    DuplicateUsername(String),
    /// 用户名或密码错误
    #[error("用户名或密码错误")]
    InvalidCredentials,
    /// 用户名或密码为空
    #[error("用户名和密码不能为空")]
    MissingCredentials,
    /// 权限不足
    #[error("当前用户无权执行该操作: {0}")]
    PermissionDenied(String),
}

/// 知识点错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("知识点 {0} 不存在")]
    TopicNotFound(String),
    #[error("子知识点 {0} 不存在")]
    SubPointNotFound(String),
    #[error("知识点名称不能为空")]
    EmptyName,
}

/// OCR 录入错误
///
/// 除 `DraftReadOnly` / `UnknownCategory` 外，均只影响单个文件，不会中断整个批次
#[derive(Debug, Error)]
pub enum IntakeError {
    /// 文件无法解析（类型不支持、Word 文本提取失败等）
    #[error("文件 {file} 解析失败: {reason}")]
    FileParseError { file: String, reason: String },
    /// 调用识别服务失败
    #[error("识别服务调用失败 (模型: {model}): {reason}")]
    OcrCallFailure { model: String, reason: String },
    /// 识别服务返回内容格式不正确
    #[error("识别结果格式不正确: {preview}")]
    UnparseableResponse { preview: String },
    /// 草稿已保存，不可再修改
    #[error("草稿 {0} 已保存，不能再修改")]
    DraftReadOnly(String),
    /// 分类不在当前知识点集合中
    #[error("分类 {0} 不在当前知识点列表中")]
    UnknownCategory(String),
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 没有选择任何题目
    #[error("没有选择任何题目，无法导出")]
    NoQuestionsSelected,
    /// 打印窗口无法打开
    #[error("无法打开打印窗口: {reason}。请确认浏览器可用（设置 BROWSER_EXECUTABLE 或 BROWSER_DEBUG_PORT）后重试")]
    PopupBlocked { reason: String },
    /// 打印为 PDF 失败
    #[error("打印 PDF 失败: {0}")]
    PrintFailed(String),
    /// 导出文件写入失败
    #[error("写入导出文件 {path} 失败: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件 {path} 失败: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

// ========== 便捷构造函数 ==========

impl IntakeError {
    /// 创建文件解析错误
    pub fn file_parse(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        IntakeError::FileParseError {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建识别调用错误
    pub fn ocr_call(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        IntakeError::OcrCallFailure {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_blocked_message_is_actionable() {
        let err = ExportError::PopupBlocked {
            reason: "浏览器启动失败".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("浏览器启动失败"));
        assert!(msg.contains("BROWSER_EXECUTABLE"));
    }

    #[test]
    fn test_app_error_wraps_identity_error() {
        let err: AppError = IdentityError::DuplicateUsername("alice".to_string()).into();
        assert_eq!(err.to_string(), "身份错误: 用户名 alice 已被注册");
    }
}
