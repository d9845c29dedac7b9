//! # Exam Bank
//!
//! 数学题库工具：题目录入、知识点分类、组卷导出
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `BlobStore` - 按键整块读写 JSON 文本（目录 / 内存两种实现）
//! - `JsExecutor` - 打印页面的唯一 owner，提供 eval() 和轮询能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `QuestionStore` / `IdentityService` / `KnowledgeBase` - 题库、账号、知识点
//! - `LlmService` - 实现 `OcrProvider`，调用多模态模型识别题目
//! - `latex` - 公式校验，决定是否需要重新识别
//! - `export` - 组卷、Word 导出、PDF 导出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一批文件"的完整录入流程
//! - `IntakeCtx` - 上下文封装（文件序号 + 文件名）
//! - `IntakeFlow` - 流程编排（预处理 → 识别 → 校验 → 重试 → 保存）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，持有全部服务，分发命令
//! - `orchestrator/command` - 命令行解析
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{BlobStore, FileBlobStore, JsExecutor, MemoryBlobStore};
pub use models::{Identity, OcrDraft, Question, UploadedFile, User};
pub use orchestrator::{App, Cli, Command};
pub use services::{ExamBuilder, IdentityService, KnowledgeBase, LlmService, OcrProvider, QuestionStore};
pub use workflow::{IntakeBatch, IntakeCtx, IntakeFlow};
