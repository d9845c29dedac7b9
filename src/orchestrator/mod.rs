//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责命令分发和资源装配，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `command` - 命令解析
//! - 用 clap 把命令行参数解析为 `Cli` / `Command`
//!
//! ### `app` - 应用入口
//! - 打开数据目录，持有题库 / 身份 / 知识点服务
//! - 从会话中取出 `Identity`，显式传给需要身份的操作
//! - 组装录入流程和导出器
//!
//! ## 层次关系
//!
//! ```text
//! app (处理一条 Command)
//!     ↓
//! workflow::IntakeFlow (处理一批文件)
//!     ↓
//! services (能力层：存储 / 身份 / 知识点 / 识别 / 导出)
//!     ↓
//! infrastructure (基础设施：BlobStore、JsExecutor)
//! ```

pub mod app;
pub mod command;

pub use app::App;
pub use command::{Cli, Command};
