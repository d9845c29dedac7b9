//! 浏览器资源
//!
//! 打印 PDF 需要一个能执行 MathJax 的真实页面：
//! 配置了调试端口时连接已有浏览器，否则启动无头浏览器。

mod connection;
mod headless;

use anyhow::Result;
use chromiumoxide::{Browser, Page};

use crate::config::Config;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;

/// 按配置打开一个打印用页面
///
/// 返回的 `Browser` 必须在页面使用期间保持存活
pub async fn open_print_page(config: &Config) -> Result<(Browser, Page)> {
    match config.browser_debug_port {
        Some(port) => connect_to_browser_and_page(port).await,
        None => launch_headless_browser(config.browser_executable.as_deref()).await,
    }
}
