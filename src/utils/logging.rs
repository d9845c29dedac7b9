/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

/// 记录程序启动信息
///
/// # 参数
/// - `data_dir`: 数据目录
/// - `model`: OCR 使用的模型名称
pub fn log_startup(data_dir: &str, model: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 题库工具启动");
    info!("📁 数据目录: {}", data_dir);
    info!("🤖 识别模型: {}", model);
    info!("{}", "=".repeat(60));
}

/// 记录录入批次开始信息
///
/// # 参数
/// - `total`: 本批文件数量
pub fn log_batch_start(total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始识别，共 {} 个文件", total);
    info!("💡 文件逐个处理，单个文件失败不影响其余文件");
    info!("{}", "=".repeat(60));
}

/// 记录单个文件开始信息
pub fn log_file_start(index: usize, total: usize, file_name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📄 [{}/{}] {}", index, total, file_name);
}

/// 打印录入批次统计
///
/// # 参数
/// - `drafts`: 生成的草稿数
/// - `flagged`: 重试后仍有公式错误的草稿数
/// - `failed_files`: 失败的文件数
/// - `total_files`: 文件总数
pub fn log_batch_complete(drafts: usize, flagged: usize, failed_files: usize, total_files: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 识别完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功文件: {}/{}", total_files - failed_files, total_files);
    info!("📝 生成草稿: {}", drafts);
    if flagged > 0 {
        info!("⚠️ 公式待人工检查: {}", flagged);
    }
    info!("❌ 失败文件: {}", failed_files);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
