/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::error::{AppError, AppResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化控制台日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 为真时使用 `debug`
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(false)
        .with_line_number(false)
        .with_target(false)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(console_layer).init();
}

/// 测试用日志，可重复调用
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n试卷解析日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| AppError::file_write_failed(log_file_path, e))
}

/// 向日志文件追加一行
pub fn append_log_line(log_file_path: &str, line: &str) -> AppResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))?;
    writeln!(file, "[{}] {}", chrono::Local::now().format("%H:%M:%S"), line)
        .map_err(|e| AppError::file_write_failed(log_file_path, e))
}

/// 记录程序启动信息
///
/// # 参数
/// - `input_dir`: 输入目录
/// - `output_dir`: 输出目录
pub fn log_startup(input_dir: &str, output_dir: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 试卷结构化解析");
    info!("📁 输入目录: {}", input_dir);
    info!("📁 输出目录: {}", output_dir);
    info!("{}", "=".repeat(60));
}

/// 记录文件加载信息
pub fn log_files_loaded(total: usize) {
    info!("✓ 找到 {} 个待解析的文档", total);
    info!("💡 逐个顺序处理\n");
}

/// 记录单个文档开始处理
///
/// # 参数
/// - `index`: 文档序号（从 1 开始）
/// - `total`: 文档总数
/// - `file_name`: 文件名
pub fn log_document_start(index: usize, total: usize, file_name: &str) {
    info!("\n{}", "─".repeat(60));
    info!("📄 [{}/{}] 开始解析: {}", index, total, file_name);
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `questions`: 输出的题目记录总数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(success: usize, failed: usize, total: usize, questions: usize, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    info!("📝 题目记录: {}", questions);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_by_chars() {
        assert_eq!(truncate_text("阅读下列材料", 4), "阅读下列...");
        assert_eq!(truncate_text("短", 4), "短");
    }

    #[test]
    fn test_log_file_header_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let path = path.to_str().unwrap();
        init_log_file(path).unwrap();
        append_log_line(path, "paper.docx → 3 道题").unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("试卷解析日志"));
        assert!(content.contains("paper.docx → 3 道题"));
    }
}
