use anyhow::{Context, Result};
use paper_parser::utils::logging;
use paper_parser::{App, Config};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 命令行参数为待解析的 docx 路径，缺省时扫描输入目录
    let files: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();

    // 初始化并运行应用
    App::initialize(config).await?.run(files).await?;

    Ok(())
}
