//! 批量文档处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一批 docx 文档的顺序处理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建日志文件、记录启动信息、建立任务记录
//! 2. **批量加载**：命令行未指定文件时扫描输入目录
//! 3. **逐个处理**：每篇文档作为独立单元，失败不影响后续文档
//! 4. **全局统计**：汇总成功/失败数量与题目记录数

use crate::config::Config;
use crate::models::load_all_docx_files;
use crate::orchestrator::paper_processor::{self, DocumentOutcome};
use crate::services::{InMemoryTaskStore, TaskStore};
use crate::utils::logging;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<InMemoryTaskStore>,
}

/// 处理统计
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    /// 成功文档输出的记录总数（含小题）
    pub records: usize,
    pub outcomes: Vec<DocumentOutcome>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config.input_dir, &config.output_dir);

        let store = Arc::new(InMemoryTaskStore::with_ttl_secs(config.task_ttl_secs));
        Ok(Self { config, store })
    }

    pub fn task_store(&self) -> Arc<InMemoryTaskStore> {
        Arc::clone(&self.store)
    }

    /// 运行应用主逻辑
    ///
    /// `files` 为空时扫描 `input_dir`
    pub async fn run(&self, files: Vec<PathBuf>) -> Result<ProcessingStats> {
        let files = if files.is_empty() {
            self.load_documents().await?
        } else {
            files
        };

        if files.is_empty() {
            warn!("⚠️ 没有找到待解析的docx文件，程序结束");
            return Ok(ProcessingStats::default());
        }
        logging::log_files_loaded(files.len());

        let stats = self.process_all(&files).await;

        let evicted = self.store.evict_expired(chrono::Utc::now());
        if evicted > 0 {
            debug!("清理过期任务 {} 个", evicted);
        }

        logging::print_final_stats(
            stats.success,
            stats.failed,
            stats.total,
            stats.records,
            &self.config.output_log_file,
        );
        Ok(stats)
    }

    /// 加载待处理文档
    async fn load_documents(&self) -> Result<Vec<PathBuf>> {
        info!("\n📁 正在扫描待解析的文档...");
        Ok(load_all_docx_files(&self.config.input_dir).await?)
    }

    /// 顺序处理全部文档
    async fn process_all(&self, files: &[PathBuf]) -> ProcessingStats {
        let mut stats = ProcessingStats {
            total: files.len(),
            ..Default::default()
        };
        let store: Arc<dyn TaskStore> = self.store.clone();

        for (index, path) in files.iter().enumerate() {
            let file_name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
            logging::log_document_start(index + 1, files.len(), &file_name);

            let line = match paper_processor::process_document(path, &self.config, Arc::clone(&store)).await {
                Ok(outcome) => {
                    stats.success += 1;
                    stats.records += outcome.record_count;
                    let line = format!(
                        "✓ {} → {} ({} 道题)",
                        file_name,
                        outcome.output_path.display(),
                        outcome.question_count
                    );
                    stats.outcomes.push(outcome);
                    line
                }
                Err(e) => {
                    stats.failed += 1;
                    format!("❌ {}: {:#}", file_name, e)
                }
            };

            if let Err(e) = logging::append_log_line(&self.config.output_log_file, &line) {
                warn!("⚠️ 写入日志文件失败: {}", e);
            }
        }

        stats
    }
}
