//! 单篇文档处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **输入检查**：扩展名、存在性、大小上限
//! 2. **任务登记**：创建任务并置为 `processing`
//! 3. **解析**：在阻塞线程中执行一次完整解析（读取 → 识别 → 组装）
//! 4. **结果记录**：成功写入 `<output_dir>/<task_id>.json` 并记录结果，
//!    失败只记录一次错误，不保留部分结果与图片

use crate::config::Config;
use crate::models::{validate_docx_file, QuestionRecord};
use crate::parser::DocxReader;
use crate::services::{ParseOutcome, ParseService, TaskMetadata, TaskStatus, TaskStore};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 单篇文档的处理结果
#[derive(Debug, Clone)]
pub struct DocumentOutcome {
    pub task_id: String,
    pub file_name: String,
    /// 顶层题目数
    pub question_count: usize,
    /// 含小题的记录总数
    pub record_count: usize,
    pub image_count: usize,
    pub output_path: PathBuf,
}

/// 处理单篇文档
///
/// # 参数
/// - `path`: docx 文件路径
/// - `config`: 配置
/// - `store`: 任务记录
pub async fn process_document(path: &Path, config: &Config, store: Arc<dyn TaskStore>) -> Result<DocumentOutcome> {
    let file_name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let file_size = validate_docx_file(path, config.max_file_size)
        .await
        .with_context(|| format!("输入文件无效: {}", path.display()))?;

    let task_id = store.create(TaskMetadata {
        file_name: file_name.clone(),
        file_size,
    });
    store.update_status(&task_id, TaskStatus::Processing)?;
    info!("📋 任务 {} ← {} ({} 字节)", task_id, file_name, file_size);

    let parsed = async {
        let outcome = run_parse(path, config, &task_id).await?;
        let output_path = write_result(&config.output_dir, &task_id, &outcome.questions).await?;
        Ok::<_, anyhow::Error>((outcome, output_path))
    }
    .await;

    match parsed {
        Ok((outcome, output_path)) => {
            let result = DocumentOutcome {
                task_id: task_id.clone(),
                file_name,
                question_count: outcome.questions.len(),
                record_count: outcome.record_count(),
                image_count: outcome.images.len(),
                output_path,
            };
            store.set_result(&task_id, outcome.questions)?;
            info!(
                "✓ {} 解析成功: {} 道题（含小题 {} 条记录）, {} 张图片",
                result.file_name, result.question_count, result.record_count, result.image_count
            );
            Ok(result)
        }
        Err(e) => {
            error!("❌ {} 解析失败: {:#}", file_name, e);
            remove_task_images(config, &task_id).await;
            store.set_error(&task_id, format!("{:#}", e))?;
            Err(e)
        }
    }
}

/// 失败任务不保留已写入的图片
async fn remove_task_images(config: &Config, task_id: &str) {
    let image_dir = ParseService::from_config(config).task_image_dir(task_id);
    if !tokio::fs::try_exists(&image_dir).await.unwrap_or(false) {
        return;
    }
    match tokio::fs::remove_dir_all(&image_dir).await {
        Ok(()) => debug!("已清理图片目录: {}", image_dir.display()),
        Err(e) => warn!("⚠️ 清理图片目录失败 {}: {}", image_dir.display(), e),
    }
}

/// 一次完整解析，作为独立的阻塞任务执行
async fn run_parse(path: &Path, config: &Config, task_id: &str) -> Result<ParseOutcome> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("无法读取文件: {}", path.display()))?;

    let service = ParseService::from_config(config);
    let task_id = task_id.to_string();

    tokio::task::spawn_blocking(move || -> Result<ParseOutcome> {
        let document = DocxReader::new().from_bytes(&data).context("无法读取 docx 内容")?;
        let outcome = service.parse_document(&document, &task_id)?;
        Ok(outcome)
    })
    .await
    .context("解析任务异常退出")?
}

/// 写入 `<output_dir>/<task_id>.json`
async fn write_result(output_dir: &str, task_id: &str, questions: &[QuestionRecord]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("无法创建输出目录: {}", output_dir))?;

    let output_path = Path::new(output_dir).join(format!("{}.json", task_id));
    let json = serde_json::to_string_pretty(questions)?;
    tokio::fs::write(&output_path, json)
        .await
        .with_context(|| format!("无法写入结果: {}", output_path.display()))?;
    Ok(output_path)
}
