//! 任务记录 - 业务能力层
//!
//! 按任务 ID 记录一次解析的状态与结果。解析流程本身不依赖任务记录，
//! 只有编排层在解析前后写入。

use crate::error::{AppError, AppResult, TaskError};
use crate::models::QuestionRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    /// 解析完成
    Success,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// 创建任务时附带的信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    pub file_name: String,
    pub file_size: u64,
}

/// 任务记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    pub status: TaskStatus,
    pub metadata: TaskMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<QuestionRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 任务记录能力
pub trait TaskStore: Send + Sync {
    /// 新建任务，返回任务 ID
    fn create(&self, metadata: TaskMetadata) -> String;

    /// 查询任务；不存在或已过期返回 `None`
    fn get(&self, task_id: &str) -> Option<TaskRecord>;

    fn update_status(&self, task_id: &str, status: TaskStatus) -> AppResult<()>;

    /// 记录解析结果，状态置为 `success`
    fn set_result(&self, task_id: &str, result: Vec<QuestionRecord>) -> AppResult<()>;

    /// 记录失败原因，状态置为 `failed`
    fn set_error(&self, task_id: &str, message: String) -> AppResult<()>;

    /// 清理过期任务，返回清理数量
    fn evict_expired(&self, now: DateTime<Utc>) -> usize;
}

/// 进程内任务记录，超过 TTL 未更新的任务会被清理
#[derive(Debug)]
pub struct InMemoryTaskStore {
    ttl: Duration,
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl InMemoryTaskStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl_secs(secs: i64) -> Self {
        Self::new(Duration::seconds(secs))
    }

    pub fn len(&self) -> usize {
        self.tasks.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, record: &TaskRecord, now: DateTime<Utc>) -> bool {
        now - record.updated_at > self.ttl
    }

    fn modify(&self, task_id: &str, f: impl FnOnce(&mut TaskRecord)) -> AppResult<()> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| AppError::Other(format!("任务记录锁已损坏: {}", e)))?;
        let record = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound {
                task_id: task_id.to_string(),
            })?;
        f(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(&self, metadata: TaskMetadata) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = TaskRecord {
            task_id: task_id.clone(),
            status: TaskStatus::Pending,
            metadata,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        if let Ok(mut tasks) = self.tasks.write() {
            tasks.insert(task_id.clone(), record);
        }
        debug!("创建任务 {}", task_id);
        task_id
    }

    fn get(&self, task_id: &str) -> Option<TaskRecord> {
        let record = self.tasks.read().ok()?.get(task_id).cloned()?;
        if self.is_expired(&record, Utc::now()) {
            if let Ok(mut tasks) = self.tasks.write() {
                tasks.remove(task_id);
            }
            debug!("任务 {} 已过期", task_id);
            return None;
        }
        Some(record)
    }

    fn update_status(&self, task_id: &str, status: TaskStatus) -> AppResult<()> {
        self.modify(task_id, |record| record.status = status)
    }

    fn set_result(&self, task_id: &str, result: Vec<QuestionRecord>) -> AppResult<()> {
        self.modify(task_id, |record| {
            record.status = TaskStatus::Success;
            record.result = Some(result);
            record.error = None;
        })
    }

    fn set_error(&self, task_id: &str, message: String) -> AppResult<()> {
        self.modify(task_id, |record| {
            record.status = TaskStatus::Failed;
            record.result = None;
            record.error = Some(message);
        })
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut tasks) = self.tasks.write() else {
            return 0;
        };
        let before = tasks.len();
        tasks.retain(|_, record| now - record.updated_at <= self.ttl);
        before - tasks.len()
    }
}
