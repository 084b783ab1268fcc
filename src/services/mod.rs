//! 业务能力层：题目组装、题干过滤、任务记录

pub mod paragraph_filter;
pub mod parse_service;
pub mod task_store;

pub use paragraph_filter::{FilterContext, StemFilter};
pub use parse_service::{ParseOptions, ParseOutcome, ParseService};
pub use task_store::{InMemoryTaskStore, TaskMetadata, TaskRecord, TaskStatus, TaskStore};
