//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量文档处理器
//! - 管理应用生命周期（初始化、运行）
//! - 扫描输入目录、顺序处理每篇文档
//! - 输出全局统计信息
//!
//! ### `paper_processor` - 单篇文档处理器
//! - 检查输入、登记任务
//! - 在阻塞线程中执行一次完整解析
//! - 写出结果 JSON，记录成功或失败
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! paper_processor (处理单篇 docx，持有任务记录)
//!     ↓
//! services::ParseService (组装题目记录，不依赖任务记录)
//!     ↓
//! parser (读取、识别、提取、渲染)
//! ```

pub mod batch_processor;
pub mod paper_processor;

pub use batch_processor::{App, ProcessingStats};
pub use paper_processor::{process_document, DocumentOutcome};
