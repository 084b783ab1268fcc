//! # Paper Parser
//!
//! 把标准化的中文试卷 docx 解析为结构化的题目树
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 段落与文本块、大题与题块、提取出的属性、输出的题目记录
//! - `QuestionType` - 由大题标题推断的题型
//!
//! ### ② 解析层（Parser）
//! - `DocxReader` - 读取 docx 容器中的正文段落与图片
//! - `StructureRecognizer` - 把段落序列切分为 大题 → 题块 → 小题
//! - `AttributeExtractor` - 答案/难度/知识点/解析提取，支持三种答案编码
//! - `FormulaConverter` - OMML → MathML 简化转换
//! - `ImageRegister` - 图片识别、编号与落盘
//! - `TokenGenerator` - 富文本 token 生成与 HTML 渲染
//!
//! ### ③ 业务能力层（Services）
//! - `ParseService` - 按题块形态组装题目记录
//! - `StemFilter` - 题干段落过滤
//! - `TaskStore` - 任务状态与结果记录
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量文档处理器
//! - `orchestrator/paper_processor` - 单篇文档处理器
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{DocxDocument, Paragraph, QuestionRecord, QuestionType};
pub use orchestrator::{process_document, App};
pub use parser::DocxReader;
pub use services::{InMemoryTaskStore, ParseService, TaskStatus, TaskStore};
