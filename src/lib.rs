//! # Requirement Review
//!
//! 使用大模型对工程需求进行批量评审的工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 评审服务边界
//! - `Reviewer` - 发送提示词、返回评审文本的能力
//! - `LlmClient` - 基于 OpenAI 兼容接口的实现
//!
//! ### ② 数据模型（Models）
//! - `models/` - 需求记录、评审结果、表格格式
//! - `models/loaders/` - 从 Excel 读取需求
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个评审单元
//! - `PromptTemplate` - 提示词渲染
//! - `ReviewService` - 带重试的评审调用
//! - `ResponseClassifier` - 关键词统计
//! - `ResultStore` / `BackupWriter` - 结果保存与备份
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个评审单元"的完整处理流程
//! - `UnitOfWork` - 单条需求 / 接口需求集合
//! - `ReviewFlow` - 渲染 → 评审 → 分类
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 单条模式与批量模式，管理计数、日志和最终输出
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{LlmClient, Reviewer};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Record, ReviewOutcome};
pub use orchestrator::{BatchPaths, Pipeline, PipelineOptions, RunSummary, SinglePaths};
pub use services::PromptTemplate;
pub use workflow::{InterfaceGroup, RecordUnit, ReviewFlow, UnitOfWork};
