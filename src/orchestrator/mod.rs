//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责遍历输入、调度评审流程、保存结果和输出统计，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 评审流水线
//! - 单条模式：逐条需求评审，逐条追加保存，结束时覆盖写入完整结果
//! - 批量模式：逐个接口文件评审，每个文件一个结果表格，最后写汇总表格
//! - 维护运行计数（总数 / 已处理 / 成功 / 失败）并输出进度
//! - 写运行日志和最终统计
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (处理 Vec<Record> / Vec<接口文件>)
//!     ↓
//! workflow::ReviewFlow (处理单个 UnitOfWork)
//!     ↓
//! services (能力层：prompt / review / classify / store / backup)
//!     ↓
//! clients (评审服务边界：Reviewer)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → clients
//! 2. **不中断**：单项失败只影响计数，循环总会走完
//! 3. **无业务逻辑**：只做调度和统计，不做具体评审判断

pub mod pipeline;

pub use pipeline::{BatchPaths, Pipeline, PipelineOptions, RunSummary, SinglePaths};
