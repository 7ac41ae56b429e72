//! 评审流水线 - 编排层
//!
//! ## 职责
//!
//! 单条模式与批量模式共用同一个 `Pipeline`，区别只在评审单元（`UnitOfWork`）：
//!
//! - **单条模式**：逐行读取需求表格，每条需求单独评审，逐条追加到结果表格，
//!   结束时用完整结果覆盖写入
//! - **批量模式**：遍历接口需求目录，每个文件的全部需求作为一个单元评审，
//!   每个文件一个结果表格，最后写入汇总表格
//!
//! ## 失败处理
//!
//! - 评审失败：结果文本记录为错误信息，不中断
//! - 保存失败：计入失败数，写紧急备份，继续下一项
//! - 批量模式读取失败：记录错误并跳过该文件
//!
//! 任何情况下循环都会走完全部输入，`processed == total`。

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::clients::Reviewer;
use crate::config::Config;
use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::{list_workbooks, load_records, OutputLayout, ReviewOutcome};
use crate::services::backup_writer::BackupWriter;
use crate::services::classifier::ResponseClassifier;
use crate::services::progress::PipelineState;
use crate::services::prompt_builder::PromptTemplate;
use crate::services::result_store::{ResultStore, StorePolicy};
use crate::services::review_service::{RetryPolicy, ReviewService};
use crate::utils::logging::rule;
use crate::utils::{format_elapsed, RunLog};
use crate::workflow::{InterfaceGroup, RecordUnit, ReviewFlow, UnitOfWork};

/// 批量模式汇总表格文件名
pub const SUMMARY_FILE: &str = "接口评审汇总.xlsx";
/// 批量模式总日志文件名
pub const GLOBAL_LOG_FILE: &str = "评审总日志.txt";

/// 流水线参数
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub retry: RetryPolicy,
    pub store: StorePolicy,
    /// 批量模式相邻两个输入文件之间的间隔
    pub inter_item_pause: Duration,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy {
                max_attempts: config.review_attempts,
                empty_delay: config.empty_retry_delay(),
                error_delay: config.error_retry_delay(),
            },
            store: StorePolicy {
                max_attempts: config.store_attempts,
                lock_delay: config.store_lock_delay(),
            },
            inter_item_pause: config.inter_item_pause(),
        }
    }

    /// 不等待的参数（测试用）
    pub fn immediate() -> Self {
        Self {
            retry: RetryPolicy::immediate(3),
            store: StorePolicy {
                max_attempts: 3,
                lock_delay: Duration::ZERO,
            },
            inter_item_pause: Duration::ZERO,
        }
    }
}

/// 单条模式的文件路径
#[derive(Debug, Clone)]
pub struct SinglePaths {
    pub requirements: PathBuf,
    pub output: PathBuf,
    pub log: PathBuf,
}

impl SinglePaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            requirements: config.requirements_file.clone(),
            output: config.output_file.clone(),
            log: config.log_file.clone(),
        }
    }
}

/// 批量模式的目录
#[derive(Debug, Clone)]
pub struct BatchPaths {
    pub interfaces_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl BatchPaths {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interfaces_dir: config.interfaces_dir.clone(),
            results_dir: config.results_dir.clone(),
        }
    }

    pub fn output_for(&self, name: &str) -> PathBuf {
        self.results_dir.join(format!("评审结果-{}.xlsx", name))
    }

    pub fn log_for(&self, name: &str) -> PathBuf {
        self.results_dir.join(format!("评审日志-{}.txt", name))
    }

    pub fn summary(&self) -> PathBuf {
        self.results_dir.join(SUMMARY_FILE)
    }

    pub fn global_log(&self) -> PathBuf {
        self.results_dir.join(GLOBAL_LOG_FILE)
    }
}

/// 运行统计
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub outcomes: Vec<ReviewOutcome>,
}

impl RunSummary {
    fn finish(state: &PipelineState, outcomes: Vec<ReviewOutcome>) -> Self {
        Self {
            total: state.total,
            processed: state.processed,
            success: state.success,
            failed: state.failed,
            elapsed: state.elapsed(),
            outcomes,
        }
    }

    /// 平均每项耗时（秒）
    pub fn average_secs(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.elapsed.as_secs_f64() / self.processed as f64
        }
    }
}

/// 评审流水线
pub struct Pipeline<R> {
    flow: ReviewFlow<R>,
    store: ResultStore,
    inter_item_pause: Duration,
}

impl<R: Reviewer> Pipeline<R> {
    /// 创建流水线
    ///
    /// # 参数
    /// - `reviewer`: 评审客户端（生产环境为 `LlmClient`，测试中可替换）
    /// - `template`: 已代入检查单的提示词模板
    /// - `options`: 重试与节流参数
    pub fn new(reviewer: R, template: PromptTemplate, options: PipelineOptions) -> AppResult<Self> {
        let classifier =
            ResponseClassifier::new().map_err(|e| AppError::Other(format!("关键词规则无效: {}", e)))?;
        let flow = ReviewFlow::new(template, ReviewService::new(reviewer, options.retry), classifier);

        Ok(Self {
            flow,
            store: ResultStore::new(options.store),
            inter_item_pause: options.inter_item_pause,
        })
    }

    pub fn reviewer(&self) -> &R {
        self.flow.reviewer()
    }

    /// 单条模式
    ///
    /// 需求文件读取失败直接返回错误；文件为空时只打印警告，不产生任何输出。
    pub async fn run_single(&self, paths: &SinglePaths) -> AppResult<RunSummary> {
        info!("📁 读取需求文件: {}", paths.requirements.display());
        let records = load_records(&paths.requirements)?;

        if records.is_empty() {
            warn!("⚠️ 需求文件中没有数据，程序结束: {}", paths.requirements.display());
            return Ok(RunSummary::default());
        }

        let total = records.len();
        info!("✅ 共读取 {} 条需求", total);

        let run_log = RunLog::create(
            &paths.log,
            "评审开始时间",
            &[
                format!("需求文件: {}", paths.requirements.display()),
                format!("评审模型: {}", self.reviewer().model_name()),
                format!("需求总数: {}", total),
                rule('=', 50),
            ],
        );

        let mut state = PipelineState::new(total);
        let mut outcomes = Vec::with_capacity(total);

        for (index, record) in records.iter().enumerate() {
            state.begin_item();
            info!("{}", rule('-', 60));
            info!("🔄 [{}/{}] 开始评审需求: {}", index + 1, total, record.identifier());

            let unit = RecordUnit::new(record);
            let outcome = self.process_unit(&unit, &paths.output, &mut state).await;

            run_log.append(&[
                format!("需求 {} 处理完成", outcome.subject),
                format!(
                    "评审摘要: 失败={}, 通过={}, 额外问题={}",
                    outcome.counts.fail, outcome.counts.pass, outcome.counts.extra_issues
                ),
            ]);
            info!("{}", state.snapshot());

            outcomes.push(outcome);
        }

        self.write_final(&paths.output, OutputLayout::Single, &outcomes);

        let summary = RunSummary::finish(&state, outcomes);
        run_log.append(&[
            rule('=', 50),
            format!(
                "评审完成: 共 {} 条, 成功保存 {} 条, 保存失败 {} 条, 总耗时 {}",
                summary.total,
                summary.success,
                summary.failed,
                format_elapsed(summary.elapsed.as_secs_f64())
            ),
        ]);
        log_single_stats(&summary, paths);

        Ok(summary)
    }

    /// 批量模式
    ///
    /// 输入目录不存在或无法读取时返回错误；单个文件读取失败只跳过该文件。
    pub async fn run_batch(&self, paths: &BatchPaths) -> AppResult<RunSummary> {
        info!("📁 正在扫描接口需求目录: {}", paths.interfaces_dir.display());
        let inputs = list_workbooks(&paths.interfaces_dir)?;

        if inputs.is_empty() {
            warn!("⚠️ 没有找到待评审的接口需求文件，程序结束");
            return Ok(RunSummary::default());
        }

        std::fs::create_dir_all(&paths.results_dir)
            .map_err(|e| PersistenceError::from_io(paths.results_dir.display().to_string(), &e))?;

        let total = inputs.len();
        let mut header = vec![
            format!("输入目录: {}", paths.interfaces_dir.display()),
            format!("评审模型: {}", self.reviewer().model_name()),
            format!("文件总数: {}", total),
        ];
        header.extend(inputs.iter().map(|p| format!("  - {}", p.display())));
        header.push(rule('=', 50));
        let global_log = RunLog::create(paths.global_log(), "批量评审开始时间", &header);

        let mut state = PipelineState::new(total);
        let mut outcomes = Vec::with_capacity(total);

        for (index, input) in inputs.iter().enumerate() {
            state.begin_item();
            info!("{}", rule('=', 60));
            info!("🔄 [{}/{}] 处理接口文件: {}", index + 1, total, input.display());

            let records = match load_records(input) {
                Ok(records) => records,
                Err(e) => {
                    error!("❌ 读取失败，跳过: {}", e);
                    global_log.line(format!("读取失败: {}", e));
                    state.record_failure();
                    info!("{}", state.snapshot());
                    continue;
                }
            };

            let group = InterfaceGroup::new(input, records);
            if group.is_empty() {
                warn!("⚠️ 接口文件中没有需求，跳过: {}", input.display());
                global_log.line(format!("{}: 无需求数据，已跳过", group.name()));
                info!("{}", state.snapshot());
                continue;
            }

            info!("📋 {}", group);
            let input_log = RunLog::create(
                paths.log_for(group.name()),
                "评审开始时间",
                &[
                    format!("接口名称: {}", group.name()),
                    format!("源文件: {}", group.source().display()),
                    format!("需求数量: {}", group.len()),
                    rule('=', 50),
                ],
            );

            let output = paths.output_for(group.name());
            let outcome = self.process_unit(&group, &output, &mut state).await;
            let review_secs = outcome.elapsed_secs.unwrap_or_default();

            input_log.append(&[
                format!("评审耗时: {}", format_elapsed(review_secs)),
                format!("评审摘要: {}", outcome.counts),
                rule('-', 50),
                "评审结果:".to_string(),
                outcome.review_text.clone(),
            ]);
            global_log.line(format!(
                "{}: 需求 {} 条, {}, 耗时 {}",
                group.name(),
                group.len(),
                outcome.counts,
                format_elapsed(review_secs)
            ));
            info!("{}", state.snapshot());

            outcomes.push(outcome);

            // 只在实际调用过评审服务之后节流
            if index + 1 < total && !self.inter_item_pause.is_zero() {
                info!("⏳ 等待 {:.0} 秒后处理下一个文件...", self.inter_item_pause.as_secs_f64());
                sleep(self.inter_item_pause).await;
            }
        }

        if !outcomes.is_empty() {
            self.write_final(&paths.summary(), OutputLayout::BatchSummary, &outcomes);
        }

        let summary = RunSummary::finish(&state, outcomes);
        global_log.append(&[
            rule('=', 50),
            format!(
                "批量评审完成: 共 {} 个文件, 成功 {} 个, 失败 {} 个, 总耗时 {}",
                summary.total,
                summary.success,
                summary.failed,
                format_elapsed(summary.elapsed.as_secs_f64())
            ),
        ]);
        log_batch_stats(&summary, paths);

        Ok(summary)
    }

    /// 评审并保存一个单元，更新计数
    ///
    /// 结果表格未更新时写紧急备份，之后继续。
    async fn process_unit<U: UnitOfWork>(&self, unit: &U, output: &Path, state: &mut PipelineState) -> ReviewOutcome {
        let outcome = self.flow.run(unit).await;
        let layout = unit.layout();

        if self.store.append(output, layout, &outcome).await {
            state.record_success();
            info!("✅ [{}] 结果已保存: {}", unit.label(), output.display());
        } else {
            state.record_failure();
            error!("❌ [{}] 结果保存失败，写入紧急备份", unit.label());

            let backup = BackupWriter::emergency_for(output);
            match backup.append(&layout.headers(), &[layout.cells(&outcome)]) {
                Ok(()) => warn!("⚠️ 已写入紧急备份: {}", backup.path().display()),
                Err(e) => error!("❌ 紧急备份也失败了: {}", e),
            }
        }

        outcome
    }

    /// 覆盖写入最终结果，失败时改写为同名 CSV
    fn write_final(&self, path: &Path, layout: OutputLayout, outcomes: &[ReviewOutcome]) {
        match self.store.write_all(path, layout, outcomes) {
            Ok(()) => info!("✅ 最终结果已写入: {} ({} 行)", path.display(), outcomes.len()),
            Err(e) => {
                error!("❌ 最终结果写入失败: {}", e);
                let fallback = BackupWriter::new(path.with_extension("csv"));
                let rows: Vec<_> = outcomes.iter().map(|o| layout.cells(o)).collect();
                match fallback.overwrite(&layout.headers(), &rows) {
                    Ok(()) => warn!("⚠️ 已改为保存 CSV: {}", fallback.path().display()),
                    Err(e) => error!("❌ CSV 也保存失败: {}", e),
                }
            }
        }
    }
}

fn log_single_stats(summary: &RunSummary, paths: &SinglePaths) {
    info!("{}", rule('=', 60));
    info!("📊 评审完成统计");
    info!("   需求总数: {}", summary.total);
    info!("   成功保存: {}", summary.success);
    info!("   保存失败: {}", summary.failed);
    info!("   总耗时: {}", format_elapsed(summary.elapsed.as_secs_f64()));
    info!("   平均每条: {:.1}秒", summary.average_secs());
    info!("   日志文件: {}", paths.log.display());
    info!("   结果文件: {}", paths.output.display());
    info!("{}", rule('=', 60));
}

fn log_batch_stats(summary: &RunSummary, paths: &BatchPaths) {
    info!("{}", rule('=', 60));
    info!("📊 批量评审完成统计");
    info!("   文件总数: {}", summary.total);
    info!("   成功: {}", summary.success);
    info!("   失败: {}", summary.failed);
    info!("   总耗时: {}", format_elapsed(summary.elapsed.as_secs_f64()));
    for outcome in &summary.outcomes {
        info!(
            "   - {} ({} 条需求): {}",
            outcome.subject,
            outcome.requirement_count.unwrap_or_default(),
            outcome.counts
        );
    }
    info!("   结果目录: {}", paths.results_dir.display());
    info!("{}", rule('=', 60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReviewInvocationError;
    use crate::models::Field;
    use std::cell::Cell;

    /// 总是返回同一段文本
    struct Fixed(&'static str, Cell<usize>);

    impl Reviewer for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn review(&self, _prompt: &str) -> Result<String, ReviewInvocationError> {
            self.1.set(self.1.get() + 1);
            Ok(self.0.to_string())
        }
    }

    fn pipeline(reply: &'static str) -> Pipeline<Fixed> {
        let template = PromptTemplate::new("[CHECKLIST]\n[REQUIREMENT]", "检查单").unwrap();
        Pipeline::new(Fixed(reply, Cell::new(0)), template, PipelineOptions::immediate()).unwrap()
    }

    fn write_requirements(path: &Path, ids: &[&str]) {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        sheet.get_cell_mut((1, 1)).set_value_string(Field::Identifier.column());
        sheet.get_cell_mut((2, 1)).set_value_string(Field::Author.column());
        for (i, id) in ids.iter().enumerate() {
            let row = i as u32 + 2;
            sheet.get_cell_mut((1, row)).set_value_string(*id);
            sheet.get_cell_mut((2, row)).set_value_string("张工");
        }
        umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
    }

    #[test]
    fn test_batch_paths() {
        let paths = BatchPaths {
            interfaces_dir: PathBuf::from("in"),
            results_dir: PathBuf::from("out"),
        };
        assert_eq!(paths.output_for("CREATE_MUTEX"), PathBuf::from("out/评审结果-CREATE_MUTEX.xlsx"));
        assert_eq!(paths.log_for("CREATE_MUTEX"), PathBuf::from("out/评审日志-CREATE_MUTEX.txt"));
        assert_eq!(paths.summary(), PathBuf::from("out/接口评审汇总.xlsx"));
    }

    #[tokio::test]
    async fn test_single_run_counts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SinglePaths {
            requirements: dir.path().join("requirements.xlsx"),
            output: dir.path().join("评审结果-cot.xlsx"),
            log: dir.path().join("review_log.txt"),
        };
        write_requirements(&paths.requirements, &["REQ_001", "REQ_002"]);

        let pipeline = pipeline("通过");
        let summary = pipeline.run_single(&paths).await.unwrap();

        assert_eq!((summary.total, summary.processed, summary.success, summary.failed), (2, 2, 2, 0));
        assert_eq!(pipeline.reviewer().1.get(), 2);
        assert_eq!(summary.outcomes[1].author.as_deref(), Some("张工"));

        let log = std::fs::read_to_string(&paths.log).unwrap();
        assert!(log.contains("需求 REQ_002 处理完成"));
        assert!(log.contains("评审摘要: 失败=0, 通过=1, 额外问题=0"));
    }

    #[tokio::test]
    async fn test_single_empty_input_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SinglePaths {
            requirements: dir.path().join("requirements.xlsx"),
            output: dir.path().join("out.xlsx"),
            log: dir.path().join("log.txt"),
        };
        write_requirements(&paths.requirements, &[]);

        let summary = pipeline("通过").run_single(&paths).await.unwrap();
        assert_eq!(summary.total, 0);
        assert!(!paths.output.exists());
        assert!(!paths.log.exists());
    }

    #[tokio::test]
    async fn test_single_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SinglePaths {
            requirements: dir.path().join("missing.xlsx"),
            output: dir.path().join("out.xlsx"),
            log: dir.path().join("log.txt"),
        };

        let err = pipeline("通过").run_single(&paths).await.unwrap_err();
        assert!(matches!(err, AppError::Source(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_pauses_only_after_reviewed_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BatchPaths {
            interfaces_dir: dir.path().join("接口需求集合"),
            results_dir: dir.path().join("评审结果"),
        };
        std::fs::create_dir_all(&paths.interfaces_dir).unwrap();
        write_requirements(&paths.interfaces_dir.join("A.xlsx"), &["A_001"]);
        std::fs::write(paths.interfaces_dir.join("B.xlsx"), "损坏的文件").unwrap();
        write_requirements(&paths.interfaces_dir.join("C.xlsx"), &[]);
        write_requirements(&paths.interfaces_dir.join("D.xlsx"), &["D_001"]);

        let options = PipelineOptions {
            inter_item_pause: Duration::from_secs(3),
            ..PipelineOptions::immediate()
        };
        let template = PromptTemplate::new("[CHECKLIST]\n[REQUIREMENT]", "检查单").unwrap();
        let pipeline = Pipeline::new(Fixed("通过", Cell::new(0)), template, options).unwrap();

        let started = tokio::time::Instant::now();
        let summary = pipeline.run_batch(&paths).await.unwrap();

        // A 之后等待一次；B、C 被跳过，D 是最后一个
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!((summary.processed, summary.success, summary.failed), (4, 2, 1));
        assert_eq!(pipeline.reviewer().1.get(), 2);
    }

    #[tokio::test]
    async fn test_batch_empty_input_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BatchPaths {
            interfaces_dir: dir.path().join("接口需求集合"),
            results_dir: dir.path().join("评审结果"),
        };
        std::fs::create_dir_all(&paths.interfaces_dir).unwrap();
        write_requirements(&paths.interfaces_dir.join("A.xlsx"), &[]);
        write_requirements(&paths.interfaces_dir.join("B.xlsx"), &["B_001"]);

        let summary = pipeline("[评审结果]通过[/评审结果]").run_batch(&paths).await.unwrap();
        assert_eq!((summary.total, summary.processed, summary.success, summary.failed), (2, 2, 1, 0));
        assert_eq!(summary.outcomes.len(), 1);
        assert!(!paths.output_for("A").exists());
        assert!(paths.output_for("B").exists());
        assert!(paths.summary().exists());
    }
}
