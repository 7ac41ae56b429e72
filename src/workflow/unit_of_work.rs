//! 评审单元
//!
//! 单条模式的单元是一条需求；批量模式的单元是一个接口需求文件中的全部需求。
//! 两者共用同一条 渲染 → 评审 → 分类 流程，只在渲染方式和结果形状上不同。

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{KeywordCounts, OutputLayout, Record, ReviewOutcome};
use crate::services::prompt_builder::{render_group, render_record};

/// 评审单元
pub trait UnitOfWork {
    /// 日志与结果中使用的名称（需求标识 / 接口名称）
    fn label(&self) -> &str;

    /// 代入模板 `[REQUIREMENT]` 处的文本
    fn render_requirement(&self) -> String;

    /// 是否只统计 `[评审结果]` 段内的关键词
    fn isolates_result_section(&self) -> bool;

    /// 结果表格格式
    fn layout(&self) -> OutputLayout;

    /// 组装评审结果
    fn build_outcome(&self, counts: KeywordCounts, review_text: String, elapsed: Duration) -> ReviewOutcome;
}

/// 单条需求
#[derive(Debug, Clone, Copy)]
pub struct RecordUnit<'a> {
    record: &'a Record,
}

impl<'a> RecordUnit<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }
}

impl UnitOfWork for RecordUnit<'_> {
    fn label(&self) -> &str {
        self.record.identifier()
    }

    fn render_requirement(&self) -> String {
        render_record(self.record)
    }

    fn isolates_result_section(&self) -> bool {
        false
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout::Single
    }

    fn build_outcome(&self, counts: KeywordCounts, review_text: String, _elapsed: Duration) -> ReviewOutcome {
        ReviewOutcome {
            subject: self.record.identifier().to_string(),
            author: Some(self.record.author().to_string()),
            requirement_count: None,
            counts,
            review_text,
            elapsed_secs: None,
        }
    }
}

/// 接口需求集合（一个输入文件）
#[derive(Debug, Clone)]
pub struct InterfaceGroup {
    name: String,
    source: PathBuf,
    records: Vec<Record>,
}

impl InterfaceGroup {
    /// 以文件名主干作为接口名称
    pub fn new(source: impl Into<PathBuf>, records: Vec<Record>) -> Self {
        let source = source.into();
        let name = interface_name(&source);
        Self { name, source, records }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// 从文件路径得到接口名称
pub fn interface_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl UnitOfWork for InterfaceGroup {
    fn label(&self) -> &str {
        &self.name
    }

    fn render_requirement(&self) -> String {
        render_group(&self.records)
    }

    fn isolates_result_section(&self) -> bool {
        true
    }

    fn layout(&self) -> OutputLayout {
        OutputLayout::BatchDetail
    }

    fn build_outcome(&self, counts: KeywordCounts, review_text: String, elapsed: Duration) -> ReviewOutcome {
        ReviewOutcome {
            subject: self.name.clone(),
            author: None,
            requirement_count: Some(self.records.len()),
            counts,
            review_text,
            elapsed_secs: Some(elapsed.as_secs_f64()),
        }
    }
}

impl Display for InterfaceGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[接口 {} | 需求 {} 条]", self.name, self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;

    #[test]
    fn test_record_unit_outcome() {
        let record = Record::new("REQ_001").with(Field::Author, "张工");
        let unit = RecordUnit::new(&record);

        let outcome = unit.build_outcome(KeywordCounts::default(), "通过".to_string(), Duration::from_secs(5));
        assert_eq!(outcome.subject, "REQ_001");
        assert_eq!(outcome.author.as_deref(), Some("张工"));
        assert_eq!(outcome.elapsed_secs, None);
        assert!(!unit.isolates_result_section());
    }

    #[test]
    fn test_group_named_after_file() {
        let group = InterfaceGroup::new(
            "/data/接口需求集合/CREATE_MUTEX.xlsx",
            vec![Record::new("CREATE_MUTEX_001"), Record::new("CREATE_MUTEX_002")],
        );

        assert_eq!(group.name(), "CREATE_MUTEX");
        assert_eq!(group.to_string(), "[接口 CREATE_MUTEX | 需求 2 条]");

        let outcome = group.build_outcome(KeywordCounts::default(), String::new(), Duration::from_millis(1500));
        assert_eq!(outcome.requirement_count, Some(2));
        assert_eq!(outcome.elapsed_secs, Some(1.5));
        assert_eq!(outcome.author, None);
        assert!(group.render_requirement().contains("**需求 2 - 标识: CREATE_MUTEX_002**"));
    }
}
