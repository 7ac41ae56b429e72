//! 评审结果与输出表格格式

use std::fmt;

/// 五类关键词计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    pub fail: usize,
    pub uncertain: usize,
    pub not_applicable: usize,
    pub pass: usize,
    pub extra_issues: usize,
}

impl fmt::Display for KeywordCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "失败={}, 不确定={}, 不适用={}, 通过={}, 额外问题={}",
            self.fail, self.uncertain, self.not_applicable, self.pass, self.extra_issues
        )
    }
}

/// 一条需求（或一个接口需求集合）的评审结果
///
/// 创建后不再修改。
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// 需求标识，或批量模式下的接口名称
    pub subject: String,
    /// 作者（仅单条模式）
    pub author: Option<String>,
    /// 需求数量（仅批量模式）
    pub requirement_count: Option<usize>,
    pub counts: KeywordCounts,
    /// 评审文本（已去除思考过程 / 已提取结果段）
    pub review_text: String,
    /// 评审耗时，秒（仅批量模式）
    pub elapsed_secs: Option<f64>,
}

/// 单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    /// 以文本形式表示（用于 CSV 备份）
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<usize> for CellValue {
    fn from(value: usize) -> Self {
        CellValue::Number(value as f64)
    }
}

/// 输出表格格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// 单条评审结果
    Single,
    /// 批量模式下单个接口的评审结果
    BatchDetail,
    /// 批量模式汇总（不含评审文本）
    BatchSummary,
}

const COUNT_COLUMNS: [&str; 5] = ["失败", "不确定", "不适用", "通过", "额外问题"];

impl OutputLayout {
    /// 表头
    pub fn headers(self) -> Vec<&'static str> {
        let mut headers = match self {
            OutputLayout::Single => vec!["标识", "作者"],
            OutputLayout::BatchDetail | OutputLayout::BatchSummary => vec!["接口名称", "需求数量"],
        };
        headers.extend(COUNT_COLUMNS);
        match self {
            OutputLayout::Single => headers.push("评审结果"),
            OutputLayout::BatchDetail => headers.extend(["评审耗时(秒)", "评审结果"]),
            OutputLayout::BatchSummary => headers.push("评审耗时(秒)"),
        }
        headers
    }

    /// 按表头顺序展开一行
    pub fn cells(self, outcome: &ReviewOutcome) -> Vec<CellValue> {
        let mut cells = match self {
            OutputLayout::Single => vec![
                CellValue::from(outcome.subject.as_str()),
                CellValue::from(outcome.author.as_deref().unwrap_or(crate::models::PLACEHOLDER)),
            ],
            OutputLayout::BatchDetail | OutputLayout::BatchSummary => vec![
                CellValue::from(outcome.subject.as_str()),
                CellValue::from(outcome.requirement_count.unwrap_or(0)),
            ],
        };
        let c = &outcome.counts;
        cells.extend(
            [c.fail, c.uncertain, c.not_applicable, c.pass, c.extra_issues].map(CellValue::from),
        );

        let elapsed = CellValue::Number(round2(outcome.elapsed_secs.unwrap_or(0.0)));
        let text = CellValue::from(outcome.review_text.as_str());
        match self {
            OutputLayout::Single => cells.push(text),
            OutputLayout::BatchDetail => cells.extend([elapsed, text]),
            OutputLayout::BatchSummary => cells.push(elapsed),
        }
        cells
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
