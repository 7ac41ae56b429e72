//! 评审结果分类服务 - 业务能力层
//!
//! 统计评审文本中五类关键词的出现次数。这是启发式信号而不是结构化解析：
//! 分类永远不会失败，没有关键词时各项计数为 0。

use regex::Regex;

use crate::models::KeywordCounts;

/// 结果段开始标记
pub const RESULT_START: &str = "[评审结果]";
/// 结果段结束标记
pub const RESULT_END: &str = "[/评审结果]";

/// 评审关键词
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fail,
    Uncertain,
    NotApplicable,
    Pass,
    ExtraIssues,
}

impl Keyword {
    pub const ALL: [Keyword; 5] = [
        Keyword::Fail,
        Keyword::Uncertain,
        Keyword::NotApplicable,
        Keyword::Pass,
        Keyword::ExtraIssues,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Keyword::Fail => "失败",
            Keyword::Uncertain => "不确定",
            Keyword::NotApplicable => "不适用",
            Keyword::Pass => "通过",
            Keyword::ExtraIssues => "额外问题",
        }
    }
}

/// 提取 `[评审结果]` 与 `[/评审结果]` 之间的内容
///
/// 没有开始标记时返回全文；没有结束标记时取开始标记之后的全部内容。
pub fn extract_result_section(text: &str) -> String {
    let Some(start) = text.find(RESULT_START) else {
        return text.to_string();
    };
    let body = &text[start + RESULT_START.len()..];
    let section = match body.find(RESULT_END) {
        Some(end) => &body[..end],
        None => body,
    };
    section.trim().to_string()
}

/// 关键词分类器
pub struct ResponseClassifier {
    patterns: Vec<(Keyword, Regex)>,
}

impl ResponseClassifier {
    /// 编译关键词正则（整词匹配，Unicode 词边界）
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = Keyword::ALL
            .iter()
            .map(|&kw| Ok((kw, Regex::new(&format!(r"\b{}\b", regex::escape(kw.token())))?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    /// 统计单个关键词的整词出现次数
    pub fn count(&self, text: &str, keyword: Keyword) -> usize {
        self.patterns
            .iter()
            .find(|(kw, _)| *kw == keyword)
            .map(|(_, re)| re.find_iter(text).count())
            .unwrap_or(0)
    }

    /// 统计五类关键词
    pub fn classify(&self, text: &str) -> KeywordCounts {
        KeywordCounts {
            fail: self.count(text, Keyword::Fail),
            uncertain: self.count(text, Keyword::Uncertain),
            not_applicable: self.count(text, Keyword::NotApplicable),
            pass: self.count(text, Keyword::Pass),
            extra_issues: self.count(text, Keyword::ExtraIssues),
        }
    }
}
