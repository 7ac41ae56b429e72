//! 需求记录与列定义

use std::fmt;

/// 缺失字段的固定占位值
pub const PLACEHOLDER: &str = "无";

/// 需求表格中的列
///
/// 每一列对应 `Record` 的一个字段，列名即表头文字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// 标识（必需列）
    Identifier,
    Title,
    Version,
    RequirementType,
    /// 是否派生的需求
    Derived,
    DerivationRationale,
    InterfaceSignature,
    Description,
    TestSuggestion,
    Comment,
    Author,
}

impl Field {
    /// 所有列，按表格约定顺序
    pub const ALL: [Field; 11] = [
        Field::Identifier,
        Field::Title,
        Field::Version,
        Field::RequirementType,
        Field::Derived,
        Field::DerivationRationale,
        Field::InterfaceSignature,
        Field::Description,
        Field::TestSuggestion,
        Field::Comment,
        Field::Author,
    ];

    /// 提示词中逐条渲染的字段（标识之后，作者之前）
    pub const REVIEWED: [Field; 9] = [
        Field::Title,
        Field::Version,
        Field::RequirementType,
        Field::Derived,
        Field::DerivationRationale,
        Field::InterfaceSignature,
        Field::Description,
        Field::TestSuggestion,
        Field::Comment,
    ];

    /// 表头名称
    pub fn column(self) -> &'static str {
        match self {
            Field::Identifier => "标识",
            Field::Title => "标题",
            Field::Version => "版本信息",
            Field::RequirementType => "需求类型",
            Field::Derived => "是否派生的需求",
            Field::DerivationRationale => "派生理由",
            Field::InterfaceSignature => "接口原型",
            Field::Description => "需求描述",
            Field::TestSuggestion => "测试建议",
            Field::Comment => "注释",
            Field::Author => "作者",
        }
    }

    /// 自由文本字段，单元格内容常被整体加上引号
    fn is_free_text(self) -> bool {
        matches!(
            self,
            Field::DerivationRationale
                | Field::InterfaceSignature
                | Field::Description
                | Field::TestSuggestion
                | Field::Comment
        )
    }

    /// 规范化单元格内容：去空白，自由文本去包裹的引号，空值视为缺失
    pub fn normalize(self, raw: &str) -> Option<String> {
        let value = raw.trim();
        let value = if self.is_free_text() && value.starts_with('"') {
            value.trim_matches('"')
        } else {
            value
        };
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// 是否派生的需求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationFlag {
    Derived,
    NotDerived,
    /// 缺失或无法识别
    Unspecified,
}

impl DerivationFlag {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if matches!(v.as_str(), "是" | "yes" | "y" | "true") => DerivationFlag::Derived,
            Some(v) if matches!(v.as_str(), "否" | "no" | "n" | "false") => DerivationFlag::NotDerived,
            _ => DerivationFlag::Unspecified,
        }
    }
}

/// 一条待评审的需求
///
/// 读取后不可变；除标识外的字段缺失时读取为 `PLACEHOLDER`。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    identifier: Option<String>,
    title: Option<String>,
    version: Option<String>,
    requirement_type: Option<String>,
    derived: Option<String>,
    derivation_rationale: Option<String>,
    interface_signature: Option<String>,
    description: Option<String>,
    test_suggestion: Option<String>,
    comment: Option<String>,
    author: Option<String>,
}

impl Record {
    /// 按列读取单元格构造记录
    ///
    /// `cell` 返回原始单元格文字，列不存在时返回 `None`。
    pub fn from_cells<F>(mut cell: F) -> Self
    where
        F: FnMut(Field) -> Option<String>,
    {
        let mut record = Record::default();
        for field in Field::ALL {
            let value = cell(field).and_then(|raw| field.normalize(&raw));
            *record.slot_mut(field) = value;
        }
        record
    }

    /// 以标识构造记录，其余字段由 `with` 补充
    pub fn new(identifier: impl Into<String>) -> Self {
        Record {
            identifier: Field::Identifier.normalize(&identifier.into()),
            ..Default::default()
        }
    }

    /// 设置某个字段（主要用于测试与样例数据）
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        *self.slot_mut(field) = field.normalize(&value.into());
        self
    }

    /// 读取字段值，缺失时返回占位值
    pub fn value(&self, field: Field) -> &str {
        self.slot(field).as_deref().unwrap_or(PLACEHOLDER)
    }

    /// 字段是否有实际内容
    pub fn has(&self, field: Field) -> bool {
        self.slot(field).is_some()
    }

    pub fn identifier(&self) -> &str {
        self.value(Field::Identifier)
    }

    pub fn author(&self) -> &str {
        self.value(Field::Author)
    }

    pub fn derivation(&self) -> DerivationFlag {
        DerivationFlag::parse(self.derived.as_deref())
    }

    /// 整行是否为空
    pub fn is_blank(&self) -> bool {
        Field::ALL.iter().all(|f| !self.has(*f))
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Identifier => &self.identifier,
            Field::Title => &self.title,
            Field::Version => &self.version,
            Field::RequirementType => &self.requirement_type,
            Field::Derived => &self.derived,
            Field::DerivationRationale => &self.derivation_rationale,
            Field::InterfaceSignature => &self.interface_signature,
            Field::Description => &self.description,
            Field::TestSuggestion => &self.test_suggestion,
            Field::Comment => &self.comment,
            Field::Author => &self.author,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Identifier => &mut self.identifier,
            Field::Title => &mut self.title,
            Field::Version => &mut self.version,
            Field::RequirementType => &mut self.requirement_type,
            Field::Derived => &mut self.derived,
            Field::DerivationRationale => &mut self.derivation_rationale,
            Field::InterfaceSignature => &mut self.interface_signature,
            Field::Description => &mut self.description,
            Field::TestSuggestion => &mut self.test_suggestion,
            Field::Comment => &mut self.comment,
            Field::Author => &mut self.author,
        }
    }
}
