//! 提示词构建服务 - 业务能力层
//!
//! 模板中包含两个占位符：`[REQUIREMENT]` 与 `[CHECKLIST]`。
//! 检查单在启动时代入一次；需求内容在每次渲染时代入。
//! 两个占位符都只替换模板原文中的那一处，代入的内容不会被再次扫描，
//! 因此即使检查单或需求正文里恰好出现占位符文字也不会被误替换。

use crate::error::TemplateError;
use crate::models::record::{Field, Record};
use std::path::Path;

/// 需求占位符
pub const REQUIREMENT_PLACEHOLDER: &str = "[REQUIREMENT]";
/// 检查单占位符
pub const CHECKLIST_PLACEHOLDER: &str = "[CHECKLIST]";

/// 已代入检查单的提示模板
///
/// 模板被切分为需求占位符前后两段文字，渲染时直接拼接。
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    head: String,
    tail: String,
}

impl PromptTemplate {
    /// 从模板文字与检查单构造
    ///
    /// 两个占位符必须各出现恰好一次。
    pub fn new(template: &str, checklist: &str) -> Result<Self, TemplateError> {
        for placeholder in [REQUIREMENT_PLACEHOLDER, CHECKLIST_PLACEHOLDER] {
            let found = template.matches(placeholder).count();
            if found != 1 {
                return Err(TemplateError::PlaceholderCount {
                    placeholder: placeholder.to_string(),
                    found,
                });
            }
        }

        let (head, tail) = template
            .split_once(REQUIREMENT_PLACEHOLDER)
            .unwrap_or((template, ""));

        // 检查单占位符只会落在其中一段
        Ok(Self {
            head: head.replacen(CHECKLIST_PLACEHOLDER, checklist, 1),
            tail: tail.replacen(CHECKLIST_PLACEHOLDER, checklist, 1),
        })
    }

    /// 从模板文件与检查单文件加载
    pub fn load(template_path: &Path, checklist_path: &Path) -> Result<Self, TemplateError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| TemplateError::Unreadable {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        };
        Self::new(&read(template_path)?, &read(checklist_path)?)
    }

    /// 代入需求内容，得到完整提示词
    pub fn render(&self, requirement: &str) -> String {
        let mut prompt = String::with_capacity(self.head.len() + requirement.len() + self.tail.len());
        prompt.push_str(&self.head);
        prompt.push_str(requirement);
        prompt.push_str(&self.tail);
        prompt
    }
}

/// 渲染单条需求
///
/// 标识 + 九个评审字段，按固定顺序、固定标题输出。
pub fn render_record(record: &Record) -> String {
    let mut text = format!("**{}**\n{}\n", Field::Identifier.column(), record.identifier());
    push_fields(&mut text, record, &Field::REVIEWED);
    text
}

/// 渲染一组需求（一个接口需求集合）
///
/// 每条需求带 1 起始的序号与标识小标题，字段顺序同单条模式并追加作者。
pub fn render_group(records: &[Record]) -> String {
    let mut text = String::new();
    for (idx, record) in records.iter().enumerate() {
        text.push_str(&format!(
            "\n**需求 {} - {}: {}**\n",
            idx + 1,
            Field::Identifier.column(),
            record.identifier()
        ));
        push_fields(&mut text, record, &Field::REVIEWED);
        push_fields(&mut text, record, &[Field::Author]);
        text.push('\n');
    }
    text
}

fn push_fields(text: &mut String, record: &Record, fields: &[Field]) {
    for field in fields {
        text.push_str(&format!("**{}**\n{}\n", field.column(), record.value(*field)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str) -> Record {
        Record::new(id)
            .with(Field::Title, "系统初始化需求")
            .with(Field::Derived, "否")
            .with(Field::Author, "张工")
    }

    #[test]
    fn test_render_replaces_both_placeholders() {
        let template = PromptTemplate::new("检查单:\n[CHECKLIST]\n需求:\n[REQUIREMENT]\n请评审", "1. 可测试").unwrap();
        let prompt = template.render("REQ_001 内容");

        assert_eq!(prompt, "检查单:\n1. 可测试\n需求:\nREQ_001 内容\n请评审");
    }

    #[test]
    fn test_placeholder_order_does_not_matter() {
        let a = PromptTemplate::new("[REQUIREMENT]|[CHECKLIST]", "C").unwrap();
        let b = PromptTemplate::new("[CHECKLIST]|[REQUIREMENT]", "C").unwrap();
        assert_eq!(a.render("R"), "R|C");
        assert_eq!(b.render("R"), "C|R");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let template = PromptTemplate::new("[CHECKLIST] / [REQUIREMENT]", "含有 [REQUIREMENT] 字样").unwrap();
        let prompt = template.render("正文含 [CHECKLIST]");
        assert_eq!(prompt, "含有 [REQUIREMENT] 字样 / 正文含 [CHECKLIST]");
    }

    #[test]
    fn test_placeholder_count_checked() {
        assert!(matches!(
            PromptTemplate::new("无占位符 [CHECKLIST]", "c"),
            Err(TemplateError::PlaceholderCount { found: 0, .. })
        ));
        assert!(matches!(
            PromptTemplate::new("[REQUIREMENT][REQUIREMENT][CHECKLIST]", "c"),
            Err(TemplateError::PlaceholderCount { found: 2, .. })
        ));
    }

    #[test]
    fn test_render_record_layout() {
        let text = render_record(&sample_record("REQ_001"));

        assert!(text.starts_with("**标识**\nREQ_001\n**标题**\n系统初始化需求\n**版本信息**\n无\n"));
        assert!(text.contains("**是否派生的需求**\n否\n"));
        assert!(text.ends_with("**注释**\n无\n"));
        // 单条模式不渲染作者
        assert!(!text.contains("张工"));
    }

    #[test]
    fn test_render_group_indexes_and_author() {
        let records = vec![sample_record("CREATE_MUTEX_001"), sample_record("CREATE_MUTEX_002")];
        let text = render_group(&records);

        let first = text.find("**需求 1 - 标识: CREATE_MUTEX_001**").unwrap();
        let second = text.find("**需求 2 - 标识: CREATE_MUTEX_002**").unwrap();
        assert!(first < second);
        assert_eq!(text.matches("**作者**\n张工\n").count(), 2);
    }

    #[test]
    fn test_render_is_deterministic() {
        let record = sample_record("REQ_003");
        assert_eq!(render_record(&record), render_record(&record));
    }
}
