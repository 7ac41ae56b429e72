use crate::error::SourceReadError;
use crate::models::record::{Field, Record};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use umya_spreadsheet::Worksheet;

/// 读取工作表为字符串表格（含表头行）
///
/// 行列均按最大使用范围展开，空单元格为空字符串。
pub fn sheet_rows(sheet: &Worksheet) -> Vec<Vec<String>> {
    let max_row = sheet.get_highest_row();
    let max_col = sheet.get_highest_column();
    (1..=max_row)
        .map(|row| {
            (1..=max_col)
                .map(|col| sheet.get_value((col, row)))
                .collect()
        })
        .collect()
}

/// 从 Excel 文件加载需求记录
///
/// 读取第一个工作表，第一行为表头，按列名取值，保持行顺序。
/// 空表格（或只有表头）返回空列表，由调用方决定如何处理。
pub fn load_records(path: &Path) -> Result<Vec<Record>, SourceReadError> {
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(SourceReadError::NotFound { path: shown });
    }

    let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| SourceReadError::Unreadable {
        path: shown.clone(),
        message: e.to_string(),
    })?;

    let sheet = book
        .get_sheet_collection()
        .first()
        .ok_or_else(|| SourceReadError::NoSheet {
            path: shown.clone(),
        })?;

    let rows = sheet_rows(sheet);
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };

    let columns: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();

    if !columns.contains_key(Field::Identifier.column()) {
        return Err(SourceReadError::MissingColumn {
            path: shown,
            column: Field::Identifier.column().to_string(),
        });
    }

    let mut records = Vec::with_capacity(data.len());
    for (offset, row) in data.iter().enumerate() {
        let record = Record::from_cells(|field| {
            columns
                .get(field.column())
                .and_then(|&idx| row.get(idx))
                .cloned()
        });
        if record.is_blank() {
            continue;
        }
        if !record.has(Field::Identifier) {
            warn!("⚠️ 第 {} 行缺少标识: {}", offset + 2, shown);
        }
        records.push(record);
    }

    Ok(records)
}

/// 列出目录下所有 .xlsx 文件，按文件名排序
pub fn list_workbooks(dir: &Path) -> Result<Vec<PathBuf>, SourceReadError> {
    let shown = dir.display().to_string();
    if !dir.is_dir() {
        return Err(SourceReadError::NotFound { path: shown });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| SourceReadError::DirectoryUnreadable {
        path: shown.clone(),
        message: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path.extension().and_then(|s| s.to_str()) == Some("xlsx")
                // Excel 打开文件时留下的锁文件
                && !path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .is_some_and(|name| name.starts_with("~$"))
        })
        .collect();
    files.sort();

    info!("📁 在 {} 中找到 {} 个接口需求文件", shown, files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_book(path: &Path, rows: &[&[&str]]) {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet
                    .get_cell_mut(((c + 1) as u32, (r + 1) as u32))
                    .set_value_string(*value);
            }
        }
        umya_spreadsheet::writer::xlsx::write(&book, path).unwrap();
    }

    #[test]
    fn test_load_records_by_column_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.xlsx");
        // 列顺序与约定不同，只按列名读取
        write_book(
            &path,
            &[
                &["作者", "标识", "需求描述"],
                &["张工", "REQ_001", "系统应完成初始化"],
                &["", "", ""],
                &["李工", "REQ_002", ""],
            ],
        );

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier(), "REQ_001");
        assert_eq!(records[0].author(), "张工");
        assert_eq!(records[0].value(Field::Description), "系统应完成初始化");
        assert_eq!(records[1].identifier(), "REQ_002");
        assert_eq!(records[1].value(Field::Description), "无");
        assert_eq!(records[1].value(Field::Title), "无");
    }

    #[test]
    fn test_header_only_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_book(&path, &[&["标识", "标题"]]);

        assert!(load_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_and_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_records(&dir.path().join("nope.xlsx")),
            Err(SourceReadError::NotFound { .. })
        ));

        let path = dir.path().join("no_id.xlsx");
        write_book(&path, &[&["标题"], &["某需求"]]);
        assert!(matches!(
            load_records(&path),
            Err(SourceReadError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, "这不是一个表格文件").unwrap();

        assert!(matches!(
            load_records(&path),
            Err(SourceReadError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_list_workbooks_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_book(&dir.path().join("B.xlsx"), &[&["标识"]]);
        write_book(&dir.path().join("A.xlsx"), &[&["标识"]]);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("~$A.xlsx"), "lock").unwrap();

        let files = list_workbooks(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.xlsx", "B.xlsx"]);
    }
}
