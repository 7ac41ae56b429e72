//! 备份写入服务 - 业务能力层
//!
//! 只负责"把结果行追加到 CSV 备份文件"能力，不关心流程。
//! 文件不存在时先写表头；已存在时只追加数据行。

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::PersistenceError;
use crate::models::CellValue;

/// 结果表格写入失败时的兜底备份后缀
pub const FALLBACK_SUFFIX: &str = "_backup";
/// 调用方收到保存失败后写入的紧急备份后缀
pub const EMERGENCY_SUFFIX: &str = "_紧急备份";

/// 根据结果表格路径推导备份文件路径：`<目录>/<文件名主干><后缀>.csv`
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}.csv", stem, suffix))
}

/// CSV 备份写入服务
pub struct BackupWriter {
    path: PathBuf,
}

impl BackupWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 兜底备份（`_backup.csv`）
    pub fn fallback_for(path: &Path) -> Self {
        Self::new(backup_path(path, FALLBACK_SUFFIX))
    }

    /// 紧急备份（`_紧急备份.csv`）
    pub fn emergency_for(path: &Path) -> Self {
        Self::new(backup_path(path, EMERGENCY_SUFFIX))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加若干数据行
    ///
    /// # 参数
    /// - `headers`: 表头（仅在文件不存在时写入）
    /// - `rows`: 数据行
    pub fn append(&self, headers: &[&str], rows: &[Vec<CellValue>]) -> Result<(), PersistenceError> {
        let shown = self.path.display().to_string();
        let is_new = !self.path.exists();
        debug!("写入CSV备份: {} (新文件: {}, 行数: {})", shown, is_new, rows.len());

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::from_io(shown.clone(), &e))?;

        let csv_err = |e: csv::Error| PersistenceError::Csv {
            path: shown.clone(),
            message: e.to_string(),
        };

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(headers).map_err(csv_err)?;
        }
        for row in rows {
            writer
                .write_record(row.iter().map(CellValue::to_text))
                .map_err(csv_err)?;
        }
        writer
            .flush()
            .map_err(|e| PersistenceError::from_io(shown.clone(), &e))?;

        Ok(())
    }

    /// 覆盖写入整个表格（表头 + 全部数据行）
    pub fn overwrite(&self, headers: &[&str], rows: &[Vec<CellValue>]) -> Result<(), PersistenceError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| PersistenceError::from_io(self.path.display().to_string(), &e))?;
        }
        self.append(headers, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_path_naming() {
        let path = Path::new("/tmp/评审结果/评审结果-cot.xlsx");
        assert_eq!(
            backup_path(path, EMERGENCY_SUFFIX),
            PathBuf::from("/tmp/评审结果/评审结果-cot_紧急备份.csv")
        );
        assert_eq!(
            BackupWriter::fallback_for(path).path(),
            Path::new("/tmp/评审结果/评审结果-cot_backup.csv")
        );
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(dir.path().join("out_backup.csv"));
        let headers = ["标识", "通过", "评审结果"];

        writer
            .append(&headers, &[vec!["REQ_001".into(), 2usize.into(), "通过, 通过".into()]])
            .unwrap();
        writer
            .append(&headers, &[vec!["REQ_002".into(), 0usize.into(), "多行\n文本".into()]])
            .unwrap();

        let mut reader = csv::Reader::from_path(writer.path()).unwrap();
        let header = reader.headers().unwrap().clone();
        assert_eq!(header.iter().collect::<Vec<_>>(), headers);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "通过, 通过");
        assert_eq!(&rows[1][0], "REQ_002");
        assert_eq!(&rows[1][2], "多行\n文本");
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let writer = BackupWriter::new(dir.path().join("final.csv"));
        writer.append(&["a"], &[vec!["1".into()], vec!["2".into()]]).unwrap();
        writer.overwrite(&["a"], &[vec!["3".into()]]).unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content, "a\n3\n");
    }
}
