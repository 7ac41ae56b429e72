//! 结果表格写入服务 - 业务能力层
//!
//! 每评审完一条就把结果追加到 Excel 表格，保证中途失败时已完成的结果不丢失。
//!
//! 写入顺序：
//! 1. 文件不存在：新建表格，写表头和第一行
//! 2. 文件存在：打开表格，找到（或新建）工作表，在最后一行之后追加
//! 3. 文件被占用：等待后重试，最多 `max_attempts` 次
//! 4. 表格结构无法原位追加：整表读出后连同新行重写
//! 5. 重写也失败：追加到 `_backup.csv`，并返回失败
//!
//! 返回 `false` 表示结果表格没有被更新，调用方应立即写紧急备份。

use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::PersistenceError;
use crate::models::loaders::sheet_rows;
use crate::models::{CellValue, OutputLayout, ReviewOutcome};
use crate::services::backup_writer::BackupWriter;

/// 默认工作表名称
pub const DEFAULT_SHEET: &str = "Sheet1";

/// 写入策略
#[derive(Debug, Clone)]
pub struct StorePolicy {
    /// 文件被占用时的总尝试次数
    pub max_attempts: u32,
    /// 文件被占用时的等待时间
    pub lock_delay: Duration,
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lock_delay: Duration::from_secs(2),
        }
    }
}

/// 结果表格写入服务
pub struct ResultStore {
    policy: StorePolicy,
    sheet_name: String,
}

impl ResultStore {
    pub fn new(policy: StorePolicy) -> Self {
        Self {
            policy,
            sheet_name: DEFAULT_SHEET.to_string(),
        }
    }

    /// 指定工作表名称
    pub fn with_sheet(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    /// 追加一条评审结果
    ///
    /// # 返回
    /// 结果表格是否已更新
    pub async fn append(&self, path: &Path, layout: OutputLayout, outcome: &ReviewOutcome) -> bool {
        let headers = layout.headers();
        let cells = layout.cells(outcome);

        match self.append_with(|| self.try_append(path, &headers, &cells)).await {
            Ok(()) => {
                debug!("已追加结果: {} -> {}", outcome.subject, path.display());
                true
            }
            Err(e) if e.is_locked() => {
                error!("❌ 文件持续被占用，请关闭后重试: {}", path.display());
                false
            }
            Err(e) if e.is_structural() => {
                warn!("❌ 写入失败: {}", e);
                warn!("⚠️ 检测到表格结构错误，尝试替代方案...");
                self.alternative_save(path, &headers, &cells)
            }
            Err(e) => {
                error!("❌ 写入失败: {}", e);
                false
            }
        }
    }

    /// 执行一次写入；文件被占用时等待后重试，其他错误直接返回
    async fn append_with<F>(&self, mut attempt: F) -> Result<(), PersistenceError>
    where
        F: FnMut() -> Result<(), PersistenceError>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut tried = 1;
        loop {
            match attempt() {
                Err(e) if e.is_locked() && tried < max_attempts => {
                    warn!(
                        "⚠️ 文件被占用，{:.0}秒后重试 ({}/{})...",
                        self.policy.lock_delay.as_secs_f64(),
                        tried,
                        max_attempts
                    );
                    sleep(self.policy.lock_delay).await;
                    tried += 1;
                }
                result => return result,
            }
        }
    }

    /// 覆盖写入全部结果（表头 + 所有行）
    pub fn write_all(
        &self,
        path: &Path,
        layout: OutputLayout,
        outcomes: &[ReviewOutcome],
    ) -> Result<(), PersistenceError> {
        let rows: Vec<Vec<CellValue>> = outcomes.iter().map(|o| layout.cells(o)).collect();
        self.write_fresh(path, &layout.headers(), &rows)
    }

    /// 原位追加一行
    fn try_append(&self, path: &Path, headers: &[&str], cells: &[CellValue]) -> Result<(), PersistenceError> {
        if !path.exists() {
            return self.write_fresh(path, headers, &[cells.to_vec()]);
        }

        let shown = path.display().to_string();
        let mut book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| PersistenceError::from_xlsx(shown.clone(), e))?;

        let sheet = self.sheet_mut(&mut book, &shown)?;

        let mut last_row = sheet.get_highest_row();
        // 只有一行且首格为空：视为空表
        if last_row == 1 && sheet.get_value((1, 1)).trim().is_empty() {
            last_row = 0;
        }

        let mut next_row = last_row + 1;
        if last_row == 0 {
            write_text_row(sheet, 1, headers);
            next_row = 2;
        }
        write_row(sheet, next_row, cells);

        umya_spreadsheet::writer::xlsx::write(&book, path)
            .map_err(|e| PersistenceError::from_xlsx(shown, e))
    }

    /// 替代保存：读出整张表，连同新行整体重写；仍失败则写入 CSV 备份
    fn alternative_save(&self, path: &Path, headers: &[&str], cells: &[CellValue]) -> bool {
        match self.rewrite_whole(path, headers, cells) {
            Ok(()) => {
                info!("✅ 使用替代方法保存成功");
                true
            }
            Err(e) => {
                warn!("⚠️ 无法追加到Excel: {}", e);
                let backup = BackupWriter::fallback_for(path);
                match backup.append(headers, &[cells.to_vec()]) {
                    Ok(()) => warn!("⚠️ 已保存到CSV备份: {}", backup.path().display()),
                    Err(e) => error!("❌ 替代保存方法失败: {}", e),
                }
                false
            }
        }
    }

    fn rewrite_whole(&self, path: &Path, headers: &[&str], cells: &[CellValue]) -> Result<(), PersistenceError> {
        if !path.exists() {
            return self.write_fresh(path, headers, &[cells.to_vec()]);
        }

        let shown = path.display().to_string();
        let book = umya_spreadsheet::reader::xlsx::read(path)
            .map_err(|e| PersistenceError::from_xlsx(shown.clone(), e))?;

        let mut existing = book
            .get_sheet_by_name(&self.sheet_name)
            .map(sheet_rows)
            .unwrap_or_default();
        existing.retain(|row| row.iter().any(|v| !v.trim().is_empty()));

        let mut fresh = umya_spreadsheet::new_file_empty_worksheet();
        let sheet = self.sheet_mut(&mut fresh, &shown)?;
        let mut row_idx = 1;
        if existing.is_empty() {
            write_text_row(sheet, row_idx, headers);
            row_idx += 1;
        }
        for row in &existing {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.get_cell_mut((col as u32 + 1, row_idx)).set_value(value.clone());
                }
            }
            row_idx += 1;
        }
        write_row(sheet, row_idx, cells);

        umya_spreadsheet::writer::xlsx::write(&fresh, path)
            .map_err(|e| PersistenceError::from_xlsx(shown, e))
    }

    /// 新建（覆盖）表格
    fn write_fresh(&self, path: &Path, headers: &[&str], rows: &[Vec<CellValue>]) -> Result<(), PersistenceError> {
        let shown = path.display().to_string();
        let mut book = umya_spreadsheet::new_file_empty_worksheet();
        let sheet = self.sheet_mut(&mut book, &shown)?;

        write_text_row(sheet, 1, headers);
        for (idx, row) in rows.iter().enumerate() {
            write_row(sheet, idx as u32 + 2, row);
        }

        umya_spreadsheet::writer::xlsx::write(&book, path)
            .map_err(|e| PersistenceError::from_xlsx(shown, e))
    }

    /// 获取目标工作表，不存在则新建
    fn sheet_mut<'a>(&self, book: &'a mut Spreadsheet, shown: &str) -> Result<&'a mut Worksheet, PersistenceError> {
        if book.get_sheet_by_name(&self.sheet_name).is_none() {
            book.new_sheet(self.sheet_name.as_str())
                .map_err(|msg| PersistenceError::Structural {
                    path: shown.to_string(),
                    message: msg.to_string(),
                })?;
        }
        book.get_sheet_by_name_mut(&self.sheet_name)
            .ok_or_else(|| PersistenceError::Structural {
                path: shown.to_string(),
                message: format!("工作表不存在: {}", self.sheet_name),
            })
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(StorePolicy::default())
    }
}

fn write_text_row(sheet: &mut Worksheet, row: u32, values: &[&str]) {
    for (idx, value) in values.iter().enumerate() {
        sheet
            .get_cell_mut((idx as u32 + 1, row))
            .set_value_string(*value);
    }
}

fn write_row(sheet: &mut Worksheet, row: u32, cells: &[CellValue]) {
    for (idx, value) in cells.iter().enumerate() {
        let cell = sheet.get_cell_mut((idx as u32 + 1, row));
        match value {
            CellValue::Text(s) => {
                cell.set_value_string(s.as_str());
            }
            CellValue::Number(n) => {
                cell.set_value_number(*n);
            }
        }
    }
}
