pub mod xlsx_loader;

pub use xlsx_loader::{list_workbooks, load_records, sheet_rows};
