pub mod loaders;
pub mod outcome;
pub mod record;

pub use loaders::{list_workbooks, load_records};
pub use outcome::{CellValue, KeywordCounts, OutputLayout, ReviewOutcome};
pub use record::{DerivationFlag, Field, Record, PLACEHOLDER};
