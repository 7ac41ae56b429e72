pub mod logging;

pub use logging::{format_elapsed, truncate_text, RunLog};
