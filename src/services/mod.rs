pub mod backup_writer;
pub mod classifier;
pub mod progress;
pub mod prompt_builder;
pub mod result_store;
pub mod review_service;

pub use backup_writer::BackupWriter;
pub use classifier::ResponseClassifier;
pub use progress::{PipelineState, ProgressSnapshot};
pub use prompt_builder::PromptTemplate;
pub use result_store::{ResultStore, StorePolicy};
pub use review_service::{RetryPolicy, ReviewService};
