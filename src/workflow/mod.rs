pub mod review_flow;
pub mod unit_of_work;

pub use review_flow::ReviewFlow;
pub use unit_of_work::{InterfaceGroup, RecordUnit, UnitOfWork};
