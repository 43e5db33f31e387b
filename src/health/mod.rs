//! Liveness check of in-progress downloads.

pub mod evaluator;
pub mod report;

pub use evaluator::evaluate;
pub use report::{Assessment, Classification, HealthReport, Severity};
