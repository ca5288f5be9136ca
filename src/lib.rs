pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::{BigQueryLessonCountRepository, InMemoryLessonCountRepository};
pub use config::{BigQuerySettings, ReportConfig};
pub use core::output::OutputFormat;
pub use core::report::{LessonReport, ReportRequest};
pub use domain::model::{DateRange, LessonCount, Partnership};
pub use utils::error::{ReportError, Result};
