// Adapters layer: concrete repositories and the credentials plumbing they need.

pub mod auth;
pub mod bigquery;
pub mod in_memory;

pub use auth::{ServiceAccountKey, ServiceAccountTokenSource, StaticTokenSource};
pub use bigquery::BigQueryLessonCountRepository;
pub use in_memory::InMemoryLessonCountRepository;
