pub mod output;
pub mod report;

pub use crate::domain::model::{DateRange, LessonCount, Partnership};
pub use crate::domain::ports::{LessonCountRepository, LessonCountStream, TokenSource};
pub use crate::utils::error::Result;
