use crate::domain::model::{DateRange, LessonCount};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Rows are produced lazily; the remote repository fetches further pages as they are polled.
pub type LessonCountStream<'a> = BoxStream<'a, Result<LessonCount>>;

pub trait LessonCountRepository: Send + Sync {
    fn compute_lesson_counts<'a>(
        &'a self,
        partnership_type: &'a str,
        period: DateRange,
    ) -> LessonCountStream<'a>;
}

/// Supplies OAuth bearer tokens to the query engine client.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}
