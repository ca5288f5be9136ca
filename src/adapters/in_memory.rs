use crate::domain::model::{DateRange, LessonCount};
use crate::domain::ports::{LessonCountRepository, LessonCountStream};
use futures::stream::{self, StreamExt};

/// Fixed-data repository for tests. Dates are accepted but not applied.
#[derive(Debug, Clone)]
pub struct InMemoryLessonCountRepository {
    data: Vec<LessonCount>,
}

impl InMemoryLessonCountRepository {
    pub fn new(data: Vec<LessonCount>) -> Self {
        Self { data }
    }

    pub fn rows(&self) -> &[LessonCount] {
        &self.data
    }
}

impl Default for InMemoryLessonCountRepository {
    fn default() -> Self {
        Self::new(vec![
            LessonCount::new("EIRL", 70, 1),
            LessonCount::new("EIRL", 71, 2),
            LessonCount::new("EI", 72, 3),
            LessonCount::new("EI", 73, 4),
            LessonCount::new("EI", 74, 5),
            LessonCount::new("EI", 75, 6),
        ])
    }
}

impl LessonCountRepository for InMemoryLessonCountRepository {
    fn compute_lesson_counts<'a>(
        &'a self,
        partnership_type: &'a str,
        _period: DateRange,
    ) -> LessonCountStream<'a> {
        stream::iter(
            self.data
                .iter()
                .filter(move |row| row.partnership_type == partnership_type)
                .cloned()
                .map(Ok),
        )
        .boxed()
    }
}
