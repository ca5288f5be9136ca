use crate::domain::ports::{LessonCountRepository, LessonCountStream};
use crate::utils::error::Result;
use crate::utils::validation::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One aggregated row: how many lessons a partnership type delivered in a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCount {
    pub partnership_type: String,
    /// `None` when the lesson's meeting point has no department.
    pub department: Option<i64>,
    pub number_of_lessons: u64,
}

impl LessonCount {
    pub fn new(partnership_type: impl Into<String>, department: i64, number_of_lessons: u64) -> Self {
        Self {
            partnership_type: partnership_type.into(),
            department: Some(department),
            number_of_lessons,
        }
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parses both bounds; a malformed bound is reported under its CLI option name.
    pub fn parse(date_start: &str, date_end: &str) -> Result<Self> {
        let start = parse_date("date_debut", date_start)?;
        let end = parse_date("date_fin", date_end)?;

        if start > end {
            tracing::warn!(
                "date_debut {} is after date_fin {}, the report will be empty",
                start,
                end
            );
        }

        Ok(Self { start, end })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partnership {
    kind: String,
}

impl Partnership {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn lesson_counts_by_department<'a, R>(
        &'a self,
        period: DateRange,
        repository: &'a R,
    ) -> LessonCountStream<'a>
    where
        R: LessonCountRepository + ?Sized,
    {
        repository.compute_lesson_counts(&self.kind, period)
    }
}
