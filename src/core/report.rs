use crate::core::output::{write_rows, OutputFormat};
use crate::core::{DateRange, LessonCount, LessonCountRepository, Partnership};
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::validate_non_empty_string;
use futures::TryStreamExt;
use std::io::Write;

/// A validated request: the partnership types in the order given, and the period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    partnerships: Vec<Partnership>,
    period: DateRange,
}

impl ReportRequest {
    pub fn new<S: AsRef<str>>(
        partnership_types: &[S],
        date_start: &str,
        date_end: &str,
    ) -> Result<Self> {
        let period = DateRange::parse(date_start, date_end)?;

        if partnership_types.is_empty() {
            return Err(ReportError::ValidationError {
                message: "at least one partnership type is required".to_string(),
            });
        }

        let partnerships = partnership_types
            .iter()
            .map(|kind| {
                validate_non_empty_string("partnership_type", kind.as_ref())?;
                Ok(Partnership::new(kind.as_ref()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            partnerships,
            period,
        })
    }

    pub fn partnerships(&self) -> &[Partnership] {
        &self.partnerships
    }

    pub fn period(&self) -> DateRange {
        self.period
    }
}

pub struct LessonReport<R: LessonCountRepository> {
    repository: R,
}

impl<R: LessonCountRepository> LessonReport<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Queries each partnership type in turn and concatenates the rows.
    pub async fn collect(&self, request: &ReportRequest) -> Result<Vec<LessonCount>> {
        let mut rows = Vec::new();

        for partnership in request.partnerships() {
            let before = rows.len();
            let mut stream =
                partnership.lesson_counts_by_department(request.period(), &self.repository);
            while let Some(row) = stream.try_next().await? {
                rows.push(row);
            }
            tracing::info!(
                "Partnership {}: {} department rows",
                partnership.kind(),
                rows.len() - before
            );
        }

        Ok(rows)
    }

    /// Collects every row first, then writes them once.
    pub async fn run<W: Write>(
        &self,
        request: &ReportRequest,
        format: OutputFormat,
        out: &mut W,
    ) -> Result<usize> {
        let rows = self.collect(request).await?;
        write_rows(&rows, format, out)?;
        Ok(rows.len())
    }
}
