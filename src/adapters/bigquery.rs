use crate::adapters::auth::{ServiceAccountTokenSource, StaticTokenSource};
use crate::config::BigQuerySettings;
use crate::domain::model::{DateRange, LessonCount};
use crate::domain::ports::{LessonCountRepository, LessonCountStream, TokenSource};
use crate::utils::error::{ReportError, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::{Client, Response};
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Builds the aggregate query. Filter values are bound as `@partnership_type`, `@date_start`
/// and `@date_end`; only the validated dataset and column names are spliced in.
pub fn lesson_count_query(dataset: &str, department_column: &str) -> String {
    format!(
        r#"WITH delivered_lessons AS (
    SELECT lessons.*
    FROM `{dataset}.lessons` AS lessons
    -- inner join: a lesson without booking never took place
    INNER JOIN `{dataset}.bookings` AS bookings
        USING (lesson_id)
    WHERE
        -- a lesson deleted after it started still counts
        (
            lessons.lesson_deleted_at IS NULL
            OR lessons.lesson_start_at < lessons.lesson_deleted_at
        )
        AND (
            bookings.booking_deleted_at IS NULL
            OR bookings.booking_deleted_at > lessons.lesson_start_at
        )
        AND bookings.booking_created_at <= lessons.lesson_start_at
),

lessons_by_department AS (
    SELECT
        instructors.partnership_type,
        meeting_points.{department_column} AS department,
        COUNT(*) AS number_of_lessons
    FROM delivered_lessons
    LEFT JOIN `{dataset}.meeting_points` AS meeting_points
        USING (meeting_point_id)
    LEFT JOIN `{dataset}.instructors` AS instructors
        USING (instructor_id)
    WHERE DATE(delivered_lessons.lesson_start_at) BETWEEN @date_start AND @date_end
        AND instructors.partnership_type = @partnership_type
    GROUP BY partnership_type, department
)

SELECT partnership_type, department, number_of_lessons
FROM lessons_by_department
ORDER BY partnership_type, department"#
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    query: String,
    use_legacy_sql: bool,
    parameter_mode: &'static str,
    query_parameters: Vec<QueryParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    max_results: u32,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryParameter {
    name: &'static str,
    parameter_type: ParameterType,
    parameter_value: ParameterValue,
}

impl QueryParameter {
    fn new(name: &'static str, kind: &'static str, value: String) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind },
            parameter_value: ParameterValue { value },
        }
    }
}

#[derive(Debug, Serialize)]
struct ParameterType {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ParameterValue {
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

/// Shared shape of `jobs.query` and `jobs.getQueryResults` responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    total_rows: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

enum PageCursor {
    Submit,
    Page { job: JobReference, token: String },
    Done,
}

fn decode_cell(field: &TableFieldSchema, value: Value) -> Result<Value> {
    let raw = match value {
        Value::String(raw) => raw,
        other => return Ok(other),
    };

    match field.field_type.as_str() {
        "INTEGER" | "INT64" => raw.parse::<i64>().map(Value::from).map_err(|e| {
            ReportError::SerializationError(serde_json::Error::custom(format!(
                "column {}: '{}' is not an integer ({})",
                field.name, raw, e
            )))
        }),
        "FLOAT" | "FLOAT64" => Ok(raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::String(raw))),
        "BOOLEAN" | "BOOL" => match raw.as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ReportError::SerializationError(serde_json::Error::custom(
                format!("column {}: '{}' is not a boolean", field.name, raw),
            ))),
        },
        _ => Ok(Value::String(raw)),
    }
}

/// Turns an `{"f":[{"v":..}]}` row into a column-name mapping using the result schema.
pub fn decode_row(schema: &TableSchema, row: TableRow) -> Result<Map<String, Value>> {
    if row.f.len() != schema.fields.len() {
        return Err(ReportError::SerializationError(serde_json::Error::custom(
            format!(
                "row has {} cells but the schema has {} fields",
                row.f.len(),
                schema.fields.len()
            ),
        )));
    }

    schema
        .fields
        .iter()
        .zip(row.f)
        .map(|(field, cell)| Ok((field.name.clone(), decode_cell(field, cell.v)?)))
        .collect()
}

pub struct BigQueryLessonCountRepository {
    client: Client,
    token_source: Box<dyn TokenSource>,
    settings: BigQuerySettings,
    query: String,
}

impl BigQueryLessonCountRepository {
    pub fn new(client: Client, token_source: Box<dyn TokenSource>, settings: BigQuerySettings) -> Self {
        let query = lesson_count_query(&settings.dataset, &settings.department_column);
        Self {
            client,
            token_source,
            settings,
            query,
        }
    }

    /// Builds the HTTP client and picks the token source: the configured access token if
    /// any, otherwise the service-account key file.
    pub fn from_settings(settings: BigQuerySettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = settings.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(seconds));
        }
        let client = builder.build()?;

        let token_source: Box<dyn TokenSource> = match &settings.access_token {
            Some(token) => {
                tracing::debug!("Using the configured access token");
                Box::new(StaticTokenSource::new(token.clone()))
            }
            None => {
                let path = settings.credentials_path();
                tracing::debug!("Loading service-account credentials from {}", path.display());
                let source = ServiceAccountTokenSource::from_file(&path, client.clone())?;
                let source = match &settings.token_uri {
                    Some(uri) => source.with_token_uri(uri.clone()),
                    None => source,
                };
                tracing::info!("Authenticating as {}", source.client_email());
                Box::new(source)
            }
        };

        Ok(Self::new(client, token_source, settings))
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn api_root(&self) -> &str {
        self.settings.api_base_url.trim_end_matches('/')
    }

    async fn submit(&self, partnership_type: &str, period: DateRange) -> Result<QueryResponse> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries",
            self.api_root(),
            self.settings.project_id
        );
        let body = QueryRequest {
            query: self.query.clone(),
            use_legacy_sql: false,
            parameter_mode: "NAMED",
            query_parameters: vec![
                QueryParameter::new("partnership_type", "STRING", partnership_type.to_string()),
                QueryParameter::new("date_start", "DATE", period.start.to_string()),
                QueryParameter::new("date_end", "DATE", period.end.to_string()),
            ],
            location: self.settings.location.as_deref(),
            max_results: self.settings.page_size,
            timeout_ms: self.settings.query_timeout_ms,
        };

        tracing::info!(
            "Submitting lesson count query for partnership type {} ({} to {})",
            partnership_type,
            period.start,
            period.end
        );
        let token = self.token_source.access_token().await?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn query_results(&self, job: &JobReference, page_token: Option<&str>) -> Result<QueryResponse> {
        let url = format!(
            "{}/bigquery/v2/projects/{}/queries/{}",
            self.api_root(),
            job.project_id,
            job.job_id
        );

        let mut params = vec![
            ("timeoutMs", self.settings.query_timeout_ms.to_string()),
            ("maxResults", self.settings.page_size.to_string()),
        ];
        if let Some(location) = job.location.as_ref().or(self.settings.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        tracing::debug!("Fetching results of job {} (page token: {:?})", job.job_id, page_token);
        let token = self.token_source.access_token().await?;
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn read_response(response: Response) -> Result<QueryResponse> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());

        Err(ReportError::QueryEngineError {
            status: status.as_u16(),
            message,
        })
    }

    async fn wait_for_completion(&self, mut response: QueryResponse) -> Result<QueryResponse> {
        while !response.job_complete {
            let job = response
                .job_reference
                .clone()
                .ok_or_else(|| ReportError::QueryEngineError {
                    status: 200,
                    message: "incomplete query response without job reference".to_string(),
                })?;
            tracing::debug!("Job {} still running, waiting for completion", job.job_id);
            response = self.query_results(&job, None).await?;
        }
        Ok(response)
    }

    async fn next_page(
        &self,
        cursor: PageCursor,
        partnership_type: &str,
        period: DateRange,
    ) -> Result<Option<(Vec<LessonCount>, PageCursor)>> {
        let response = match cursor {
            PageCursor::Done => return Ok(None),
            PageCursor::Submit => {
                let submitted = self.submit(partnership_type, period).await?;
                self.wait_for_completion(submitted).await?
            }
            PageCursor::Page { job, token } => {
                let page = self.query_results(&job, Some(token.as_str())).await?;
                self.wait_for_completion(page).await?
            }
        };

        if let Some(total) = response.total_rows.as_deref() {
            tracing::debug!("Query for {} returned {} rows in total", partnership_type, total);
        }

        let schema = response.schema.unwrap_or_default();
        let rows = response
            .rows
            .into_iter()
            .map(|row| {
                let mapping = decode_row(&schema, row)?;
                Ok(serde_json::from_value(Value::Object(mapping))?)
            })
            .collect::<Result<Vec<LessonCount>>>()?;

        let next = match (response.page_token, response.job_reference) {
            (Some(token), Some(job)) => PageCursor::Page { job, token },
            _ => PageCursor::Done,
        };

        Ok(Some((rows, next)))
    }
}

impl LessonCountRepository for BigQueryLessonCountRepository {
    fn compute_lesson_counts<'a>(
        &'a self,
        partnership_type: &'a str,
        period: DateRange,
    ) -> LessonCountStream<'a> {
        stream::try_unfold(PageCursor::Submit, move |cursor| async move {
            self.next_page(cursor, partnership_type, period).await
        })
        .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<_, ReportError>)))
        .try_flatten()
        .boxed()
    }
}
