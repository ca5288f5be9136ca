use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Query engine rejected the request ({status}): {message}")]
    QueryEngineError { status: u16, message: String },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Credential signing failed: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid date format detected => {field}='{value}': {reason}")]
    InvalidDateError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required setting: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl ReportError {
    /// Input and configuration problems are reported before any query runs.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ReportError::InvalidDateError { .. }
                | ReportError::ConfigError { .. }
                | ReportError::InvalidConfigValueError { .. }
                | ReportError::MissingConfigError { .. }
                | ReportError::ValidationError { .. }
        )
    }

    /// 1 for bad input or configuration, 3 for failures while talking to the engine.
    pub fn exit_code(&self) -> i32 {
        if self.is_input_error() {
            1
        } else {
            3
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReportError::InvalidDateError { field, value, .. } => {
                format!("'{}' is not a valid date for --{}", value, field)
            }
            ReportError::QueryEngineError { status, message } => {
                format!("BigQuery returned an error (HTTP {}): {}", status, message)
            }
            ReportError::AuthError { .. } | ReportError::JwtError(_) => {
                "Could not authenticate against BigQuery".to_string()
            }
            ReportError::ApiError(e) if e.is_timeout() => {
                "The request to BigQuery timed out".to_string()
            }
            ReportError::ApiError(e) if e.is_connect() => {
                "Could not connect to BigQuery".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ReportError::InvalidDateError { .. } => "Use the YYYY-MM-DD format, e.g. 2020-02-01",
            ReportError::ValidationError { .. } => "Check the command-line arguments",
            ReportError::ConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => "Check the configuration file and flags",
            ReportError::AuthError { .. } | ReportError::JwtError(_) => {
                "Check the service-account credentials file or the access token"
            }
            ReportError::QueryEngineError { .. } => {
                "Check the project, dataset and table names and your BigQuery permissions"
            }
            ReportError::ApiError(_) => "Check network connectivity to the BigQuery API",
            ReportError::IoError(_) => "Check that the files exist and are readable",
            ReportError::SerializationError(_) | ReportError::CsvError(_) => {
                "The engine returned data in an unexpected shape"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let date = ReportError::InvalidDateError {
            field: "date_debut".to_string(),
            value: "2020/02/01".to_string(),
            reason: "input contains invalid characters".to_string(),
        };
        assert_eq!(date.exit_code(), 1);

        let engine = ReportError::QueryEngineError {
            status: 403,
            message: "Access Denied".to_string(),
        };
        assert_eq!(engine.exit_code(), 3);
    }

    #[test]
    fn test_invalid_date_message_names_input() {
        let err = ReportError::InvalidDateError {
            field: "date_fin".to_string(),
            value: "01-09-2020".to_string(),
            reason: "premature end of input".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("Invalid date format detected"));
        assert!(message.contains("date_fin"));
        assert!(message.contains("01-09-2020"));
    }
}
