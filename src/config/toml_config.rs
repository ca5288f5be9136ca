use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_identifier, validate_non_empty_string, validate_positive_number, validate_url,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PROJECT_ID: &str = "test-data-engineer-090621";
pub const DEFAULT_DATASET: &str = "test_dataset";
pub const DEFAULT_API_BASE_URL: &str = "https://bigquery.googleapis.com";
pub const DEFAULT_DEPARTMENT_COLUMN: &str = "departement";
const CREDENTIALS_RELATIVE_PATH: &str = "../Credentials/gcp-bigquery-credentials.json";

/// `../Credentials/gcp-bigquery-credentials.json` next to the running executable.
pub fn default_credentials_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CREDENTIALS_RELATIVE_PATH)))
        .unwrap_or_else(|| PathBuf::from(CREDENTIALS_RELATIVE_PATH))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub bigquery: BigQuerySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BigQuerySettings {
    pub project_id: String,
    pub dataset: String,
    /// Service-account key file; ignored when `access_token` is set.
    pub credentials_path: Option<PathBuf>,
    pub access_token: Option<String>,
    pub location: Option<String>,
    pub api_base_url: String,
    /// Overrides the `token_uri` of the credentials file.
    pub token_uri: Option<String>,
    pub department_column: String,
    pub page_size: u32,
    /// How long the engine holds each request before answering `jobComplete: false`.
    pub query_timeout_ms: u64,
    /// HTTP timeout; unset means wait indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl Default for BigQuerySettings {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            credentials_path: None,
            access_token: None,
            location: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_uri: None,
            department_column: DEFAULT_DEPARTMENT_COLUMN.to_string(),
            page_size: 1000,
            query_timeout_ms: 10_000,
            timeout_seconds: None,
        }
    }
}

impl BigQuerySettings {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(default_credentials_path)
    }
}

impl Validate for BigQuerySettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("bigquery.project_id", &self.project_id)?;
        validate_identifier("bigquery.dataset", &self.dataset)?;
        validate_identifier("bigquery.department_column", &self.department_column)?;
        validate_url("bigquery.api_base_url", &self.api_base_url)?;
        if let Some(token_uri) = &self.token_uri {
            validate_url("bigquery.token_uri", token_uri)?;
        }
        if let Some(token) = &self.access_token {
            validate_non_empty_string("bigquery.access_token", token)?;
        }
        validate_positive_number("bigquery.page_size", u64::from(self.page_size), 1)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_positive_number("bigquery.timeout_seconds", timeout, 1)?;
        }
        Ok(())
    }
}

impl ReportConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ReportError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Placeholders are expanded inside string values only, after parsing, so comments
    /// and keys are never touched.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut table: toml::Table =
            toml::from_str(content).map_err(|e| ReportError::ConfigError {
                message: format!("TOML parsing error: {}", e),
            })?;

        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ReportError::ConfigError {
            message: e.to_string(),
        })?;
        for value in table.iter_mut().map(|(_, v)| v) {
            Self::substitute_env_vars(&re, value)?;
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e| ReportError::ConfigError {
                message: format!("invalid configuration: {}", e),
            })
    }

    /// Replaces `${VAR}` with the environment value, e.g. `${BIGQUERY_ACCESS_TOKEN}`.
    fn substitute_env_vars(re: &Regex, value: &mut toml::Value) -> Result<()> {
        match value {
            toml::Value::String(text) => {
                let mut missing = None;
                let replaced = re.replace_all(text.as_str(), |caps: &regex::Captures| {
                    let var_name = &caps[1];
                    std::env::var(var_name).unwrap_or_else(|_| {
                        missing.get_or_insert_with(|| var_name.to_string());
                        String::new()
                    })
                });

                if let Some(var_name) = missing {
                    return Err(ReportError::MissingConfigError {
                        field: format!("environment variable {}", var_name),
                    });
                }
                *text = replaced.into_owned();
            }
            toml::Value::Array(items) => {
                for item in items {
                    Self::substitute_env_vars(re, item)?;
                }
            }
            toml::Value::Table(table) => {
                for item in table.iter_mut().map(|(_, v)| v) {
                    Self::substitute_env_vars(re, item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> Result<()> {
        self.bigquery.validate()
    }
}
