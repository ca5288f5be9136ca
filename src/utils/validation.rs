use crate::utils::error::{ReportError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Parses a `YYYY-MM-DD` date; `field` is the CLI option name used in the error.
/// The value is taken as given: chrono skips whitespace before numeric fields, so the
/// overall shape is checked first.
pub fn parse_date(field_name: &str, value: &str) -> Result<NaiveDate> {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_SHAPE
        .get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$").expect("date pattern is valid"));

    let invalid = |reason: String| ReportError::InvalidDateError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason,
    };

    if !re.is_match(value) {
        return Err(invalid("does not match format YYYY-MM-DD".to_string()));
    }

    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| invalid(e.to_string()))
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ReportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// Names spliced into SQL (dataset, column) must be bare identifiers.
pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    let re = IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    });

    if !re.is_match(value) {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Only letters, digits and underscores are allowed".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("date_debut", "2020-02-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());

        let err = parse_date("date_debut", "2020/02/01").unwrap_err();
        assert!(matches!(err, ReportError::InvalidDateError { ref field, .. } if field == "date_debut"));

        assert!(parse_date("date_fin", "2020-13-01").is_err());
        assert!(parse_date("date_fin", "").is_err());
        assert!(parse_date("date_fin", "yesterday").is_err());
    }

    #[test]
    fn test_parse_date_rejects_surrounding_whitespace() {
        assert!(parse_date("date_debut", " 2020-02-01").is_err());
        assert!(parse_date("date_debut", "\t2020-02-01").is_err());
        assert!(parse_date("date_fin", "2020-09-01\n").is_err());
        assert!(parse_date("date_fin", "2020-09-01 ").is_err());
        assert!(parse_date("date_fin", "2020-09- 01").is_err());
        assert!(parse_date("date_fin", "+2020-09-01").is_err());
    }

    #[test]
    fn test_parse_date_accepts_unpadded_fields() {
        let date = parse_date("date_debut", "2020-2-1").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 2, 1).unwrap());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("api_base_url", "https://bigquery.googleapis.com").is_ok());
        assert!(validate_url("api_base_url", "http://127.0.0.1:9050").is_ok());
        assert!(validate_url("api_base_url", "").is_err());
        assert!(validate_url("api_base_url", "invalid-url").is_err());
        assert!(validate_url("api_base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("dataset", "test_dataset").is_ok());
        assert!(validate_identifier("department_column", "departement").is_ok());
        assert!(validate_identifier("dataset", "test-dataset").is_err());
        assert!(validate_identifier("dataset", "x`; DROP TABLE lessons; --").is_err());
        assert!(validate_identifier("dataset", "").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("page_size", 1000, 1).is_ok());
        assert!(validate_positive_number("page_size", 0, 1).is_err());
    }
}
