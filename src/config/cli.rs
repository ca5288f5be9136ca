use crate::config::ReportConfig;
use crate::core::output::OutputFormat;
use crate::core::report::ReportRequest;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "lesson-report")]
#[command(about = "Count lessons per department for one or more partnership types")]
pub struct CliArgs {
    #[arg(
        short = 'p',
        long = "partnership_type",
        value_name = "PARTNERSHIP_TYPE",
        required = true,
        help = "Partnership type to report on (repeatable)"
    )]
    pub partnership_types: Vec<String>,

    #[arg(
        short = 'd',
        long = "date_debut",
        value_name = "YYYY-MM-DD",
        help = "First day of the period, inclusive"
    )]
    pub date_debut: String,

    #[arg(
        short = 'f',
        long = "date_fin",
        value_name = "YYYY-MM-DD",
        help = "Last day of the period, inclusive"
    )]
    pub date_fin: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "BigQuery project id, overrides the configuration")]
    pub project: Option<String>,

    #[arg(long, help = "Service-account key file, overrides the configuration")]
    pub credentials: Option<PathBuf>,

    #[arg(short = 'v', long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliArgs {
    /// Dates and partnership types, validated before anything touches a repository.
    pub fn report_request(&self) -> Result<ReportRequest> {
        ReportRequest::new(&self.partnership_types, &self.date_debut, &self.date_fin)
    }

    /// Built-in defaults, then the `--config` file, then the flags.
    pub fn report_config(&self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                ReportConfig::from_file(path)?
            }
            None => ReportConfig::default(),
        };

        if let Some(project) = &self.project {
            config.bigquery.project_id = project.clone();
        }
        if let Some(credentials) = &self.credentials {
            config.bigquery.credentials_path = Some(credentials.clone());
        }

        config.validate()?;
        Ok(config)
    }
}
