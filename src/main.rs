use clap::Parser;
use lesson_report::utils::logger;
use lesson_report::{BigQueryLessonCountRepository, CliArgs, LessonReport, ReportError};

async fn run(args: &CliArgs) -> Result<usize, ReportError> {
    // dates are checked before any configuration or connection is touched
    let request = args.report_request()?;
    let config = args.report_config()?;

    tracing::info!(
        "Querying project {} dataset {}",
        config.bigquery.project_id,
        config.bigquery.dataset
    );
    let repository = BigQueryLessonCountRepository::from_settings(config.bigquery)?;
    let report = LessonReport::new(repository);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report.run(&request, args.format, &mut out).await
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting lesson-report");
    tracing::debug!("CLI arguments: {:?}", args);

    match run(&args).await {
        Ok(rows) => {
            tracing::info!("✅ Report completed with {} rows", rows);
        }
        Err(e) => {
            tracing::error!("❌ Report failed: {}", e);
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }
}
