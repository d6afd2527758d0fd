//! Cohort CLI - Command-line interface for the cohort engine
//!
//! Commands:
//! - report: Compute the full analytics report from an event file
//! - validate: Validate event records
//! - config: Print the default configuration
//! - doctor: Diagnose installation and configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use cohort_engine::encoder::to_json;
use cohort_engine::schema::{EventAdapter, EventRecord};
use cohort_engine::{MetricsConfig, MetricsEngine, ENGINE_VERSION, PRODUCER_NAME};

/// Cohort - weekly retention, growth, churn and lifecycle analytics
#[derive(Parser)]
#[command(name = "cohort")]
#[command(author = "Synheart")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute cohort analytics from user activity events", long_about = None)]
struct Cli {
    /// Log every metric family as it is computed
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the analytics report
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Metrics configuration file (JSON); defaults apply to missing fields
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate event records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default metrics configuration as JSON
    Config,

    /// Diagnose installation and configuration
    Doctor {
        /// Check a metrics configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// CSV with a header row containing user_id and created_at
    Csv,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so report output on stdout stays parseable
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "cohort_engine=debug,cohort=debug"
    } else {
        "cohort_engine=info,cohort=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CohortCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_report(&input, &output, input_format, output_format, config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Config => cmd_config(),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_report(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), CohortCliError> {
    let config = match config {
        Some(path) => MetricsConfig::from_json(&fs::read_to_string(path)?)?,
        None => MetricsConfig::default(),
    };
    let engine = MetricsEngine::new(config)?;

    let records = read_records(input, &input_format)?;
    let pretty = matches!(output_format, OutputFormat::JsonPretty);
    let output_data = render_report(&engine, &records, pretty)?;

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
        info!(path = %output.display(), "wrote report");
    }

    Ok(())
}

/// Empty input still yields a report with empty tables
fn render_report(
    engine: &MetricsEngine,
    records: &[EventRecord],
    pretty: bool,
) -> Result<String, CohortCliError> {
    if records.is_empty() {
        warn!("input contained no events");
    }
    debug!(records = records.len(), "parsed input");

    let table = EventAdapter::to_table(records)?;
    Ok(to_json(&engine.report(&table), pretty)?)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), CohortCliError> {
    let records = read_records(input, &input_format)?;
    let results = EventAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - results.len(),
        invalid_records: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                user_id: r.user_id.clone(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - User {} (index {}): {}",
                    err.user_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CohortCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_config() -> Result<(), CohortCliError> {
    println!("{}", MetricsConfig::default().to_json()?);
    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CohortCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, ENGINE_VERSION),
    });

    let defaults = MetricsConfig::default();
    checks.push(match defaults.validate() {
        Ok(()) => DoctorCheck {
            name: "default_config".to_string(),
            status: CheckStatus::Ok,
            message: format!("Default baseline {}", defaults.baseline.to_rfc3339()),
        },
        Err(e) => DoctorCheck {
            name: "default_config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    if let Some(config_path) = config {
        checks.push(check_config_file(config_path));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Cohort Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CohortCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        };
    }

    match fs::read_to_string(path) {
        Ok(content) => match MetricsConfig::from_json(&content) {
            Ok(config) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (window {}, matrix {}x{}, gaps {:?})",
                    config.stickiness_window,
                    config.retention_rows,
                    config.retention_columns,
                    config.gap_policy
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read config file: {}", e),
        },
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, CohortCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records(input: &Path, format: &InputFormat) -> Result<Vec<EventRecord>, CohortCliError> {
    let input_data = read_input(input)?;
    match format {
        InputFormat::Ndjson => Ok(EventAdapter::parse_ndjson(&input_data)?),
        InputFormat::Json => Ok(EventAdapter::parse_array(&input_data)?),
        InputFormat::Csv => parse_csv(&input_data),
    }
}

fn parse_csv(input: &str) -> Result<Vec<EventRecord>, CohortCliError> {
    let mut reader = csv::Reader::from_reader(input.as_bytes());
    let mut records = Vec::new();
    for result in reader.deserialize::<EventRecord>() {
        records.push(result?);
    }
    Ok(records)
}

// Error types

#[derive(Debug)]
enum CohortCliError {
    Io(io::Error),
    Compute(cohort_engine::ComputeError),
    Json(serde_json::Error),
    Csv(csv::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CohortCliError {
    fn from(e: io::Error) -> Self {
        CohortCliError::Io(e)
    }
}

impl From<cohort_engine::ComputeError> for CohortCliError {
    fn from(e: cohort_engine::ComputeError) -> Self {
        CohortCliError::Compute(e)
    }
}

impl From<serde_json::Error> for CohortCliError {
    fn from(e: serde_json::Error) -> Self {
        CohortCliError::Json(e)
    }
}

impl From<csv::Error> for CohortCliError {
    fn from(e: csv::Error) -> Self {
        CohortCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CohortCliError> for CliError {
    fn from(e: CohortCliError) -> Self {
        match e {
            CohortCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CohortCliError::Compute(cohort_engine::ComputeError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'cohort config' for a valid starting point".to_string()),
            },
            CohortCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure every record has user_id and created_at".to_string()),
            },
            CohortCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CohortCliError::Csv(e) => CliError {
                code: "CSV_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the header row names user_id and created_at".to_string()),
            },
            CohortCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CohortCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    user_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MetricsEngine {
        MetricsEngine::new(MetricsConfig::default()).unwrap()
    }

    #[test]
    fn test_header_only_csv_renders_empty_report() {
        let records = parse_csv("user_id,created_at\n").unwrap();
        assert!(records.is_empty());

        let json = render_report(&engine(), &records, false).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["key_metrics"]["total_users"], 0);
        assert!(report["weekly_stats"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_csv_records_render_report() {
        let records =
            parse_csv("user_id,created_at\na,2020-01-01T00:00:00Z\nb,2020-01-08T00:00:00Z\n")
                .unwrap();
        let json = render_report(&engine(), &records, true).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(report["key_metrics"]["total_users"], 2);
        assert_eq!(report["weekly_stats"].as_array().unwrap().len(), 2);
    }
}
