use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use xls_loadtest_lib::load_generator_lib::{self, LoadTestConfig, RequestOutcome};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Spreadsheet endpoint to POST cells to
    #[arg(long, env("LOADTEST_URL"), default_value = "http://localhost:3000/api/spreadsheet")]
    url: String,

    /// Length of the test in seconds
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Seconds to wait between requests (0 sends back to back)
    #[arg(long, default_value_t = 0.0)]
    interval: f64,

    /// First cell id to write to
    #[arg(long, default_value_t = 0)]
    cell_start: i64,

    /// Last cell id to write to (inclusive)
    #[arg(long, default_value_t = 10_000)]
    cell_end: i64,

    /// Seed for reproducible payloads
    #[arg(long)]
    seed: Option<u64>,

    /// JSON event file with the test parameters; replaces the flags above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the full report as JSON to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> Result<LoadTestConfig> {
        if let Some(path) = &self.config {
            return LoadTestConfig::from_file(path);
        }
        Ok(LoadTestConfig {
            url: self.url.clone(),
            duration: self.duration,
            interval: self.interval,
            cell_start: self.cell_start,
            cell_end: self.cell_end,
            seed: self.seed,
        })
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file if present
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    let report = load_generator_lib::run(&config).await?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    for outcome in report.failures() {
        match outcome {
            RequestOutcome::Error { error } => println!("{}", error),
            RequestOutcome::Response { status_code, body } => {
                println!("Status code: {}", status_code);
                println!("{}", body);
            }
        }
    }

    println!("Total requests made: {}", report.requests_made);
    if report.has_failures() {
        println!("Failed requests: {}", report.failure_count());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
