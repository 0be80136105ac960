use crate::cell::random_cell;
use crate::error::{ConfigError, LoadTestError};
use crate::post_cell;
use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

fn default_duration() -> f64 {
    10.0
}

fn default_interval() -> f64 {
    0.1
}

fn default_cell_end() -> i64 {
    10_000
}

/// Parameters of one load test run.
///
/// Field names match the JSON event documents accepted by [`LoadTestConfig::from_file`];
/// everything except `url` has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTestConfig {
    #[serde(default)]
    pub url: String,
    /// Length of the run in seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,
    /// Pause between requests in seconds; zero or negative disables the pause.
    #[serde(default = "default_interval")]
    pub interval: f64,
    #[serde(default)]
    pub cell_start: i64,
    #[serde(default = "default_cell_end")]
    pub cell_end: i64,
    /// Seed for reproducible payloads.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        LoadTestConfig {
            url: String::new(),
            duration: default_duration(),
            interval: default_interval(),
            cell_start: 0,
            cell_end: default_cell_end(),
            seed: None,
        }
    }
}

impl LoadTestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        LoadTestConfig {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a JSON event file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: LoadTestConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if self.cell_start > self.cell_end {
            return Err(ConfigError::InvalidCellRange {
                start: self.cell_start,
                end: self.cell_end,
            });
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(ConfigError::InvalidDuration(self.duration));
        }
        if !self.interval.is_finite() {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        Ok(())
    }

    fn run_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.duration).unwrap_or(Duration::MAX)
    }

    fn pause(&self) -> Option<Duration> {
        if self.interval > 0.0 {
            Some(Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::MAX))
        } else {
            None
        }
    }
}

/// What happened to a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestOutcome {
    Response { status_code: u16, body: String },
    Error { error: String },
}

impl RequestOutcome {
    fn from_error(err: &reqwest::Error) -> Self {
        RequestOutcome::Error {
            error: describe_error(err),
        }
    }

    /// Anything other than a completed exchange with status 200 counts as a failure.
    pub fn is_failure(&self) -> bool {
        match self {
            RequestOutcome::Response { status_code, .. } => *status_code != 200,
            RequestOutcome::Error { .. } => true,
        }
    }
}

// reqwest's top level message rarely names the cause, so walk the chain
fn describe_error(err: &reqwest::Error) -> String {
    let mut description = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        description.push_str(": ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }
    description
}

/// Aggregate result of a run, outcomes kept in send order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub requests_made: usize,
    pub responses: Vec<RequestOutcome>,
}

impl RunReport {
    pub fn from_outcomes(responses: Vec<RequestOutcome>) -> Self {
        RunReport {
            requests_made: responses.len(),
            responses,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.responses.iter().filter(|outcome| outcome.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Run a load test, seeding the generator from `config.seed` when present.
pub async fn run(config: &LoadTestConfig) -> Result<RunReport, LoadTestError> {
    config.validate()?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    run_with_rng(config, &mut rng).await
}

/// Run a load test drawing payloads from `rng`.
///
/// One HTTP client is built for the run and dropped when it returns, so all
/// requests share its connection pool.
pub async fn run_with_rng<R: Rng>(
    config: &LoadTestConfig,
    rng: &mut R,
) -> Result<RunReport, LoadTestError> {
    config.validate()?;
    let client = Client::builder().build()?;
    let report = run_with_client(&client, config, rng).await?;
    Ok(report)
}

/// Run a load test over an existing client.
///
/// Requests go out strictly one at a time. The loop stops once the
/// configured duration has elapsed on the monotonic clock; a request already
/// in flight is allowed to finish.
pub async fn run_with_client<R: Rng>(
    client: &Client,
    config: &LoadTestConfig,
    rng: &mut R,
) -> Result<RunReport, ConfigError> {
    config.validate()?;

    let duration = config.run_duration();
    let pause = config.pause();
    let ids = config.cell_start..=config.cell_end;

    info!(
        url = %config.url,
        duration = config.duration,
        interval = config.interval,
        cell_start = config.cell_start,
        cell_end = config.cell_end,
        "Starting load test"
    );

    let start = Instant::now();
    let mut responses = Vec::new();

    while start.elapsed() < duration {
        let cell = random_cell(rng, ids.clone());

        let outcome = match post_cell(client, &config.url, &cell).await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                match response.text().await {
                    Ok(body) => RequestOutcome::Response { status_code, body },
                    Err(e) => RequestOutcome::from_error(&e),
                }
            }
            Err(e) => RequestOutcome::from_error(&e),
        };

        match &outcome {
            RequestOutcome::Response { status_code, .. } => {
                debug!(id = cell.id, status = status_code, "Cell sent")
            }
            RequestOutcome::Error { error } => warn!(id = cell.id, %error, "Request failed"),
        }
        responses.push(outcome);

        if let Some(pause) = pause {
            tokio::time::sleep(pause).await;
        }
    }

    let report = RunReport::from_outcomes(responses);
    info!(
        requests = report.requests_made,
        failures = report.failure_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Load test finished"
    );
    Ok(report)
}
