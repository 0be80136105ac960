use thiserror::Error;

/// Problems with a load test configuration, reported before any request is sent.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("URL is required")]
    MissingUrl,

    #[error("cell range is empty: cell_start {start} is greater than cell_end {end}")]
    InvalidCellRange { start: i64, end: i64 },

    #[error("duration must be a finite, non-negative number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("interval must be a finite number of seconds, got {0}")]
    InvalidInterval(f64),
}

#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl LoadTestError {
    pub fn is_config(&self) -> bool {
        matches!(self, LoadTestError::Config(_))
    }
}
