//! Processor configuration
//!
//! Values come from the environment (optionally via a `.env` file) and can be
//! overridden programmatically with the `with_*` methods.

use seg_common::{Result, SegError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Processor Configuration Constants
// ============================================================================

/// Environment variable holding the input file path.
pub const DATA_FILE_PATH_ENV: &str = "DATAFILEPATH";

/// Dispatch queue capacity as a multiple of the worker count.
pub const DEFAULT_QUEUE_FACTOR: usize = 4;

/// Seconds between progress lines.
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 2;

/// Worker count used when the host cannot report its parallelism.
pub const FALLBACK_WORKERS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Delimited input file; the first row is a header
    pub data_file_path: Option<PathBuf>,
    pub workers: usize,
    pub queue_factor: usize,
    pub progress_interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            data_file_path: None,
            workers: default_workers(),
            queue_factor: DEFAULT_QUEUE_FACTOR,
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
        }
    }
}

/// Host parallelism, the default worker count
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_WORKERS)
}

impl ProcessorConfig {
    /// Load configuration from environment variables
    ///
    /// - `DATAFILEPATH`: input file
    /// - `PROCESSOR_WORKERS`: worker count (default: available parallelism)
    /// - `PROCESSOR_QUEUE_FACTOR`: queue capacity per worker (default: 4)
    /// - `PROCESSOR_PROGRESS_INTERVAL_SECS`: progress period (default: 2)
    ///
    /// Unset variables keep their defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(path) = std::env::var(DATA_FILE_PATH_ENV) {
            if !path.trim().is_empty() {
                config.data_file_path = Some(PathBuf::from(path));
            }
        }

        if let Some(workers) = parse_env::<usize>("PROCESSOR_WORKERS")? {
            config.workers = workers;
        }

        if let Some(factor) = parse_env::<usize>("PROCESSOR_QUEUE_FACTOR")? {
            config.queue_factor = factor;
        }

        if let Some(secs) = parse_env::<u64>("PROCESSOR_PROGRESS_INTERVAL_SECS")? {
            config.progress_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file_path = Some(path.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_factor(mut self, factor: usize) -> Self {
        self.queue_factor = factor;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Capacity of the dispatch queue between the reader and the workers
    pub fn queue_capacity(&self) -> usize {
        self.workers.saturating_mul(self.queue_factor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_file_path.is_none() {
            return Err(SegError::Config(format!(
                "no input file configured (set {DATA_FILE_PATH_ENV})"
            )));
        }

        if self.workers == 0 {
            return Err(SegError::Config("workers must be at least 1".to_string()));
        }

        if self.queue_factor == 0 {
            return Err(SegError::Config("queue factor must be at least 1".to_string()));
        }

        if self.progress_interval.is_zero() {
            return Err(SegError::Config(
                "progress interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SegError::invalid_env(name, &raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert!(config.workers >= 1);
        assert_eq!(config.queue_factor, 4);
        assert_eq!(config.progress_interval, Duration::from_secs(2));
        assert_eq!(config.queue_capacity(), config.workers * 4);
    }

    #[test]
    fn test_validate_requires_input_path() {
        let config = ProcessorConfig::default();
        assert!(matches!(config.validate(), Err(SegError::Config(_))));

        let config = config.with_data_file("data.csv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let base = ProcessorConfig::default().with_data_file("data.csv");

        assert!(base.clone().with_workers(0).validate().is_err());
        assert!(base.clone().with_queue_factor(0).validate().is_err());
        assert!(base
            .with_progress_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_queue_capacity_scales_with_workers() {
        let config = ProcessorConfig::default()
            .with_workers(3)
            .with_queue_factor(5);
        assert_eq!(config.queue_capacity(), 15);
    }
}
