use std::{fs, io, path::Path};

use kv_bucket::BucketConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::{bulk::DEFAULT_MAX_CONCURRENCY, retry::RetryStrategy};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logger: Logger,
    pub bucket: BucketConfig,
    /// Retry strategy for mutations
    pub retry: RetryStrategy,
    pub bulk: Bulk,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Logger {
    /// One of trace, debug, info, warn, error
    pub level: String,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Bulk {
    pub max_concurrency: usize,
}

impl Default for Bulk {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let json = fs::read_to_string(path)?;
        Config::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
