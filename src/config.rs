use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use strum_macros::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("plain_logging mode needs a 'plain' section")]
    MissingPlain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LoggerMode {
    #[default]
    NoLogging,
    TrackLogging,
    PlainLogging,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub logger: LoggerConfig,
    #[serde(default)]
    pub plain: Option<PlainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    #[serde(default)]
    pub mode: LoggerMode,
    /// Fixed offset applied to the fix hour in file names and timestamps.
    #[serde(default)]
    pub time_offset_hours: i32,
    /// Minimum time between two accepted samples, e.g. "1s" or "1500ms".
    #[serde(
        default = "default_sample_interval",
        deserialize_with = "deserialize_interval"
    )]
    pub sample_interval: Duration,
    pub base_folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlainConfig {
    pub base_folder: PathBuf,
    /// Declared size of the flat volume; free space in the restart banner is
    /// computed against it.
    #[serde(default)]
    pub capacity_bytes: u64,
    #[serde(default = "default_transfer_credential")]
    pub transfer_user: String,
    #[serde(default = "default_transfer_credential")]
    pub transfer_password: String,
}

fn default_sample_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_transfer_credential() -> String {
    "logger".to_string()
}

fn deserialize_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
