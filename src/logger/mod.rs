mod error;
mod format;
mod plain;
mod session;
mod writer;

pub use error::LoggerError;
pub use plain::{IdleTransfer, PlainLogger, TransferService};
pub use writer::TrackLogger;

use std::time::Duration;

use crate::config::{Config, ConfigError, LoggerMode};
use crate::fix::Fix;

/// Logging capability, resolved once at startup from the configured mode.
/// Every entry point dispatches on the capability instead of re-reading a
/// settings value.
pub enum Logger {
    Disabled,
    Track(TrackLogger),
    Plain(PlainLogger),
}

impl Logger {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.logger.mode {
            LoggerMode::NoLogging => Ok(Logger::Disabled),
            LoggerMode::TrackLogging => Ok(Logger::Track(TrackLogger::new(
                config.logger.base_folder.clone(),
                config.logger.time_offset_hours,
                config.logger.sample_interval,
            ))),
            LoggerMode::PlainLogging => {
                let plain = config.plain.as_ref().ok_or(ConfigError::MissingPlain)?;
                Ok(Logger::Plain(PlainLogger::new(
                    plain.base_folder.clone(),
                    plain.capacity_bytes,
                    plain.transfer_user.clone(),
                    plain.transfer_password.clone(),
                    Box::new(IdleTransfer),
                )))
            }
        }
    }

    /// Open storage. In track mode a session starts right away when a valid
    /// fix is already at hand.
    pub fn setup(&mut self, fix: Option<&Fix>) {
        match self {
            Logger::Disabled => {}
            Logger::Track(track) => track.setup(fix),
            Logger::Plain(plain) => plain.setup(),
        }
    }

    /// Record one raw input line. Only the plain log keeps unstructured text.
    pub fn record_raw(&mut self, line: &str) {
        if let Logger::Plain(plain) = self {
            plain.append(line);
        }
    }

    /// One driver iteration with the current fix snapshot and monotonic
    /// uptime.
    pub fn tick(&mut self, fix: &Fix, uptime: Duration) {
        match self {
            Logger::Disabled => {}
            Logger::Track(track) => track.tick(fix, uptime),
            Logger::Plain(plain) => plain.tick(),
        }
    }

    pub fn shutdown(&mut self) {
        match self {
            Logger::Disabled => {}
            Logger::Track(track) => track.shutdown(),
            Logger::Plain(plain) => plain.shutdown(),
        }
    }
}
