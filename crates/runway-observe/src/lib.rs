//! Process-wide logging setup for the runway daemon.
mod config;
pub use config::LoggerConfig;

mod error;
pub use error::{LoggerError, LoggerResult};

mod format;
pub use format::LoggerFormat;

mod level;
pub use level::LoggerLevel;

mod timer;
pub use timer::UtcRfc3339;

mod init;

#[cfg(feature = "subscriber")]
mod subscriber;
#[cfg(feature = "subscriber")]
pub use subscriber::TaskEventLogger;

/// Install the global tracing subscriber described by `cfg`.
///
/// When `RUST_LOG` is set it takes precedence over `cfg.level`.
/// Fails if a global subscriber is already installed.
///
/// # Examples
/// ```rust
/// use runway_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("logger");
/// tracing::info!("logger ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => init::text(cfg),
        LoggerFormat::Json => init::json(cfg),
        LoggerFormat::Journald => init::journald(cfg),
    }
}
