//! Runtime configuration for the keyboard move client.
//!
//! Every value has a compile-time default and can be overridden through an
//! environment variable. Command-line flags take precedence over both and are
//! merged in [`ClientConfig::resolve`].

use std::path::PathBuf;
use std::time::Duration;

/// Default directory for the rolling log file.
const DEFAULT_LOG_DIR: &str = "logs";

/// Default clock: none.
const DEFAULT_CLOCK_SECS: u64 = 0;

const DEFAULT_CONFIRM_MOVES: bool = false;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a boolean, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
}

/// Get the directory log files are written to.
///
/// Priority:
/// 1. `KBMOVE_LOG_DIR` env variable if set
/// 2. `./logs` as fallback
pub fn get_log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("KBMOVE_LOG_DIR") {
        return PathBuf::from(dir);
    }

    PathBuf::from(DEFAULT_LOG_DIR)
}

/// Get the initial clock time in seconds, `0` meaning no clock.
///
/// Priority:
/// 1. `KBMOVE_CLOCK_SECS` env variable if set (falls back to the default with
///    a warning if it is not a `u64`)
/// 2. `0` as fallback
pub fn get_clock_secs() -> u64 {
    match std::env::var("KBMOVE_CLOCK_SECS") {
        Ok(value) => parse_clock_secs(&value).unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            DEFAULT_CLOCK_SECS
        }),
        Err(_) => DEFAULT_CLOCK_SECS,
    }
}

/// Whether completed moves wait for an explicit confirmation.
///
/// Priority:
/// 1. `KBMOVE_CONFIRM_MOVES` env variable if set (`1`/`true`/`yes` or
///    `0`/`false`/`no`)
/// 2. `false` as fallback
pub fn get_confirm_moves() -> bool {
    match std::env::var("KBMOVE_CONFIRM_MOVES") {
        Ok(value) => parse_bool("KBMOVE_CONFIRM_MOVES", &value).unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            DEFAULT_CONFIRM_MOVES
        }),
        Err(_) => DEFAULT_CONFIRM_MOVES,
    }
}

fn parse_clock_secs(value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            var: "KBMOVE_CLOCK_SECS",
            value: value.to_string(),
        })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

/// Settings for one client run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub fen: Option<String>,
    pub crazyhouse: bool,
    pub clock: Option<Duration>,
    pub increment: Duration,
    pub confirm_moves: bool,
    pub log_dir: PathBuf,
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub fen: Option<String>,
    pub crazyhouse: bool,
    pub clock_secs: Option<u64>,
    pub increment_secs: Option<u64>,
    pub confirm_moves: Option<bool>,
}

impl ClientConfig {
    /// Merge command-line overrides over the environment.
    pub fn resolve(cli: CliOverrides) -> Self {
        let clock_secs = cli.clock_secs.unwrap_or_else(get_clock_secs);
        Self {
            fen: cli.fen,
            crazyhouse: cli.crazyhouse,
            clock: (clock_secs > 0).then(|| Duration::from_secs(clock_secs)),
            increment: Duration::from_secs(cli.increment_secs.unwrap_or(0)),
            confirm_moves: cli.confirm_moves.unwrap_or_else(get_confirm_moves),
            log_dir: get_log_dir(),
        }
    }
}
