//! Application configuration management
//!
//! This module handles loading and validating configuration from environment
//! variables. All configuration is loaded at startup and validated before
//! anything talks to the network.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_CAP_MS, DEFAULT_BACKUP_DIR, DEFAULT_BIWEEKLY_CRON,
    DEFAULT_BIWEEKLY_PROBE_START, DEFAULT_CONTEST_API_BASE, DEFAULT_EVIDENCE_MIRRORS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LEDGER_PATH, DEFAULT_MAX_ATTEMPTS, DEFAULT_PACING_MS,
    DEFAULT_PROBE_LOOKBACK, DEFAULT_SHEETS_API_BASE, DEFAULT_STATS_CRON, DEFAULT_WEEKLY_CRON,
    DEFAULT_WEEKLY_PROBE_START,
};
use crate::retry::RetryPolicy;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub sheet: SheetConfig,
    pub upstream: UpstreamConfig,
    pub scoring: ScoringConfig,
    pub detection: DetectionConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub rust_log: String,
}

/// Roster/result spreadsheet configuration
#[derive(Debug, Clone)]
pub struct SheetConfig {
    pub api_base: String,
    pub sheet_id: String,
    pub tab: String,
    /// Ready-to-use bearer token; acquiring it is outside this system
    pub token: String,
}

/// Contest metadata and evidence endpoints
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub contest_api_base: String,
    pub evidence_mirrors: Vec<String>,
    pub http_timeout: Duration,
}

/// Retry and pacing budget for batch scoring
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub pacing: Duration,
}

impl ScoringConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.backoff_base, self.backoff_cap)
    }
}

/// Contest-number probe bounds for auto-detection
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub weekly_probe_start: u32,
    pub biweekly_probe_start: u32,
    pub probe_lookback: u32,
}

/// Cron expressions for the trigger layer (UTC)
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub weekly_cron: String,
    pub biweekly_cron: String,
    pub stats_cron: String,
}

/// Durable storage locations
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub ledger_path: PathBuf,
    /// `None` disables per-contest result backups
    pub backup_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            sheet: SheetConfig::from_env()?,
            upstream: UpstreamConfig::from_env()?,
            scoring: ScoringConfig::from_env()?,
            detection: DetectionConfig::from_env()?,
            schedule: ScheduleConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl SheetConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: env::var("SHEETS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SHEETS_API_BASE.to_string()),
            sheet_id: required("SHEET_ID")?,
            tab: required("SHEET_TAB")?,
            token: required("SHEETS_TOKEN")?,
        })
    }
}

impl UpstreamConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mirrors = match env::var("EVIDENCE_MIRRORS") {
            Ok(raw) => {
                let mirrors: Vec<String> = raw
                    .split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect();
                if mirrors.is_empty() {
                    return Err(ConfigError::InvalidValue("EVIDENCE_MIRRORS".to_string()));
                }
                mirrors
            }
            Err(_) => DEFAULT_EVIDENCE_MIRRORS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        };

        Ok(Self {
            contest_api_base: env::var("CONTEST_API_BASE")
                .unwrap_or_else(|_| DEFAULT_CONTEST_API_BASE.to_string()),
            evidence_mirrors: mirrors,
            http_timeout: Duration::from_secs(parsed(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = parsed("MAX_FETCH_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue("MAX_FETCH_ATTEMPTS".to_string()));
        }
        Ok(Self {
            max_attempts,
            backoff_base: Duration::from_millis(parsed("BACKOFF_BASE_MS", DEFAULT_BACKOFF_BASE_MS)?),
            backoff_cap: Duration::from_millis(parsed("BACKOFF_CAP_MS", DEFAULT_BACKOFF_CAP_MS)?),
            pacing: Duration::from_millis(parsed("PACING_MS", DEFAULT_PACING_MS)?),
        })
    }
}

impl DetectionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            weekly_probe_start: parsed("WEEKLY_PROBE_START", DEFAULT_WEEKLY_PROBE_START)?,
            biweekly_probe_start: parsed("BIWEEKLY_PROBE_START", DEFAULT_BIWEEKLY_PROBE_START)?,
            probe_lookback: parsed("PROBE_LOOKBACK", DEFAULT_PROBE_LOOKBACK)?,
        })
    }
}

impl ScheduleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            weekly_cron: env::var("WEEKLY_CRON").unwrap_or_else(|_| DEFAULT_WEEKLY_CRON.to_string()),
            biweekly_cron: env::var("BIWEEKLY_CRON")
                .unwrap_or_else(|_| DEFAULT_BIWEEKLY_CRON.to_string()),
            stats_cron: env::var("STATS_CRON").unwrap_or_else(|_| DEFAULT_STATS_CRON.to_string()),
        })
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backup_dir = match env::var("BACKUP_DIR") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(PathBuf::from(raw)),
            Err(_) => Some(PathBuf::from(DEFAULT_BACKUP_DIR)),
        };
        Ok(Self {
            ledger_path: PathBuf::from(
                env::var("LEDGER_PATH").unwrap_or_else(|_| DEFAULT_LEDGER_PATH.to_string()),
            ),
            backup_dir,
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
