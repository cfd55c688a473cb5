use anyhow::{Context, Result};
use racer_core::{AppError, FireRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::validate::validate_config;

/// Config file used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub const DEFAULT_INFO_URL: &str =
    "https://api.bilibili.com/x/activity/bws/online/park/reserve/info";
pub const DEFAULT_RESERVE_URL: &str =
    "https://api.bilibili.com/x/activity/bws/online/park/reserve/do";

/// On-disk format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` selects TOML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerConfig {
    /// Full cookie string; must carry the `bili_jct` CSRF pair.
    pub cookie: String,
    /// Device identifier substituted into the user agent.
    #[serde(default)]
    pub buvid: String,
    /// Fallback network path, used for one attempt after a rate-limit reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Reservation id (as a string) -> ticket id.
    #[serde(default)]
    pub job: BTreeMap<String, String>,
    #[serde(default = "default_reserve_dates")]
    pub reserve_dates: Vec<String>,
    /// SNTP servers; `None` uses the built-in list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ntp_servers: Option<Vec<String>>,
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub racing: RacingConfig,
}

fn default_reserve_dates() -> Vec<String> {
    ["20240712", "20240713", "20240714"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("response.txt")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_info_url")]
    pub info_url: String,
    #[serde(default = "default_reserve_url")]
    pub reserve_url: String,
}

fn default_info_url() -> String {
    DEFAULT_INFO_URL.to_string()
}

fn default_reserve_url() -> String {
    DEFAULT_RESERVE_URL.to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            info_url: default_info_url(),
            reserve_url: default_reserve_url(),
        }
    }
}

/// Timing knobs for racing tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RacingConfig {
    /// Fixed delay before retrying after a backoff-class reply.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Pause after a success so no trailing duplicate call goes out.
    #[serde(default = "default_success_cooldown_ms")]
    pub success_cooldown_ms: u64,
    /// Shortest convergence sleep.
    #[serde(default = "default_min_tick_ms")]
    pub min_tick_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_success_cooldown_ms() -> u64 {
    450
}

fn default_min_tick_ms() -> u64 {
    1
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for RacingConfig {
    fn default() -> Self {
        Self {
            backoff_ms: default_backoff_ms(),
            success_cooldown_ms: default_success_cooldown_ms(),
            min_tick_ms: default_min_tick_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl RacerConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        validate_config(&config)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    /// The fallback path, treating an empty string as unset.
    pub fn fallback_proxy(&self) -> Option<&str> {
        self.proxy
            .as_deref()
            .map(str::trim)
            .filter(|proxy| !proxy.is_empty())
    }

    /// Job pairs ordered by reservation id.
    pub fn jobs(&self) -> Result<Vec<FireRequest>, AppError> {
        let mut jobs = self
            .job
            .iter()
            .map(|(key, ticket)| {
                let slot_id = key
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| AppError::InvalidJobKey(key.clone()))?;
                Ok(FireRequest {
                    slot_id,
                    ticket_id: ticket.trim().to_string(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        jobs.sort_by_key(|job| job.slot_id);
        Ok(jobs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
