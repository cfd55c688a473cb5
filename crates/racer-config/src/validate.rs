use anyhow::{Result, bail};
use racer_core::extract_csrf;
use tracing::warn;

use crate::config::RacerConfig;

const PROXY_SCHEMES: &[&str] = &["http://", "https://", "socks5://", "socks5h://"];

/// Validate a parsed configuration.
/// Returns Ok(()) if valid, or Err with a descriptive message.
pub fn validate_config(config: &RacerConfig) -> Result<()> {
    validate_cookie(config)?;
    validate_jobs(config)?;
    validate_proxy(config)?;
    validate_racing(config)?;
    warn_missing_buvid(config);
    Ok(())
}

fn validate_cookie(config: &RacerConfig) -> Result<()> {
    if config.cookie.trim().is_empty() {
        bail!("cookie cannot be empty");
    }
    if extract_csrf(&config.cookie).is_none() {
        bail!("cookie has no bili_jct pair; the CSRF token is required");
    }
    Ok(())
}

fn validate_jobs(config: &RacerConfig) -> Result<()> {
    if config.job.is_empty() {
        bail!("job list is empty; add at least one \"<reserve id>\": \"<ticket id>\" pair");
    }
    let jobs = config.jobs()?;
    if let Some(job) = jobs.iter().find(|job| job.ticket_id.is_empty()) {
        bail!("job {} has an empty ticket id", job.slot_id);
    }
    Ok(())
}

fn validate_proxy(config: &RacerConfig) -> Result<()> {
    if let Some(proxy) = config.fallback_proxy() {
        if !PROXY_SCHEMES.iter().any(|scheme| proxy.starts_with(scheme)) {
            bail!(
                "proxy '{}' has an unsupported scheme (expected one of: {})",
                proxy,
                PROXY_SCHEMES.join(", ")
            );
        }
    }
    Ok(())
}

fn validate_racing(config: &RacerConfig) -> Result<()> {
    if config.racing.min_tick_ms == 0 {
        bail!("racing.min_tick_ms must be > 0 (got 0)");
    }
    if config.racing.request_timeout_ms == 0 {
        bail!("racing.request_timeout_ms must be > 0 (got 0)");
    }
    Ok(())
}

fn warn_missing_buvid(config: &RacerConfig) {
    if config.buvid.trim().is_empty() {
        warn!("buvid is empty; the user agent will carry an empty device id");
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
