use tracing::{debug, info, warn};

use crate::offset::ClockOffset;
use crate::sntp::{ClockError, SntpClient};

/// Public SNTP servers queried in order until one answers.
pub const DEFAULT_NTP_SERVERS: &[&str] = &[
    "ntp.aliyun.com:123",
    "ntp.tencent.com:123",
    "cn.pool.ntp.org:123",
    "time.cloudflare.com:123",
];

/// Measures the offset between the local clock and a reference clock.
///
/// Each server is asked once; the first answer wins. Calling `sync` again
/// simply measures again, so callers can refresh the offset before racing.
#[derive(Debug, Clone)]
pub struct ClockSynchronizer {
    servers: Vec<String>,
    client: SntpClient,
}

impl Default for ClockSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_NTP_SERVERS.iter().map(|s| s.to_string()).collect())
    }
}

impl ClockSynchronizer {
    pub fn new(servers: Vec<String>) -> Self {
        Self::with_client(servers, SntpClient::new())
    }

    pub fn with_client(servers: Vec<String>, client: SntpClient) -> Self {
        Self { servers, client }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    pub async fn sync(&self) -> Result<ClockOffset, ClockError> {
        let mut last_error = None;
        for server in &self.servers {
            match self.client.query(server).await {
                Ok(offset) => {
                    debug!(server = %server, offset_ms = offset.as_millis(), "time server answered");
                    return Ok(offset);
                }
                Err(e) => {
                    debug!(server = %server, error = %e, "time server failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(last) => Err(ClockError::AllFailed {
                attempted: self.servers.len(),
                last: Box::new(last),
            }),
            None => Err(ClockError::NoServers),
        }
    }

    /// Like [`sync`](Self::sync), but degrades to a zero offset (local clock
    /// trusted as-is) with a warning instead of failing.
    pub async fn sync_or_zero(&self) -> ClockOffset {
        match self.sync().await {
            Ok(offset) => {
                info!(offset_ms = offset.as_millis(), "clock offset measured");
                offset
            }
            Err(e) => {
                warn!(error = %e, "clock sync failed, trusting local clock");
                ClockOffset::ZERO
            }
        }
    }
}
