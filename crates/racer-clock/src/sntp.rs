//! SNTP client (RFC 4330) for measuring the local clock offset.
//!
//! Sends one 48-byte client request per query and derives the offset from the
//! four timestamps of the exchange:
//!
//! ```text
//! offset = ((t1 - t0) + (t2 - t3)) / 2
//! ```
//!
//! where `t0`/`t3` are local send/receive times and `t1`/`t2` are the server's
//! receive/transmit times.

use std::net::SocketAddr;
use std::ops::Range;
use std::time::Duration;

use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::offset::ClockOffset;

/// SNTP packet size (no extension fields)
const NTP_PACKET_SIZE: usize = 48;

/// LI = 0, VN = 4, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0x23;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const LEAP_UNSYNCHRONIZED: u8 = 3;

const DEFAULT_NTP_PORT: u16 = 123;

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01.
const NTP_UNIX_DELTA_SECS: i64 = 2_208_988_800;

const ORIGIN_TS: Range<usize> = 24..32;
const RECEIVE_TS: Range<usize> = 32..40;
const TRANSMIT_TS: Range<usize> = 40..48;

#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("cannot resolve time server '{0}'")]
    Resolve(String),

    #[error("time server '{server}' I/O error: {source}")]
    Io {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("time server '{0}' did not answer in time")]
    Timeout(String),

    #[error("invalid SNTP response: {0}")]
    InvalidResponse(String),

    #[error("no time servers configured")]
    NoServers,

    #[error("all {attempted} time servers failed; last error: {last}")]
    AllFailed {
        attempted: usize,
        last: Box<ClockError>,
    },
}

/// Server-side timestamps extracted from a reply, in Unix millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ServerTimes {
    pub receive_ms: i64,
    pub transmit_ms: i64,
}

#[derive(Debug, Clone)]
pub struct SntpClient {
    timeout: Duration,
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SntpClient {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Query `server` (`host` or `host:port`) once.
    pub async fn query(&self, server: &str) -> Result<ClockOffset, ClockError> {
        let addr = resolve(server).await?;
        self.query_addr(server, addr).await
    }

    pub async fn query_addr(
        &self,
        label: &str,
        addr: SocketAddr,
    ) -> Result<ClockOffset, ClockError> {
        let io_err = |source| ClockError::Io {
            server: label.to_string(),
            source,
        };

        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await.map_err(io_err)?;
        socket.connect(addr).await.map_err(io_err)?;

        let t0 = Utc::now().timestamp_millis();
        let request = build_request(t0);
        socket.send(&request).await.map_err(io_err)?;

        let mut buf = [0u8; 512];
        let len = match timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(e)) => return Err(io_err(e)),
            Err(_) => return Err(ClockError::Timeout(label.to_string())),
        };
        let t3 = Utc::now().timestamp_millis();

        let times = parse_response(&buf[..len], &request[TRANSMIT_TS])?;
        Ok(compute_offset(t0, times.receive_ms, times.transmit_ms, t3))
    }
}

async fn resolve(server: &str) -> Result<SocketAddr, ClockError> {
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let target = if server.contains(':') {
        server.to_string()
    } else {
        format!("{server}:{DEFAULT_NTP_PORT}")
    };
    tokio::net::lookup_host(target)
        .await
        .map_err(|_| ClockError::Resolve(server.to_string()))?
        .next()
        .ok_or_else(|| ClockError::Resolve(server.to_string()))
}

pub(crate) fn build_request(local_ms: i64) -> [u8; NTP_PACKET_SIZE] {
    let mut packet = [0u8; NTP_PACKET_SIZE];
    packet[0] = CLIENT_HEADER;
    // The server echoes our transmit timestamp back as its origin timestamp.
    packet[TRANSMIT_TS].copy_from_slice(&unix_millis_to_ntp(local_ms));
    packet
}

pub(crate) fn parse_response(
    buf: &[u8],
    expected_origin: &[u8],
) -> Result<ServerTimes, ClockError> {
    if buf.len() < NTP_PACKET_SIZE {
        return Err(ClockError::InvalidResponse(format!(
            "short packet ({} bytes)",
            buf.len()
        )));
    }

    let leap = buf[0] >> 6;
    let mode = buf[0] & 0x07;
    let stratum = buf[1];

    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(ClockError::InvalidResponse(format!("unexpected mode {mode}")));
    }
    if leap == LEAP_UNSYNCHRONIZED {
        return Err(ClockError::InvalidResponse(
            "server clock unsynchronized".to_string(),
        ));
    }
    if stratum == 0 {
        let kiss = String::from_utf8_lossy(&buf[12..16]).to_string();
        return Err(ClockError::InvalidResponse(format!("kiss-o'-death {kiss}")));
    }
    if &buf[ORIGIN_TS] != expected_origin {
        return Err(ClockError::InvalidResponse(
            "origin timestamp mismatch".to_string(),
        ));
    }
    if buf[TRANSMIT_TS].iter().all(|b| *b == 0) {
        return Err(ClockError::InvalidResponse(
            "zero transmit timestamp".to_string(),
        ));
    }

    Ok(ServerTimes {
        receive_ms: ntp_to_unix_millis(&buf[RECEIVE_TS]),
        transmit_ms: ntp_to_unix_millis(&buf[TRANSMIT_TS]),
    })
}

pub(crate) fn compute_offset(t0: i64, t1: i64, t2: i64, t3: i64) -> ClockOffset {
    ClockOffset::from_millis(((t1 - t0) + (t2 - t3)) / 2)
}

pub(crate) fn unix_millis_to_ntp(unix_ms: i64) -> [u8; 8] {
    let secs = unix_ms.div_euclid(1000) + NTP_UNIX_DELTA_SECS;
    let frac = (unix_ms.rem_euclid(1000) << 32) / 1000;
    let mut out = [0u8; 8];
    // Truncation to u32 wraps into the next NTP era after 2036.
    out[..4].copy_from_slice(&(secs as u32).to_be_bytes());
    out[4..].copy_from_slice(&(frac as u32).to_be_bytes());
    out
}

pub(crate) fn ntp_to_unix_millis(bytes: &[u8]) -> i64 {
    let mut secs = [0u8; 4];
    let mut frac = [0u8; 4];
    secs.copy_from_slice(&bytes[..4]);
    frac.copy_from_slice(&bytes[4..8]);
    let mut secs = u32::from_be_bytes(secs) as i64;
    let frac = u32::from_be_bytes(frac) as i64;
    // MSB clear means era 1 (from 2036-02-07).
    if secs & 0x8000_0000 == 0 {
        secs += 1 << 32;
    }
    let millis = (frac * 1000 + (1 << 31)) >> 32;
    (secs - NTP_UNIX_DELTA_SECS) * 1000 + millis
}
