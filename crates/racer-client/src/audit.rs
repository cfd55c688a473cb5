//! Append-only audit of raw firing replies.
//!
//! Racing tasks hand records to an [`AuditSink`]; a blocking writer thread
//! drains them into a JSONL file, one line per reply. Recording never waits
//! on disk: when the queue is full the record is dropped with a warning.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use racer_core::{FireRequest, NetworkPath};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::warn;

const AUDIT_SCHEMA_VERSION: u8 = 1;
const AUDIT_QUEUE_CAPACITY: usize = 1024;

/// One raw reply as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub slot_id: i64,
    pub ticket_id: String,
    pub path: NetworkPath,
    pub status: u16,
    pub body: String,
}

impl AuditRecord {
    pub fn new(request: &FireRequest, path: NetworkPath, status: u16, body: &str) -> Self {
        Self {
            slot_id: request.slot_id,
            ticket_id: request.ticket_id.clone(),
            path,
            status,
            body: body.to_string(),
        }
    }
}

#[derive(Serialize)]
struct AuditLine<'a> {
    v: u8,
    seq: u64,
    ts: String,
    slot_id: i64,
    ticket: &'a str,
    path: String,
    status: u16,
    body: &'a str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    pub records_written: u64,
    pub write_failures: u64,
}

/// Sending half of the audit queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<AuditRecord>,
}

impl AuditSink {
    pub fn record(&self, record: AuditRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                warn!(
                    slot = record.slot_id,
                    status = record.status,
                    "audit queue full, reply not recorded"
                );
            }
            Err(TrySendError::Closed(_)) => {
                warn!("audit writer has stopped, reply not recorded");
            }
        }
    }
}

/// Create (truncating) the audit file and start its writer.
///
/// The writer exits once every [`AuditSink`] clone is dropped; its handle
/// yields the final counts.
pub fn spawn_audit_writer(path: &Path) -> Result<(AuditSink, JoinHandle<AuditStats>)> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create audit file: {}", path.display()))?;
    let (tx, rx) = mpsc::channel(AUDIT_QUEUE_CAPACITY);
    let path = path.to_path_buf();
    let handle = tokio::task::spawn_blocking(move || drain(rx, BufWriter::new(file), &path));
    Ok((AuditSink { tx }, handle))
}

fn drain(
    mut rx: mpsc::Receiver<AuditRecord>,
    mut writer: BufWriter<File>,
    path: &Path,
) -> AuditStats {
    let mut stats = AuditStats::default();
    let mut seq = 0u64;
    while let Some(record) = rx.blocking_recv() {
        let line = AuditLine {
            v: AUDIT_SCHEMA_VERSION,
            seq,
            ts: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            slot_id: record.slot_id,
            ticket: &record.ticket_id,
            path: record.path.to_string(),
            status: record.status,
            body: &record.body,
        };
        seq = seq.saturating_add(1);
        let written = serde_json::to_vec(&line)
            .map_err(std::io::Error::from)
            .and_then(|mut bytes| {
                bytes.push(b'\n');
                writer.write_all(&bytes)?;
                writer.flush()
            });
        match written {
            Ok(()) => stats.records_written = stats.records_written.saturating_add(1),
            Err(err) => {
                stats.write_failures = stats.write_failures.saturating_add(1);
                warn!(path = %path.display(), seq, error = %err, "failed to write audit record");
            }
        }
    }
    stats
}
