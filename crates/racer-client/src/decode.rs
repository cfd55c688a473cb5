use anyhow::{Context, Result};
use racer_core::{AppError, FireResponse, SnapshotData, SnapshotResponse};
use reqwest::StatusCode;

/// Decode a firing reply body.
///
/// A body that is not a reply envelope comes back as the unset sentinel,
/// except under HTTP 412/429 where the status itself is the code. Upstream
/// rate limiting often answers with an HTML page instead of JSON.
pub fn decode_fire_reply(status: StatusCode, body: &str) -> FireResponse {
    match serde_json::from_str::<FireResponse>(body) {
        Ok(reply) => reply,
        Err(_) if is_throttle_status(status) => FireResponse {
            code: i64::from(status.as_u16()),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            ttl: 0,
        },
        Err(_) => FireResponse::unset(),
    }
}

fn is_throttle_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::PRECONDITION_FAILED
}

/// Decode the snapshot envelope, rejecting a non-zero code or missing data.
pub fn decode_snapshot(body: &str) -> Result<SnapshotData> {
    let response: SnapshotResponse =
        serde_json::from_str(body).context("snapshot body is not a valid envelope")?;
    if response.code != 0 {
        return Err(AppError::SnapshotRejected {
            code: response.code,
            message: response.message,
        }
        .into());
    }
    response.data.ok_or_else(|| AppError::EmptySnapshot.into())
}
