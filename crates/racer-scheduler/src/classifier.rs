//! Response code -> control action.
//!
//! The table is fixed. Codes it does not list map to [`ControlAction::Abandon`]:
//! retrying on an unrecognized condition risks an anti-automation penalty
//! worse than missing the window.

use racer_core::FireResponse;

/// What a racing task does next after a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    Success,
    /// Retry at once over the fallback path if one is available.
    RetrySwitchProxy,
    /// Retry on the direct path after a fixed delay.
    RetryBackoff,
    /// Stop racing this pair.
    Abandon,
}

/// Remote-assigned codes with known meaning.
pub mod codes {
    pub const ACCEPTED: i64 = 0;
    pub const PRECONDITION_BLOCKED: i64 = 412;
    pub const RATE_LIMITED: i64 = 429;
    pub const REQUEST_TOO_FREQUENT: i64 = -702;
    pub const OPERATION_TOO_FREQUENT: i64 = 76650;
    pub const WINDOW_NOT_OPEN: i64 = 75637;
    pub const ACCOUNT_QUOTA_EXHAUSTED: i64 = 76647;
    pub const CAPACITY_EXHAUSTED: i64 = 75574;
}

/// A code-0 reply only confirms the reservation when its message is this.
pub const CONFIRMED_MESSAGE: &str = "0";

pub fn classify(code: i64) -> ControlAction {
    match code {
        codes::ACCEPTED => ControlAction::Success,
        // 412 shares the 429 handling.
        codes::PRECONDITION_BLOCKED
        | codes::RATE_LIMITED
        | codes::REQUEST_TOO_FREQUENT
        | codes::OPERATION_TOO_FREQUENT
        | codes::WINDOW_NOT_OPEN => ControlAction::RetrySwitchProxy,
        codes::ACCOUNT_QUOTA_EXHAUSTED | codes::CAPACITY_EXHAUSTED => ControlAction::Abandon,
        _ => ControlAction::Abandon,
    }
}

/// Classify a decoded reply, treating undecodable or unconfirmed payloads
/// as transient.
pub fn interpret(response: &FireResponse) -> ControlAction {
    if response.is_unset() {
        return ControlAction::RetryBackoff;
    }
    match classify(response.code) {
        ControlAction::Success if response.message != CONFIRMED_MESSAGE => {
            ControlAction::RetryBackoff
        }
        action => action,
    }
}

/// Short human description of a code, for log lines.
pub fn describe(code: i64) -> &'static str {
    match code {
        codes::ACCEPTED => "accepted",
        codes::PRECONDITION_BLOCKED => "precondition failed, account or IP may be restricted",
        codes::RATE_LIMITED => "rate limited",
        codes::REQUEST_TOO_FREQUENT => "request frequency too high",
        codes::OPERATION_TOO_FREQUENT => "operation too frequent",
        codes::WINDOW_NOT_OPEN => "reservation window may not be open yet",
        codes::ACCOUNT_QUOTA_EXHAUSTED => "account reservation quota exhausted",
        codes::CAPACITY_EXHAUSTED => "reservation full, no refill",
        racer_core::UNSET_CODE => "reply did not decode",
        _ => "unrecognized code",
    }
}
