#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("CSRF token '{0}' not found in cookie")]
    MissingCsrfToken(&'static str),

    #[error("Snapshot rejected by upstream (code {code}): {message}")]
    SnapshotRejected { code: i64, message: String },

    #[error("Snapshot response carried no data")]
    EmptySnapshot,

    #[error("Reservation {0} not found in snapshot")]
    SlotNotFound(i64),

    #[error("Ticket '{0}' not found in user ticket list")]
    TicketNotFound(String),

    #[error("Invalid job key '{0}': expected an integer reservation id")]
    InvalidJobKey(String),
}
