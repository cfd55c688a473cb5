use anyhow::Result;
use async_trait::async_trait;

use crate::types::FireResponse;

/// Network route a firing call travels over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NetworkPath {
    #[default]
    Direct,
    Fallback,
}

impl std::fmt::Display for NetworkPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// One firing call: claim `slot_id` with `ticket_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireRequest {
    pub slot_id: i64,
    pub ticket_id: String,
}

/// The remote side racing tasks fire against.
///
/// `fire` returns `Err` only for transport failures where no reply was
/// received. A reply whose body did not decode comes back as
/// [`FireResponse::unset`].
#[async_trait]
pub trait ReserveEndpoint: Send + Sync {
    /// Whether a fallback network path is configured.
    fn has_fallback(&self) -> bool;

    async fn fire(&self, request: &FireRequest, path: NetworkPath) -> Result<FireResponse>;
}
