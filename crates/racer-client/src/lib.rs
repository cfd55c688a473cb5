//! HTTP side of the racer: the snapshot fetch, the firing endpoint over a
//! direct and an optional fallback path, and the response audit file.

pub mod agent;
pub mod audit;
pub mod client;
pub mod decode;

pub use agent::{BUVID_PLACEHOLDER, FORM_CONTENT_TYPE, REFERER_URL, USER_AGENT_TEMPLATE, user_agent};
pub use audit::{AuditRecord, AuditSink, AuditStats, spawn_audit_writer};
pub use client::BwsClient;
pub use decode::{decode_fire_reply, decode_snapshot};
