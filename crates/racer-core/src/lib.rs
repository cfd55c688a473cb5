//! Core domain types shared by every racer crate: the reservation snapshot,
//! tickets, firing replies, credentials and the endpoint seam.

pub mod catalog;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod types;

pub use catalog::Catalog;
pub use credentials::{CSRF_COOKIE, Credentials, extract_csrf};
pub use endpoint::{FireRequest, NetworkPath, ReserveEndpoint};
pub use error::AppError;
pub use types::{
    FireResponse, NextSlot, ReservableSlot, ReserveList, SnapshotData, SnapshotResponse, Ticket,
    UNSET_CODE, VIP_MARKER, Window, WindowSource,
};
