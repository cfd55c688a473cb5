//! Clock synchronization: local wall clock, signed offset to a reference
//! clock, and the SNTP client that measures it.

pub mod offset;
pub mod sntp;
pub mod sync;

pub use offset::{Clock, ClockOffset, SystemClock};
pub use sntp::{ClockError, SntpClient};
pub use sync::{ClockSynchronizer, DEFAULT_NTP_SERVERS};
