//! Process-wide call gate.
//! Independent crate with no internal racer dependencies.
//!
//! Every firing call across every racing task runs inside
//! [`CallGate::with_exclusive_access`], so at most one call is in flight at
//! any instant. The gate is an explicit value handed to each task rather than
//! a global, which keeps the serialization contract testable on its own.
//!
//! The guard lives inside the scoped future, so it is released on every exit
//! path: normal return, an `Err` from the body, a panic unwinding through the
//! body, or the future being dropped mid-call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::trace;

#[derive(Default)]
struct GateInner {
    lock: Mutex<()>,
    admitted: AtomicU64,
}

/// Shared exclusive-access gate. Clones share the same underlying lock.
#[derive(Clone, Default)]
pub struct CallGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for CallGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallGate")
            .field("admitted", &self.admitted())
            .field("held", &self.is_held())
            .finish()
    }
}

impl CallGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` while holding the gate.
    ///
    /// Waiters are admitted in FIFO order (tokio's mutex is fair).
    pub async fn with_exclusive_access<F, Fut, T>(&self, body: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let wait_started = Instant::now();
        let _guard = self.inner.lock.lock().await;
        let seq = self.inner.admitted.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(
            seq,
            waited_ms = wait_started.elapsed().as_millis() as u64,
            "call gate acquired"
        );
        body().await
    }

    /// Number of bodies admitted so far.
    pub fn admitted(&self) -> u64 {
        self.inner.admitted.load(Ordering::Relaxed)
    }

    /// Whether some task currently holds the gate.
    pub fn is_held(&self) -> bool {
        self.inner.lock.try_lock().is_err()
    }
}
