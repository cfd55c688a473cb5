use racer_core::NetworkPath;

/// Per-task choice of network path.
///
/// The fallback path is one-shot: it is selected only for the attempt
/// immediately after a rate-limit reply on the direct path, and the next
/// attempt after it goes direct again regardless of outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSelector {
    current: NetworkPath,
    fallback_available: bool,
}

impl PathSelector {
    pub fn new(fallback_available: bool) -> Self {
        Self {
            current: NetworkPath::Direct,
            fallback_available,
        }
    }

    /// Path the next firing call will use.
    pub fn current(&self) -> NetworkPath {
        self.current
    }

    /// Record that a call went out; returns the path it used.
    pub fn consume(&mut self) -> NetworkPath {
        std::mem::replace(&mut self.current, NetworkPath::Direct)
    }

    /// React to a rate-limit reply received over `used`.
    ///
    /// Returns `true` when the next attempt should go out at once over the
    /// fallback path; `false` means the caller backs off on the direct path.
    pub fn switch_after_rate_limit(&mut self, used: NetworkPath) -> bool {
        if used == NetworkPath::Direct && self.fallback_available {
            self.current = NetworkPath::Fallback;
            true
        } else {
            self.current = NetworkPath::Direct;
            false
        }
    }

    pub fn revert(&mut self) {
        self.current = NetworkPath::Direct;
    }
}
