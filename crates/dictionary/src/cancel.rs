//! Latest-wins cancellation for filter recomputation.
//!
//! Each recomputation draws a fresh version from a [`VersionTracker`].
//! Drawing a new version implicitly cancels every token minted for an older
//! one, so a slow computation can notice it was superseded and stop, and a
//! finished one can check it is still allowed to commit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks the most recently issued version.
#[derive(Debug, Default, Clone)]
pub struct VersionTracker {
    active_version: Arc<AtomicU64>,
}

impl VersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new version, superseding all earlier ones.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Issues a new version and returns a token bound to it.
    pub fn issue(&self) -> CancellationToken {
        let version = self.next_version();
        self.token_for_version(version)
    }

    /// Token that stays active until a version newer than `version` is issued.
    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: Some(self.active_version.clone()),
            version,
        }
    }
}

/// Cooperative cancellation handle for one recomputation attempt.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    active_version: Option<Arc<AtomicU64>>,
    version: u64,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn noop() -> Self {
        Self {
            active_version: None,
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.active_version {
            Some(active) => active.load(Ordering::SeqCst) != self.version,
            None => false,
        }
    }

    /// Returns `Some(())` while active so loops can bail out with `?`.
    #[inline]
    pub fn check(&self) -> Option<()> {
        if self.is_cancelled() {
            None
        } else {
            Some(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::noop()
    }
}
