use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};

use crate::coordinator::snapshot::{DictSnapshot, SyncState, SyncTrigger};

/// Non-reentrant try-lock guarding every remote sync.
#[derive(Clone, Default)]
pub(crate) struct SyncGate {
    lock: Arc<Mutex<()>>,
    held: Arc<AtomicBool>,
}

impl SyncGate {
    /// Takes the gate without waiting and marks the snapshot as syncing.
    pub(crate) fn try_enter(
        &self,
        trigger: SyncTrigger,
        snapshot: &Arc<watch::Sender<DictSnapshot>>,
    ) -> Option<SyncPermit> {
        let guard = self.lock.clone().try_lock_owned().ok()?;
        self.held.store(true, Ordering::Release);
        snapshot.send_modify(|state| state.sync_state = SyncState::Running(trigger));
        Some(SyncPermit {
            trigger,
            snapshot: snapshot.clone(),
            held: self.held.clone(),
            _guard: guard,
        })
    }

    /// Reads the flag the permit maintains; never touches the lock.
    pub(crate) fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Held for a whole sync attempt. Dropping it, on any exit path, resets the
/// snapshot to idle and then releases the gate.
pub(crate) struct SyncPermit {
    trigger: SyncTrigger,
    snapshot: Arc<watch::Sender<DictSnapshot>>,
    held: Arc<AtomicBool>,
    _guard: OwnedMutexGuard<()>,
}

impl SyncPermit {
    pub(crate) fn trigger(&self) -> SyncTrigger {
        self.trigger
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.snapshot
            .send_modify(|state| state.sync_state = SyncState::Idle);
        self.held.store(false, Ordering::Release);
    }
}
