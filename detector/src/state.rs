use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "Is the watch still active". Shared between the watcher thread and the
/// controller's wait loop; clones point at the same flag.
///
/// Starts `true` and can only ever go to `false`, once.
#[derive(Debug, Clone)]
pub struct RunningState(Arc<AtomicBool>);

impl RunningState {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Flips the flag to `false`. Returns `true` only for the call that
    /// performed the transition.
    pub fn finish(&self) -> bool {
        self.0
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for RunningState {
    fn default() -> Self {
        Self::new()
    }
}
