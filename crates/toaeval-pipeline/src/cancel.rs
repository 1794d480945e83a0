use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared user-cancellation flag.
///
/// Clones share the same flag. Set it from a signal handler and poll it
/// from the evaluation loop.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
