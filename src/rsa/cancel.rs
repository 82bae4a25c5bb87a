// Cancellation
// Shared flag polled by the prime and exponent search loops

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::{RsaError, RsaResult};

/// Cloneable handle; cancelling any clone cancels all of them.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called
    pub fn check(&self) -> RsaResult<()> {
        if self.is_cancelled() {
            Err(RsaError::Cancelled)
        } else {
            Ok(())
        }
    }
}
