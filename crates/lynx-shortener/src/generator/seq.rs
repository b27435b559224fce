use crate::generator::Generator;
use lynx_core::LinkId;
use std::sync::atomic::{AtomicU64, Ordering};

/// A generator that hands out consecutive ids.
///
/// It is predictable, which makes it handy in tests and for single-node
/// deployments that want dense, short codes. Counters wrap at `u64::MAX`.
#[derive(Debug, Default)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self::with_offset(self.counter.load(Ordering::SeqCst))
    }
}

impl SeqGenerator {
    /// Starts counting from zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new sequential generator starting from a specific counter value.
    ///
    /// Useful for resuming from a known state or distributing
    /// counter ranges across nodes (e.g., node 1 starts at 0, node 2 at 1_000_000).
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> LinkId {
        LinkId::new(self.counter.fetch_add(1, Ordering::SeqCst))
    }
}
