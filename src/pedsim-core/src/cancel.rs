//! Cooperative cancellation. Polled between generations by the sampler and
//! between pedigrees by the builder and haplotype engine (spec.md §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mockall::automock;

#[automock]
pub trait CancellationProbe {
    fn cancelled(&self) -> bool;
}

/// Default probe: a simulation using this one runs to completion.
pub struct NeverCancelled;

impl CancellationProbe for NeverCancelled {
    fn cancelled(&self) -> bool {
        false
    }
}

/// Flip-able from another thread or a signal handler.
#[derive(Clone, Default)]
pub struct AtomicCancellationProbe(Arc<AtomicBool>);

impl AtomicCancellationProbe {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl CancellationProbe for AtomicCancellationProbe {
    fn cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
