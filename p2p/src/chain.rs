//! The minimal capability the handshake needs from whatever block/transaction
//! validation engine is wired in above this crate. Block and transaction validation
//! are out of scope for this core; this trait is the one fact about chain state the
//! handshake's `start_height` field needs.
use std::sync::atomic::{AtomicU32, Ordering};

/// A source of the local chain height, supplied by the embedder.
pub trait ChainView: Send + Sync {
    /// Current best-known chain height, as advertised in `version.start_height`.
    fn height(&self) -> u32;
}

/// A `ChainView` that reports a value set by the embedder, for use before a real
/// chain engine is wired in, or in tests.
#[derive(Default)]
pub struct StaticChainView(AtomicU32);

impl StaticChainView {
    /// A view fixed at `height`.
    pub fn new(height: u32) -> Self {
        Self(AtomicU32::new(height))
    }

    /// Update the reported height.
    pub fn set(&self, height: u32) {
        self.0.store(height, Ordering::SeqCst);
    }
}

impl ChainView for StaticChainView {
    fn height(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
