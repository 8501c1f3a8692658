//! Bookkeeping for in-flight connection attempts: sockets still dialing, and
//! channels still mid-handshake.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use bn_common::Authority;

use crate::channel::Channel;

/// A channel that has not yet completed its version/verack handshake, tracked by the
/// nonce it sent in its own `version` message so a loop-back connection can be
/// recognized when the same nonce comes back from the "peer".
#[derive(Default)]
pub struct PendingChannels {
    by_nonce: Mutex<HashMap<u64, Channel>>,
}

impl PendingChannels {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `channel` under the nonce it sent.
    pub fn insert(&self, channel: Channel) {
        self.by_nonce.lock().unwrap_or_else(|e| e.into_inner()).insert(channel.nonce(), channel);
    }

    /// Remove and return the channel handshaking with nonce `nonce`, if any.
    pub fn remove(&self, nonce: u64) -> Option<Channel> {
        self.by_nonce.lock().unwrap_or_else(|e| e.into_inner()).remove(&nonce)
    }

    /// `true` if `nonce` is the nonce of a channel we ourselves opened and are still
    /// handshaking — i.e. the remote `version.nonce` we just received is our own,
    /// meaning the "peer" is actually a loop-back of one of our own outbound
    /// attempts.
    pub fn is_self_connection(&self, nonce: u64) -> bool {
        self.by_nonce.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&nonce)
    }

    /// Number of channels currently mid-handshake.
    pub fn len(&self) -> usize {
        self.by_nonce.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Tracks outbound dial attempts in flight against a given [`Authority`], so a slot
/// doesn't pile up unbounded parallel attempts against the same candidate.
#[derive(Default)]
pub struct PendingSockets {
    attempts: Mutex<HashMap<Authority, (usize, Instant)>>,
    batch_size: usize,
}

impl PendingSockets {
    /// New registry, capping concurrent attempts per authority at `batch_size`.
    pub fn new(batch_size: usize) -> Self {
        Self { attempts: Mutex::new(HashMap::new()), batch_size: batch_size.max(1) }
    }

    /// Record the start of a dial attempt against `authority`. Returns `false` if
    /// `batch_size` concurrent attempts against it are already in flight.
    pub fn begin(&self, authority: Authority) -> bool {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let entry = attempts.entry(authority).or_insert((0, Instant::now()));
        if entry.0 >= self.batch_size {
            return false;
        }
        entry.0 += 1;
        entry.1 = Instant::now();
        true
    }

    /// Record the end (success or failure) of a dial attempt against `authority`.
    pub fn end(&self, authority: Authority) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = attempts.get_mut(&authority) {
            entry.0 = entry.0.saturating_sub(1);
            if entry.0 == 0 {
                attempts.remove(&authority);
            }
        }
    }

    /// Number of authorities with at least one attempt in flight.
    pub fn len(&self) -> usize {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
