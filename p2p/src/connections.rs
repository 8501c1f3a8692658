//! The set of fully handshaken, live channels.
use std::collections::HashMap;
use std::sync::Mutex;

use bn_common::Authority;

use crate::channel::{Channel, Link};

/// Live channels, keyed by remote endpoint. A given [`Authority`] appears at most
/// once, regardless of link direction.
#[derive(Default)]
pub struct Connections {
    by_authority: Mutex<HashMap<Authority, Channel>>,
}

impl Connections {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `channel`, replacing any previous channel to the same authority.
    /// Returns the replaced channel, if any (callers should stop it to avoid a
    /// duplicate live socket to the same peer).
    pub fn insert(&self, channel: Channel) -> Option<Channel> {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).insert(channel.remote(), channel)
    }

    /// Remove and return the channel to `authority`, if connected.
    pub fn remove(&self, authority: &Authority) -> Option<Channel> {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).remove(authority)
    }

    /// Drop every entry whose channel has stopped. Session loops call this before
    /// counting live connections so a dead channel's slot doesn't stay stuck
    /// occupied forever — the strand that noticed the stop doesn't itself know its
    /// own entry's key, so nothing else removes it.
    pub fn reap(&self) -> Vec<Channel> {
        let mut guard = self.by_authority.lock().unwrap_or_else(|e| e.into_inner());
        let dead: Vec<Authority> =
            guard.iter().filter(|(_, channel)| channel.is_stopped()).map(|(authority, _)| *authority).collect();
        dead.into_iter().filter_map(|authority| guard.remove(&authority)).collect()
    }

    /// `true` if a live channel to `authority` exists.
    pub fn contains(&self, authority: &Authority) -> bool {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).contains_key(authority)
    }

    /// The channel to `authority`, if connected.
    pub fn get(&self, authority: &Authority) -> Option<Channel> {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).get(authority).cloned()
    }

    /// Snapshot of every live channel.
    pub fn all(&self) -> Vec<Channel> {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).values().cloned().collect()
    }

    /// Snapshot of live channels with the given link direction.
    pub fn with_link(&self, link: Link) -> Vec<Channel> {
        self.by_authority
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|c| c.link() == link)
            .cloned()
            .collect()
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.by_authority.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// `true` if no channels are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Broadcast `message` to every live channel, logging (but not failing on)
    /// individual send errors.
    pub fn broadcast(&self, message: bitcoin::network::message::NetworkMessage) {
        for channel in self.all() {
            if let Err(err) = channel.send(message.clone()) {
                log::warn!(target: "p2p", "{}: broadcast failed: {}", channel.remote(), err);
            }
        }
    }
}
