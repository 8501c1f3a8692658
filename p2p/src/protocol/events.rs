//! The shared shape every protocol attaches to a channel: react to messages as they
//! arrive, and handle the channel's stop exactly once, regardless of how many
//! commands the protocol subscribed to.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bn_common::error::Error;

/// Wrap `callback` so that, no matter how many of a protocol's command
/// subscriptions are live when the owning channel stops, `callback` runs at most
/// once.
pub fn once<F>(mut callback: F) -> impl FnMut(Error) + Send + Clone
where
    F: FnMut(Error) + Send + Clone + 'static,
{
    let fired = Arc::new(AtomicBool::new(false));
    move |code| {
        if !fired.swap(true, Ordering::SeqCst) {
            callback(code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fires_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let mut guarded = once(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        guarded(Error::ChannelStopped);
        guarded(Error::ChannelStopped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
