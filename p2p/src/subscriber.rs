//! Per-channel message fan-out. Handlers subscribe to a command name and are invoked
//! in subscription order each time that command arrives; returning `false` cancels
//! the subscription.
use std::collections::HashMap;

use bitcoin::network::message::NetworkMessage;
use bn_common::error::Error;

/// Delivered to a handler: `Ok(message)` on a received message of the subscribed
/// command, `Err(code)` once when the owning channel stops.
type Delivery<'a> = Result<&'a NetworkMessage, Error>;

type Handler = Box<dyn FnMut(Delivery) -> bool + Send>;

/// Command-keyed handler registry owned by a [`crate::channel::Channel`].
#[derive(Default)]
pub struct MessageSubscriber {
    handlers: HashMap<&'static str, Vec<Handler>>,
    stopped: Option<Error>,
}

impl MessageSubscriber {
    /// Create an empty subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` to run whenever a message with the given `command` name is
    /// received. If the subscriber already stopped, `handler` is invoked immediately
    /// with the stop code and never registered.
    pub fn subscribe(&mut self, command: &'static str, mut handler: Handler) {
        if let Some(code) = &self.stopped {
            handler(Err(code.clone()));
            return;
        }
        self.handlers.entry(command).or_default().push(handler);
    }

    /// Deliver `message` to every handler registered for `command`, dropping handlers
    /// that return `false`.
    pub fn notify(&mut self, command: &'static str, message: &NetworkMessage) {
        if self.stopped.is_some() {
            return;
        }
        if let Some(list) = self.handlers.get_mut(command) {
            list.retain_mut(|handler| handler(Ok(message)));
        }
    }

    /// Stop the subscriber: every remaining handler across every command is invoked
    /// once with `code`, then dropped. Later calls to `subscribe` get `code`
    /// immediately instead of being registered.
    pub fn stop(&mut self, code: Error) {
        if self.stopped.is_some() {
            return;
        }
        for (_, mut list) in self.handlers.drain() {
            for mut handler in list.drain(..) {
                handler(Err(code.clone()));
            }
        }
        self.stopped = Some(code);
    }

    /// `true` once [`MessageSubscriber::stop`] has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::network::message::NetworkMessage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn delivers_in_subscription_order() {
        let mut sub = MessageSubscriber::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let o1 = order.clone();
        sub.subscribe(
            "ping",
            Box::new(move |_| {
                o1.lock().unwrap().push(1);
                true
            }),
        );
        let o2 = order.clone();
        sub.subscribe(
            "ping",
            Box::new(move |_| {
                o2.lock().unwrap().push(2);
                true
            }),
        );

        sub.notify("ping", &NetworkMessage::Ping(0));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn handler_returning_false_unsubscribes() {
        let mut sub = MessageSubscriber::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        sub.subscribe(
            "pong",
            Box::new(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                false
            }),
        );
        sub.notify("pong", &NetworkMessage::Pong(0));
        sub.notify("pong", &NetworkMessage::Pong(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_invokes_every_pending_handler_once() {
        let mut sub = MessageSubscriber::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        sub.subscribe("verack", Box::new(move |_| { c1.fetch_add(1, Ordering::SeqCst); true }));
        let c2 = calls.clone();
        sub.subscribe("version", Box::new(move |_| { c2.fetch_add(1, Ordering::SeqCst); true }));

        sub.stop(Error::ChannelStopped);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        sub.notify("verack", &NetworkMessage::Verack);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn subscribe_after_stop_fires_immediately() {
        let mut sub = MessageSubscriber::new();
        sub.stop(Error::ChannelStopped);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        sub.subscribe(
            "addr",
            Box::new(move |delivery| {
                assert!(delivery.is_err());
                f.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
