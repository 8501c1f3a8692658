//! A single peer connection: one TCP socket, one dedicated reader thread acting as
//! its strand, and the message subscriber protocols attach handlers to.
use std::fmt;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use bitcoin::network::message::NetworkMessage;
use log::{debug, trace, warn};

use bn_common::clock::Clock;
use bn_common::error::Error;
use bn_common::Authority;

use crate::framing;
use crate::socket::LockedSocket;
use crate::subscriber::MessageSubscriber;

/// Which side opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// We dialed the peer.
    Outbound,
    /// The peer dialed us.
    Inbound,
}

impl Link {
    /// `true` for [`Link::Outbound`].
    pub fn is_outbound(&self) -> bool {
        matches!(self, Link::Outbound)
    }
}

struct Inner {
    nonce: u64,
    remote: Authority,
    link: Link,
    magic: u32,
    socket: LockedSocket,
    subscriber: Mutex<MessageSubscriber>,
    negotiated_version: AtomicU32,
    /// Set the moment anyone calls `stop`. Checked by callers (`send`, the public
    /// `is_stopped`) and by the strand loop, which is the only thing ever allowed to
    /// lock `subscriber` to deliver the stop code — a handler calling `stop` on
    /// itself runs on the strand thread, inside the `subscriber` lock already held
    /// by `notify`, so `stop` itself must never try to take that lock.
    stop_requested: AtomicBool,
    stop_code: Mutex<Option<Error>>,
    last_activity: AtomicU32,
}

/// A live peer connection. Cheap to clone: every clone shares the same underlying
/// socket, subscriber registry, and strand thread.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<Inner>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("remote", &self.inner.remote)
            .field("link", &self.inner.link)
            .field("nonce", &self.inner.nonce)
            .finish()
    }
}

impl Channel {
    /// Wrap `stream` as a channel to `remote`, spawn its strand reader thread, and
    /// begin dispatching received messages to `subscriber`. `protocol_minimum` seeds
    /// the channel's negotiated version until the handshake updates it.
    pub fn spawn<C: Clock>(
        stream: TcpStream,
        remote: Authority,
        link: Link,
        nonce: u64,
        magic: u32,
        protocol_minimum: u32,
        clock: C,
        thread_name_prefix: &'static str,
    ) -> Result<Self, Error> {
        let socket = LockedSocket::new(stream).map_err(Error::from)?;
        let inner = Arc::new(Inner {
            nonce,
            remote,
            link,
            magic,
            socket,
            subscriber: Mutex::new(MessageSubscriber::new()),
            negotiated_version: AtomicU32::new(protocol_minimum),
            stop_requested: AtomicBool::new(false),
            stop_code: Mutex::new(None),
            last_activity: AtomicU32::new(clock.now()),
        });
        let channel = Channel { inner };

        let strand = channel.clone();
        let name = format!("{thread_name_prefix}-chan-{}", remote);
        thread::Builder::new()
            .name(name)
            .spawn(move || strand.run_strand(clock))
            .map_err(Error::from)?;

        Ok(channel)
    }

    /// Reader strand: every read and every handler invocation for this channel
    /// happens on this one thread, so subscriber callbacks never race each other.
    /// The only thing that ever locks `subscriber` to deliver the terminal stop
    /// code is this loop, after the triggering read or handler has fully returned —
    /// never `stop` itself, which a handler may call on its own channel from inside
    /// `notify`.
    fn run_strand<C: Clock>(&self, clock: C) {
        let code = loop {
            if self.is_stopped() {
                break self.take_stop_code();
            }
            match framing::read_message(&mut &self.inner.socket, self.inner.magic) {
                Ok(message) => {
                    self.inner.last_activity.store(clock.now(), Ordering::SeqCst);
                    let command = message.cmd();
                    trace!(target: "p2p", "{}: received {}", self.inner.remote, command);
                    self.inner.subscriber.lock().unwrap_or_else(|e| e.into_inner()).notify(command, &message);
                    if self.is_stopped() {
                        break self.take_stop_code();
                    }
                }
                Err(err) => {
                    // `err` may just be the side effect of our own `stop` shutting
                    // down the socket mid-read; `request_stop` only records it if
                    // no code was already pending, so the original stop reason
                    // always wins over a resulting read error.
                    self.request_stop(err);
                    break self.take_stop_code();
                }
            }
        };
        debug!(target: "p2p", "{}: channel stopped: {}", self.inner.remote, code);
        self.inner.subscriber.lock().unwrap_or_else(|e| e.into_inner()).stop(code);
    }

    fn take_stop_code(&self) -> Error {
        self.inner
            .stop_code
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or(Error::ChannelStopped)
    }

    /// Serialize and send `message`, updating the last-activity clock on success.
    pub fn send(&self, message: NetworkMessage) -> Result<(), Error> {
        if self.is_stopped() {
            return Err(Error::ChannelStopped);
        }
        let command = message.cmd();
        let frame = framing::encode_message(self.inner.magic, message);
        self.inner.socket.send(&frame)?;
        debug!(target: "p2p", "{}: sent {}", self.inner.remote, command);
        Ok(())
    }

    /// Register a handler for `command`. See [`MessageSubscriber::subscribe`].
    pub fn subscribe(
        &self,
        command: &'static str,
        handler: Box<dyn FnMut(Result<&NetworkMessage, Error>) -> bool + Send>,
    ) {
        self.inner.subscriber.lock().unwrap_or_else(|e| e.into_inner()).subscribe(command, handler);
    }

    /// Request that the channel stop: records `code`, shuts down the socket to
    /// unblock the strand thread's read, and returns immediately. The strand
    /// delivers `code` to every subscriber and tears the channel down on its own
    /// thread shortly after — safe to call from inside a message handler, a timer
    /// thread, or a session thread alike.
    pub fn stop(&self, code: Error) {
        self.request_stop(code);
        self.inner.socket.shutdown();
    }

    fn request_stop(&self, code: Error) {
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.inner.stop_code.lock().unwrap_or_else(|e| e.into_inner()) = Some(code);
    }

    /// `true` once [`Channel::stop`] has been called, even if the strand has not
    /// yet finished delivering the stop code to every subscriber.
    pub fn is_stopped(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst)
    }

    /// Nonce sent in this channel's own `version` message, used to detect
    /// self-connections via [`crate::pending::PendingChannels`].
    pub fn nonce(&self) -> u64 {
        self.inner.nonce
    }

    /// The peer's endpoint.
    pub fn remote(&self) -> Authority {
        self.inner.remote
    }

    /// Which side opened this connection.
    pub fn link(&self) -> Link {
        self.inner.link
    }

    /// The protocol version negotiated during the handshake (or `protocol_minimum`
    /// before it completes).
    pub fn negotiated_version(&self) -> u32 {
        self.inner.negotiated_version.load(Ordering::SeqCst)
    }

    /// Record the version negotiated for this channel.
    pub fn set_negotiated_version(&self, version: u32) {
        self.inner.negotiated_version.store(version, Ordering::SeqCst);
    }

    /// Unix timestamp of the last successful read or write on this channel.
    pub fn last_activity(&self) -> u32 {
        self.inner.last_activity.load(Ordering::SeqCst)
    }

    /// Record outbound activity (a send) against the inactivity clock.
    pub fn touch<C: Clock>(&self, clock: &C) {
        self.inner.last_activity.store(clock.now(), Ordering::SeqCst);
    }
}

/// A globally-unique-enough nonce for a new channel's `version` message and
/// self-connection detection.
pub fn random_nonce() -> u64 {
    let high = fastrand::u32(..) as u64;
    let low = fastrand::u32(..) as u64;
    (high << 32) | low
}
