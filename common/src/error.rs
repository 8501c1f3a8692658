//! The error taxonomy shared by every layer of the core: channel, session, and P2P.
use std::io;

use thiserror::Error;

/// A single error kind shared across the core. Distinct variants, not distinct types,
/// so that a channel stop code and a session failure and a P2P start failure can all
/// be compared and logged uniformly.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The owning channel, session, or the whole P2P instance was asked to stop while
    /// this operation was in flight.
    #[error("service stopped")]
    ServiceStopped,
    /// A generic operation failure not covered by a more specific variant.
    #[error("operation failed: {0}")]
    OperationFailed(String),
    /// Resolving a hostname to endpoints failed.
    #[error("resolve failed: {0}")]
    ResolveFailed(String),
    /// The network is unreachable.
    #[error("network unreachable")]
    NetworkUnreachable,
    /// The local bind address is already in use.
    #[error("address in use")]
    AddressInUse,
    /// An inbound connection was rejected.
    #[error("accept failed: {0}")]
    AcceptFailed(&'static str),
    /// A frame failed to parse or validate (bad checksum, truncated payload, ...).
    #[error("bad stream: {0}")]
    BadStream(&'static str),
    /// A channel timer expired (handshake, heartbeat, expiration, inactivity).
    #[error("channel timeout: {0}")]
    ChannelTimeout(&'static str),
    /// The channel is already stopped.
    #[error("channel stopped")]
    ChannelStopped,
    /// A transport-level I/O error.
    #[error("channel transport error: {0}")]
    ChannelTransport(String),
    /// A frame with the wrong magic was received.
    #[error("bad magic: expected {expected:#x}, got {actual:#x}")]
    ChannelBadMagic {
        /// The configured wire magic.
        expected: u32,
        /// The magic actually read off the wire.
        actual: u32,
    },
    /// A frame declared a payload larger than the configured cap.
    #[error("oversize frame: {0} bytes")]
    ChannelOversize(u32),
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,
    /// A filesystem operation (loading or saving the hosts file) failed.
    #[error("filesystem error: {0}")]
    FileSystem(String),
    /// `session_seed` finished without populating the hosts pool.
    #[error("seeding was unsuccessful")]
    SeedingUnsuccessful,
    /// An authority string failed to parse.
    #[error("invalid authority: {0}")]
    InvalidAuthority(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::AddrInUse => Error::AddressInUse,
            io::ErrorKind::TimedOut => Error::ChannelTimeout("i/o"),
            _ => Error::ChannelTransport(err.to_string()),
        }
    }
}
