//! Session and protocol engine for the `bn` Bitcoin peer-to-peer core: channels,
//! their framing, the handshake/ping/address protocols, and the sessions that drive
//! connection establishment.
#![warn(missing_docs)]

pub mod acceptor;
pub mod chain;
pub mod channel;
pub mod connections;
pub mod connector;
pub mod framing;
pub mod hosts;
pub mod p2p;
pub mod pending;
pub mod protocol;
pub mod session;
pub mod socket;
pub mod subscriber;

pub use chain::ChainView;
pub use channel::{Channel, Link};
pub use connections::Connections;
pub use hosts::Hosts;
pub use p2p::P2p;
pub use subscriber::MessageSubscriber;
