//! `bn`: a peer-to-peer networking core for the Bitcoin protocol.
//!
//! This crate is a thin aggregator over the workspace's two real crates,
//! [`bn_common`] (shared types: addresses, configuration, the error taxonomy) and
//! [`bn_p2p`] (channels, protocols, and sessions). Block and transaction validation
//! are out of scope; embed this crate alongside whatever chain engine supplies a
//! [`bn_p2p::ChainView`].
#![warn(missing_docs)]

#[cfg(feature = "bn-common")]
pub use bn_common as common;

#[cfg(feature = "bn-p2p")]
pub use bn_p2p as p2p;
