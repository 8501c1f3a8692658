//! Peer service flags. A thin re-export point so the rest of the core doesn't need to
//! know the flags live in the `bitcoin` crate.
pub use bitcoin::network::constants::ServiceFlags;
