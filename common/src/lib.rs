//! Shared types for the `bn` peer-to-peer networking crates.
#![warn(missing_docs)]

pub mod authority;
pub mod clock;
pub mod config;
pub mod error;
pub mod network_address;
pub mod services;

pub use authority::Authority;
pub use clock::{Clock, SystemClock};
pub use config::{Config, Limits};
pub use error::Error;
pub use network_address::NetworkAddress;

/// Re-exported so downstream crates don't need a direct `bitcoin` dependency just to
/// name a service-flag constant.
pub use bitcoin;
