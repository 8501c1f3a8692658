//! Root configuration. Parsing config files or CLI flags into this struct is out of
//! scope for the core — only the resulting struct is consumed.
use std::path::PathBuf;
use std::time::Duration;

use crate::authority::Authority;
use crate::services::ServiceFlags;

/// Connection-count ceilings, split out from [`Config`] the way the teacher's
/// `nakamoto_p2p::fsm::Limits` is split from its `Config`.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Target number of simultaneous outbound connections.
    pub outbound_connections: usize,
    /// Maximum number of simultaneous inbound connections. `0` disables the listener.
    pub inbound_connections: usize,
    /// Maximum entries kept in the hosts pool.
    pub host_pool_capacity: usize,
    /// How many outbound sockets a single outbound slot dials concurrently before
    /// picking the first to complete the handshake.
    pub connect_batch_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            outbound_connections: 8,
            inbound_connections: 117,
            host_pool_capacity: 4096,
            connect_batch_size: 3,
        }
    }
}

/// The root configuration threaded through `P2p` → `Session` → `Protocol`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Naming prefix for diagnostic thread names (e.g. `"bn"` gives `bn-chan-1234`).
    pub threads: &'static str,
    /// Wire protocol magic (the first four bytes of every frame header).
    pub identifier: u32,
    /// Port the inbound listener binds, if enabled.
    pub inbound_port: u16,
    /// Connection-count ceilings.
    pub limits: Limits,
    /// How many times `session_manual` retries a given endpoint before giving up.
    /// `None` means retry forever.
    pub manual_attempt_limit: Option<u32>,
    /// Timeout for a single outbound connect attempt.
    pub connect_timeout: Duration,
    /// Deadline for the version/verack handshake.
    pub channel_handshake: Duration,
    /// How long `session_seed` waits for `addr` replies before stopping seed channels.
    pub channel_germination: Duration,
    /// Period of the ping heartbeat.
    pub channel_heartbeat: Duration,
    /// Inactivity timeout: no traffic of any kind for this long stops the channel.
    pub channel_inactivity: Duration,
    /// Hard lifetime cap on a channel, reset by traffic.
    pub channel_expiration: Duration,
    /// Polling granularity used by the timer threads.
    pub channel_poll: Duration,
    /// Path to the persisted hosts file.
    pub hosts_file: PathBuf,
    /// Lowest protocol version this node will accept from a peer.
    pub protocol_minimum: u32,
    /// Highest protocol version this node advertises.
    pub protocol_maximum: u32,
    /// Services this node advertises in its own `version` message.
    pub services: ServiceFlags,
    /// Services required of a peer for the handshake to succeed.
    pub minimum_services: ServiceFlags,
    /// Value sent in the 70001+ `version.relay` field.
    pub relay: bool,
    /// `version.user_agent`.
    pub user_agent: &'static str,
    /// The address this node advertises as its own (`version.address_sender`).
    pub self_authority: Authority,
    /// Seed endpoints contacted by `session_seed`.
    pub seeds: Vec<Authority>,
    /// Manually configured peers kept connected by `session_manual`.
    pub peers: Vec<Authority>,
    /// Authorities never accepted or dialed.
    pub blacklist: Vec<Authority>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: "bn",
            identifier: 0xD9B4_BEF9, // mainnet magic
            inbound_port: 8333,
            limits: Limits::default(),
            manual_attempt_limit: None,
            connect_timeout: Duration::from_secs(5),
            channel_handshake: Duration::from_secs(10),
            channel_germination: Duration::from_secs(30),
            channel_heartbeat: Duration::from_secs(120),
            channel_inactivity: Duration::from_secs(60 * 20),
            channel_expiration: Duration::from_secs(60 * 60 * 24),
            channel_poll: Duration::from_secs(1),
            hosts_file: PathBuf::from("hosts.txt"),
            protocol_minimum: 31402,
            protocol_maximum: 70016,
            services: ServiceFlags::NONE,
            minimum_services: ServiceFlags::NONE,
            relay: false,
            user_agent: "/bn:0.1.0/",
            self_authority: Authority::from_ipv4(std::net::Ipv4Addr::UNSPECIFIED, 0),
            seeds: Vec::new(),
            peers: Vec::new(),
            blacklist: Vec::new(),
        }
    }
}

impl Config {
    /// `true` if `a` appears in the blacklist.
    pub fn is_blacklisted(&self, a: &Authority) -> bool {
        self.blacklist.contains(a)
    }

    /// Validate the protocol-version bounds configured for the handshake. Mirrors the
    /// check `protocol_version` performs on the first received `version` message.
    pub fn validate_protocol_bounds(&self, floor: u32, ceiling: u32) -> bool {
        self.protocol_minimum >= floor
            && self.protocol_maximum <= ceiling
            && self.protocol_minimum <= self.protocol_maximum
    }
}
