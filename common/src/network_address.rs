//! The wire representation of a peer address, as carried inside `version` and `addr`
//! messages.
use bitcoin::network::address::Address as BitcoinAddress;
use bitcoin::network::constants::ServiceFlags;

/// A peer address as it appears on the wire: a last-seen timestamp, a service-flags
/// bitmask, a 16-byte (IPv6-mapped) address, and a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkAddress {
    /// Seconds since the epoch this address was last seen active. `0` if unknown.
    pub timestamp: u32,
    /// Services advertised for this peer. When *we* are the subject of the address
    /// (e.g. the `address_receiver` field of our own `version`), this is always zero.
    pub services: u64,
    /// 16-byte IPv6 (or IPv4-mapped) address.
    pub ip: [u8; 16],
    /// Port, host byte order.
    pub port: u16,
}

impl NetworkAddress {
    /// Construct a `NetworkAddress` with no timestamp and no services.
    pub fn new(services: u64, ip: [u8; 16], port: u16) -> Self {
        Self { timestamp: 0, services, ip, port }
    }

    /// The IP bytes.
    pub fn ip(&self) -> [u8; 16] {
        self.ip
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Attach a timestamp, returning a new value (the type is otherwise immutable).
    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach services, returning a new value.
    pub fn with_services(mut self, services: ServiceFlags) -> Self {
        self.services = services.to_u64();
        self
    }
}

impl From<NetworkAddress> for BitcoinAddress {
    fn from(addr: NetworkAddress) -> Self {
        BitcoinAddress::new(
            &std::net::SocketAddr::new(std::net::Ipv6Addr::from(addr.ip).into(), addr.port),
            ServiceFlags::from(addr.services),
        )
    }
}

impl TryFrom<BitcoinAddress> for NetworkAddress {
    type Error = std::io::Error;

    fn try_from(addr: BitcoinAddress) -> Result<Self, Self::Error> {
        let socket = addr.socket_addr()?;
        let ip = match socket.ip() {
            std::net::IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            std::net::IpAddr::V6(v6) => v6.octets(),
        };
        Ok(Self { timestamp: 0, services: addr.services.to_u64(), ip, port: socket.port() })
    }
}
