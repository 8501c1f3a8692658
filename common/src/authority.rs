//! A canonical peer endpoint: an IPv6-normalized address plus a port.
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::error::Error;
use crate::network_address::NetworkAddress;

/// A peer endpoint. The address is always stored as IPv6, with IPv4 addresses mapped
/// as `::ffff:a.b.c.d` the way the wire `NetworkAddress` does. Port `0` means
/// "unspecified" and is only ever seen on addresses we haven't connected to yet.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Authority {
    ip: Ipv6Addr,
    port: u16,
}

impl Authority {
    /// Construct an authority from an IPv6 address (already mapped if it represents
    /// an IPv4 peer) and a port.
    pub fn new(ip: Ipv6Addr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Construct an authority from an IPv4 address, mapping it to `::ffff:a.b.c.d`.
    pub fn from_ipv4(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip: ip.to_ipv6_mapped(), port }
    }

    /// The address, always in IPv6 form.
    pub fn ip(&self) -> Ipv6Addr {
        self.ip
    }

    /// The IPv4 address, if this authority maps one.
    pub fn to_ipv4(&self) -> Option<Ipv4Addr> {
        self.ip.to_ipv4_mapped()
    }

    /// The port. `0` means unspecified.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 16-byte big-endian IP representation, as used on the wire.
    pub fn ip_bytes(&self) -> [u8; 16] {
        self.ip.octets()
    }
}

impl From<SocketAddr> for Authority {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Authority::from_ipv4(*v4.ip(), v4.port()),
            SocketAddr::V6(v6) => Authority::new(*v6.ip(), v6.port()),
        }
    }
}

impl From<Authority> for SocketAddr {
    fn from(authority: Authority) -> Self {
        SocketAddr::new(authority.ip.into(), authority.port)
    }
}

impl From<Authority> for NetworkAddress {
    fn from(authority: Authority) -> Self {
        NetworkAddress::new(0, authority.ip_bytes(), authority.port)
    }
}

impl TryFrom<&NetworkAddress> for Authority {
    type Error = Error;

    fn try_from(addr: &NetworkAddress) -> Result<Self, Self::Error> {
        Ok(Authority::new(Ipv6Addr::from(addr.ip()), addr.port()))
    }
}

/// Parses `host`, `host:port`, or `[v6]:port`.
impl FromStr for Authority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAuthority(s.to_owned());

        if let Some(rest) = s.strip_prefix('[') {
            let (host, rest) = rest.split_once(']').ok_or_else(invalid)?;
            let ip: Ipv6Addr = host.parse().map_err(|_| invalid())?;
            let port = match rest.strip_prefix(':') {
                Some(port) => port.parse().map_err(|_| invalid())?,
                None if rest.is_empty() => 0,
                None => return Err(invalid()),
            };
            return Ok(Authority::new(ip, port));
        }

        // Disambiguate `host:port` from a bare IPv6 literal (which itself contains
        // colons) by trying a full socket-address parse first.
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Authority::from(addr));
        }
        if let Ok(ip) = s.parse::<Ipv6Addr>() {
            return Ok(Authority::new(ip, 0));
        }

        let (host, port) = match s.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().map_err(|_| invalid())?),
            None => (s, 0),
        };
        let ip: Ipv4Addr = host.parse().map_err(|_| invalid())?;
        Ok(Authority::from_ipv4(ip, port))
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ipv4() {
            Some(v4) if self.port != 0 => write!(f, "{}:{}", v4, self.port),
            Some(v4) => write!(f, "{}", v4),
            None if self.port != 0 => write!(f, "[{}]:{}", self.ip, self.port),
            None => write!(f, "[{}]", self.ip),
        }
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Authority({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipv4_with_port() {
        let a: Authority = "1.2.3.4:8333".parse().unwrap();
        assert_eq!(a.to_ipv4(), Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(a.port(), 8333);
        assert_eq!(a.to_string(), "1.2.3.4:8333");
    }

    #[test]
    fn parses_ipv4_without_port() {
        let a: Authority = "1.2.3.4".parse().unwrap();
        assert_eq!(a.port(), 0);
        assert_eq!(a.to_string(), "1.2.3.4");
    }

    #[test]
    fn parses_ipv6_with_brackets_and_port() {
        let a: Authority = "[2001:db8::1]:8333".parse().unwrap();
        assert_eq!(a.ip(), "2001:db8::1".parse::<Ipv6Addr>().unwrap());
        assert_eq!(a.port(), 8333);
        assert_eq!(a.to_string(), "[2001:db8::1]:8333");
    }

    #[test]
    fn parses_bare_ipv6() {
        let a: Authority = "2001:db8::1".parse().unwrap();
        assert_eq!(a.port(), 0);
    }

    #[test]
    fn rejects_bad_port() {
        assert!("1.2.3.4:99999".parse::<Authority>().is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-an-address".parse::<Authority>().is_err());
    }

    #[test]
    fn round_trips_through_text() {
        for s in ["1.2.3.4:8333", "9.9.9.9", "[2001:db8::1]:8333", "::1"] {
            let a: Authority = s.parse().unwrap();
            let b: Authority = a.to_string().parse().unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn equality_is_by_ip_and_port() {
        let a: Authority = "1.2.3.4:8333".parse().unwrap();
        let b = Authority::from_ipv4(Ipv4Addr::new(1, 2, 3, 4), 8333);
        assert_eq!(a, b);
    }
}
