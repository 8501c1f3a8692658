//! The inbound listener: binds once, then hands accepted sockets to the caller one
//! at a time.
use std::net::{SocketAddr, TcpListener, TcpStream};

use log::info;

use bn_common::error::Error;
use bn_common::Authority;

/// Owns the bound listening socket for inbound connections.
pub struct Acceptor {
    listener: TcpListener,
}

impl Acceptor {
    /// Bind a listener at `bind` (typically `Config::self_authority` with
    /// `Config::inbound_port`).
    pub fn bind(bind: SocketAddr) -> Result<Self, Error> {
        let listener = TcpListener::bind(bind).map_err(Error::from)?;
        info!(target: "p2p", "listening on {}", bind);
        Ok(Self { listener })
    }

    /// Block until a peer connects, returning its stream and endpoint.
    pub fn accept(&self) -> Result<(TcpStream, Authority), Error> {
        let (stream, addr) = self.listener.accept().map_err(Error::from)?;
        Ok((stream, Authority::from(addr)))
    }

    /// Non-blocking accept: `Ok(None)` means no connection was waiting, letting the
    /// caller poll a stop flag between attempts instead of blocking forever on a
    /// quiet listener. Requires [`Acceptor::set_nonblocking`] to have been set.
    pub fn try_accept(&self) -> Result<Option<(TcpStream, Authority)>, Error> {
        match self.listener.accept() {
            Ok((stream, addr)) => Ok(Some((stream, Authority::from(addr)))),
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(Error::from(err)),
        }
    }

    /// Toggle non-blocking mode so a caller can poll `accept` against a stop flag
    /// instead of blocking forever on a quiet listener.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<(), Error> {
        self.listener.set_nonblocking(nonblocking).map_err(Error::from)
    }

    /// The address actually bound (useful when `bind`'s port was `0`).
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        self.listener.local_addr().map_err(Error::from)
    }
}
