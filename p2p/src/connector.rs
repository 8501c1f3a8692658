//! Outbound dialing: turns an [`Authority`] into a connected [`TcpStream`] within a
//! bounded timeout.
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use log::debug;

use bn_common::error::Error;
use bn_common::Authority;

/// Dial `remote`, failing with [`Error::ChannelTimeout`] if the connection does not
/// complete within `timeout`.
pub fn connect(remote: Authority, timeout: Duration) -> Result<TcpStream, Error> {
    let addr: SocketAddr = remote.into();
    debug!(target: "p2p", "connecting to {}", remote);
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|err| {
        if err.kind() == std::io::ErrorKind::TimedOut {
            Error::ChannelTimeout("connect")
        } else {
            Error::from(err)
        }
    })?;
    stream.set_nodelay(true).map_err(Error::from)?;
    Ok(stream)
}
