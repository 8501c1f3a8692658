//! An owning wrapper over a [`TcpStream`] that serializes writers and exposes a
//! cloneable reader for the channel's strand thread.
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Mutex;
use std::time::Duration;

use bn_common::error::Error;

/// A `TcpStream` whose writer half is `Mutex`-guarded so concurrent `send` calls from
/// different threads serialize instead of interleaving their bytes on the wire. The
/// reader half is only ever touched by the channel's own strand thread, so it needs
/// no lock.
pub struct LockedSocket {
    reader: TcpStream,
    writer: Mutex<TcpStream>,
}

impl LockedSocket {
    /// Wrap `stream`. `stream.try_clone` gives the writer half its own file
    /// descriptor so reads and writes never contend on the same handle.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let writer = stream.try_clone()?;
        Ok(Self { reader: stream, writer: Mutex::new(writer) })
    }

    /// Write `frame` to the socket, holding the writer lock for the duration of the
    /// call so frames from concurrent senders never interleave.
    pub fn send(&self, frame: &[u8]) -> Result<(), Error> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_all(frame).map_err(Error::from)?;
        writer.flush().map_err(Error::from)
    }

    /// Set the read timeout applied to the strand thread's blocking reads.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.reader.set_read_timeout(timeout)
    }

    /// Shut down both directions of the socket, unblocking any thread parked in a
    /// read or write on it.
    pub fn shutdown(&self) {
        let _ = self.reader.shutdown(Shutdown::Both);
    }

    /// Peer address of the underlying socket.
    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.reader.peer_addr()
    }
}

impl Read for &LockedSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.reader).read(buf)
    }
}
