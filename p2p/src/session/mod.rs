//! The four ways a channel comes into existence: seeding, manual peers, outbound
//! dialing, and the inbound listener. Each runs on its own thread(s) and shares the
//! same context.
pub mod inbound;
pub mod manual;
pub mod outbound;
pub mod seed;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bn_common::clock::Clock;
use bn_common::config::Config;

use crate::chain::ChainView;
use crate::connections::Connections;
use crate::hosts::Hosts;
use crate::pending::{PendingChannels, PendingSockets};

/// Everything a session needs: configuration, shared state, and the stop flag every
/// session thread polls.
pub struct SessionContext<C: Clock, T: ChainView> {
    /// Immutable run configuration.
    pub config: Arc<Config>,
    /// Wall-clock source.
    pub clock: C,
    /// Chain-height capability for the handshake.
    pub chain: Arc<T>,
    /// The persisted candidate-address pool.
    pub hosts: Arc<Mutex<Hosts>>,
    /// Live, handshaken channels.
    pub connections: Arc<Connections>,
    /// Channels mid-handshake.
    pub pending_channels: Arc<PendingChannels>,
    /// Dial attempts in flight.
    pub pending_sockets: Arc<PendingSockets>,
    /// Set once [`crate::p2p::P2p::stop`] is called; every session thread polls this
    /// on its own schedule and exits when it flips.
    pub stopped: AtomicBool,
}

impl<C: Clock, T: ChainView> SessionContext<C, T> {
    /// `true` once the owning [`crate::p2p::P2p`] has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

use std::sync::mpsc;

use bn_common::error::Error;
use bn_common::Authority;

use crate::channel::{Channel, Link};
use crate::protocol::{address, ping, version};

/// Dial `remote`, spawn its channel, attach the version handshake and (once it
/// completes) the ping and address protocols, and block until the handshake
/// finishes or `ctx.config.channel_handshake` elapses.
pub fn dial_and_handshake<C: Clock, T: ChainView + 'static>(
    ctx: &SessionContext<C, T>,
    remote: Authority,
) -> Result<Channel, Error> {
    let stream = crate::connector::connect(remote, ctx.config.connect_timeout)?;
    establish(ctx, stream, remote, Link::Outbound)
}

/// Wrap an already-accepted `stream` the same way [`dial_and_handshake`] wraps a
/// dialed one.
pub fn accept_and_handshake<C: Clock, T: ChainView + 'static>(
    ctx: &SessionContext<C, T>,
    stream: std::net::TcpStream,
    remote: Authority,
) -> Result<Channel, Error> {
    establish(ctx, stream, remote, Link::Inbound)
}

fn establish<C: Clock, T: ChainView + 'static>(
    ctx: &SessionContext<C, T>,
    stream: std::net::TcpStream,
    remote: Authority,
    link: Link,
) -> Result<Channel, Error> {
    let nonce = crate::channel::random_nonce();
    let channel = Channel::spawn(
        stream,
        remote,
        link,
        nonce,
        ctx.config.identifier,
        ctx.config.protocol_minimum,
        ctx.clock.clone(),
        ctx.config.threads,
    )?;

    let (tx, rx) = mpsc::channel();
    version::attach(
        channel.clone(),
        ctx.config.clone(),
        ctx.clock.clone(),
        ctx.chain.clone(),
        ctx.pending_channels.clone(),
        move |_channel, result| {
            let _ = tx.send(result);
        },
    );

    match rx.recv_timeout(ctx.config.channel_handshake) {
        Ok(Ok(())) => {
            ping::attach(channel.clone(), ctx.config.channel_heartbeat);
            address::attach(channel.clone(), ctx.hosts.clone(), ctx.clock.clone());
            Ok(channel)
        }
        Ok(Err(err)) => Err(err),
        Err(_) => {
            channel.stop(Error::ChannelTimeout("handshake"));
            Err(Error::ChannelTimeout("handshake"))
        }
    }
}
