//! The inbound listener loop: accept, check against the inbound cap and blacklist,
//! then hand the socket through the same handshake every other session uses.
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use bn_common::clock::Clock;

use crate::acceptor::Acceptor;
use crate::chain::ChainView;
use crate::channel::Link;
use crate::session::SessionContext;

/// Bind and run the accept loop until stopped. Returns once the listener has been
/// asked to stop or fails to bind.
pub fn run<C: Clock, T: ChainView + 'static>(ctx: &SessionContext<C, T>) {
    if ctx.config.limits.inbound_connections == 0 {
        return;
    }

    let bind = std::net::SocketAddr::V6(std::net::SocketAddrV6::new(
        ctx.config.self_authority.ip(),
        ctx.config.inbound_port,
        0,
        0,
    ));
    let acceptor = match Acceptor::bind(bind) {
        Ok(acceptor) => acceptor,
        Err(err) => {
            warn!(target: "p2p", "inbound listener: {}", err);
            return;
        }
    };
    let _ = acceptor.set_nonblocking(true);

    while !ctx.is_stopped() {
        ctx.connections.reap();
        match acceptor.try_accept() {
            Ok(Some((stream, remote))) => {
                if ctx.config.is_blacklisted(&remote) {
                    debug!(target: "p2p", "rejecting blacklisted inbound {}", remote);
                    continue;
                }
                if ctx.connections.with_link(Link::Inbound).len() >= ctx.config.limits.inbound_connections {
                    debug!(target: "p2p", "rejecting inbound {}: at capacity", remote);
                    continue;
                }
                match super::accept_and_handshake(ctx, stream, remote) {
                    Ok(channel) => {
                        info!(target: "p2p", "inbound connected: {}", remote);
                        if let Some(previous) = ctx.connections.insert(channel) {
                            previous.stop(bn_common::error::Error::ServiceStopped);
                        }
                    }
                    Err(err) => warn!(target: "p2p", "inbound {}: {}", remote, err),
                }
            }
            Ok(None) => thread::sleep(Duration::from_millis(100)),
            Err(err) => {
                warn!(target: "p2p", "accept failed: {}", err);
                thread::sleep(Duration::from_millis(100));
            }
        }
    }
}

/// Spawn [`run`] on its own thread.
pub fn spawn<C: Clock, T: ChainView + 'static>(ctx: Arc<SessionContext<C, T>>) -> thread::JoinHandle<()> {
    let name = format!("{}-inbound", ctx.config.threads);
    thread::Builder::new().name(name).spawn(move || run(&ctx)).expect("failed to spawn inbound session thread")
}
