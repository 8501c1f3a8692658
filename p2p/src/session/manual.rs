//! Keeps every `Config::peers` entry connected, retrying on failure up to
//! `Config::manual_attempt_limit` times (or forever, if unset).
use std::sync::Arc;
use std::thread;

use log::warn;

use bn_common::clock::Clock;

use crate::chain::ChainView;
use crate::session::SessionContext;

/// Maintain the connection to a single manually configured peer for the lifetime of
/// the session.
fn maintain<C: Clock, T: ChainView + 'static>(ctx: &SessionContext<C, T>, peer: bn_common::Authority) {
    let mut attempts: u32 = 0;
    while !ctx.is_stopped() {
        ctx.connections.reap();
        if ctx.connections.contains(&peer) {
            thread::sleep(ctx.config.channel_poll);
            continue;
        }
        if let Some(limit) = ctx.config.manual_attempt_limit {
            if attempts >= limit {
                warn!(target: "p2p", "manual peer {}: attempt limit reached", peer);
                return;
            }
        }
        attempts += 1;
        match super::dial_and_handshake(ctx, peer) {
            Ok(channel) => {
                attempts = 0;
                if let Some(previous) = ctx.connections.insert(channel) {
                    previous.stop(bn_common::error::Error::ServiceStopped);
                }
            }
            Err(err) => {
                warn!(target: "p2p", "manual peer {}: {}", peer, err);
                thread::sleep(ctx.config.connect_timeout);
            }
        }
    }
}

/// Spawn one maintenance thread per `Config::peers` entry.
pub fn spawn<C: Clock, T: ChainView + 'static>(ctx: Arc<SessionContext<C, T>>) -> Vec<thread::JoinHandle<()>> {
    ctx.config
        .peers
        .clone()
        .into_iter()
        .map(|peer| {
            let ctx = ctx.clone();
            let name = format!("{}-manual-{}", ctx.config.threads, peer);
            thread::Builder::new()
                .name(name)
                .spawn(move || maintain(&ctx, peer))
                .expect("failed to spawn manual session thread")
        })
        .collect()
}
