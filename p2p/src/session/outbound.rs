//! Keeps the outbound connection count at `Limits::outbound_connections` by
//! sampling the hosts pool and racing `connect_batch_size` candidates per empty slot
//! — the first to complete its handshake wins the slot, the rest are stopped.
use std::sync::Arc;
use std::thread;

use log::{debug, warn};

use bn_common::clock::Clock;
use bn_common::error::Error;
use bn_common::Authority;

use crate::chain::ChainView;
use crate::channel::{Channel, Link};
use crate::session::SessionContext;

/// Run one scan: reap dead entries, then dial enough fresh candidate batches to bring
/// the outbound count up to the configured target.
pub fn scan<C: Clock, T: ChainView + 'static>(ctx: &SessionContext<C, T>) {
    ctx.connections.reap();

    let target = ctx.config.limits.outbound_connections;
    let current = ctx.connections.with_link(Link::Outbound).len();
    if current >= target {
        return;
    }
    let mut slots_open = target - current;

    let candidates = {
        let hosts = ctx.hosts.lock().unwrap_or_else(|e| e.into_inner());
        hosts.all()
    };
    let mut candidates = candidates
        .into_iter()
        .filter(|candidate| !ctx.config.is_blacklisted(candidate) && !ctx.connections.contains(candidate));

    let batch_size = ctx.config.limits.connect_batch_size.max(1);
    while slots_open > 0 && !ctx.is_stopped() {
        let batch: Vec<Authority> = candidates.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }
        if let Some(channel) = dial_batch(ctx, &batch) {
            debug!(target: "p2p", "outbound connected: {}", channel.remote());
            if let Some(previous) = ctx.connections.insert(channel) {
                previous.stop(Error::ServiceStopped);
            }
            slots_open -= 1;
        }
    }
}

/// Dial every candidate in `batch` concurrently; whichever completes its handshake
/// first wins, and every other successful handshake in the batch is stopped
/// immediately rather than left connected with nothing using it.
fn dial_batch<C: Clock, T: ChainView + 'static>(
    ctx: &SessionContext<C, T>,
    batch: &[Authority],
) -> Option<Channel> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::scope(|scope| {
        for &candidate in batch {
            let tx = tx.clone();
            scope.spawn(move || {
                if !ctx.pending_sockets.begin(candidate) {
                    return;
                }
                let result = super::dial_and_handshake(ctx, candidate);
                ctx.pending_sockets.end(candidate);
                match result {
                    Ok(channel) => {
                        let _ = tx.send(channel);
                    }
                    Err(err) => {
                        warn!(target: "p2p", "outbound {}: {}", candidate, err);
                        ctx.hosts.lock().unwrap_or_else(|e| e.into_inner()).remove(&candidate);
                    }
                }
            });
        }
    });
    drop(tx);

    let mut winners: Vec<Channel> = rx.try_iter().collect();
    if winners.is_empty() {
        return None;
    }
    let winner = winners.remove(0);
    for loser in winners {
        debug!(target: "p2p", "outbound {}: lost the batch race, stopping", loser.remote());
        loser.stop(Error::ServiceStopped);
    }
    Some(winner)
}

/// Spawn a thread that calls [`scan`] every `Config::channel_poll` until stopped.
pub fn spawn<C: Clock, T: ChainView + 'static>(ctx: Arc<SessionContext<C, T>>) -> thread::JoinHandle<()> {
    let name = format!("{}-outbound", ctx.config.threads);
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            while !ctx.is_stopped() {
                scan(&ctx);
                thread::sleep(ctx.config.channel_poll);
            }
        })
        .expect("failed to spawn outbound session thread")
}
