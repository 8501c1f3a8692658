//! Seed bootstrapping: connect to every configured seed concurrently, ask each for
//! `addr`, and fold whatever comes back into the hosts pool within one germination
//! window shared across all of them.
use std::sync::Arc;
use std::thread;

use log::{info, warn};

use bn_common::clock::Clock;
use bn_common::error::Error;

use crate::chain::ChainView;
use crate::channel::Channel;
use crate::session::SessionContext;

/// Run seeding to completion: dial every configured seed at once, request addresses,
/// wait out a single [`bn_common::Config::channel_germination`] window, then stop
/// every seed channel. Returns [`Error::SeedingUnsuccessful`] if the pool is still
/// empty afterward.
pub fn run<C: Clock, T: ChainView + 'static>(ctx: &SessionContext<C, T>) -> Result<(), Error> {
    if ctx.is_stopped() {
        return Err(Error::ServiceStopped);
    }

    let seeds = ctx.config.seeds.clone();
    let channels: Vec<Channel> = thread::scope(|scope| {
        let handles: Vec<_> = seeds
            .into_iter()
            .map(|seed| {
                scope.spawn(move || match super::dial_and_handshake(ctx, seed) {
                    Ok(channel) => {
                        let _ = channel.send(bitcoin::network::message::NetworkMessage::GetAddr);
                        Some(channel)
                    }
                    Err(err) => {
                        warn!(target: "p2p", "seed {}: {}", seed, err);
                        None
                    }
                })
            })
            .collect();
        handles.into_iter().filter_map(|handle| handle.join().ok().flatten()).collect()
    });

    thread::sleep(ctx.config.channel_germination);
    for channel in channels {
        channel.stop(Error::ServiceStopped);
    }

    let count = ctx.hosts.lock().unwrap_or_else(|e| e.into_inner()).count();
    if count == 0 {
        return Err(Error::SeedingUnsuccessful);
    }
    info!(target: "p2p", "seeding complete: {} candidate addresses", count);
    Ok(())
}

/// Spawn [`run`] on its own thread, logging (rather than propagating) its result.
pub fn spawn<C: Clock, T: ChainView + 'static>(ctx: Arc<SessionContext<C, T>>) -> thread::JoinHandle<()> {
    let name = format!("{}-seed", ctx.config.threads);
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            if let Err(err) = run(&ctx) {
                warn!(target: "p2p", "seeding failed: {}", err);
            }
        })
        .expect("failed to spawn seed session thread")
}
