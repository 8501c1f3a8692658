//! The version/verack handshake. Attached to every channel before any other
//! protocol, and the gate every other protocol's messages wait behind.
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bitcoin::network::address::Address as BitcoinAddress;
use bitcoin::network::message::NetworkMessage;
use bitcoin::network::message_network::{Reject, RejectReason, VersionMessage};
use log::{debug, warn};

use bn_common::clock::Clock;
use bn_common::config::Config;
use bn_common::error::Error;

use crate::chain::ChainView;
use crate::channel::{Channel, Link};
use crate::pending::PendingChannels;

/// The lowest protocol version at which a ping carries a nonce the pong must echo.
pub const PING_NONCE_VERSION: u32 = 60001;

/// The lowest protocol version, on both ends, at which the post-handshake protocol
/// suite upgrades to its richer profile (timestamped `addr`, `sendheaders`-era
/// niceties). Below this on either side, the handshake still completes but later
/// protocols stay on their plain/31402-era behavior.
pub const RICH_PROFILE_VERSION: u32 = 70002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitingVersion,
    AwaitingVerack,
    Done,
}

struct Shared<F> {
    state: Mutex<State>,
    on_complete: Mutex<Option<F>>,
}

impl<F: FnMut(&Channel, Result<(), Error>) + Send + 'static> Shared<F> {
    fn complete(self: &Arc<Self>, channel: &Channel, result: Result<(), Error>) {
        if let Some(mut callback) = self.on_complete.lock().unwrap_or_else(|e| e.into_inner()).take() {
            *self.state.lock().unwrap_or_else(|e| e.into_inner()) = State::Done;
            callback(channel, result);
        }
    }
}

/// Attach the handshake to `channel`. `on_complete` is invoked exactly once, from
/// the channel's strand thread, with the handshake's outcome. Outbound channels
/// send their `version` immediately; inbound channels wait for the peer's.
pub fn attach<C, T, F>(
    channel: Channel,
    config: Arc<Config>,
    clock: C,
    chain: Arc<T>,
    pending: Arc<PendingChannels>,
    on_complete: F,
) where
    C: Clock,
    T: ChainView + 'static,
    F: FnMut(&Channel, Result<(), Error>) + Send + 'static,
{
    let shared = Arc::new(Shared {
        state: Mutex::new(State::AwaitingVersion),
        on_complete: Mutex::new(Some(on_complete)),
    });

    pending.insert(channel.clone());

    if channel.link() == Link::Outbound {
        send_version(&channel, &config, &clock, chain.as_ref());
    }

    {
        let shared = shared.clone();
        let channel = channel.clone();
        let config = config.clone();
        let clock = clock.clone();
        let chain = chain.clone();
        let pending = pending.clone();
        channel.subscribe(
            "version",
            Box::new(move |delivery| {
                let version = match delivery {
                    Err(code) => {
                        shared.complete(&channel, Err(code));
                        return false;
                    }
                    Ok(NetworkMessage::Version(version)) => version,
                    Ok(_) => return true,
                };

                let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
                if *state != State::AwaitingVersion {
                    return true;
                }

                if pending.is_self_connection(version.nonce) {
                    drop(state);
                    warn!(target: "p2p", "{}: rejecting self connection", channel.remote());
                    let err = Error::AcceptFailed("self connection");
                    channel.stop(err.clone());
                    shared.complete(&channel, Err(err));
                    return false;
                }
                if version.version < config.protocol_minimum {
                    drop(state);
                    send_reject(&channel, "insufficient-version");
                    let err = Error::OperationFailed(format!(
                        "peer protocol version {} below minimum {}",
                        version.version, config.protocol_minimum
                    ));
                    channel.stop(err.clone());
                    shared.complete(&channel, Err(err));
                    return false;
                }
                if (version.services & config.minimum_services) != config.minimum_services {
                    drop(state);
                    send_reject(&channel, "insufficient-services");
                    let err = Error::OperationFailed("peer missing required services".to_string());
                    channel.stop(err.clone());
                    shared.complete(&channel, Err(err));
                    return false;
                }

                let negotiated = version.version.min(config.protocol_maximum);
                channel.set_negotiated_version(negotiated);
                debug!(target: "p2p", "{}: version {} (user agent {})", channel.remote(), version.version, version.user_agent);

                if channel.link() == Link::Inbound {
                    send_version(&channel, &config, &clock, chain.as_ref());
                }
                let _ = channel.send(NetworkMessage::Verack);

                *state = State::AwaitingVerack;
                true
            }),
        );
    }

    {
        let shared = shared.clone();
        let channel = channel.clone();
        let pending = pending.clone();
        channel.subscribe(
            "verack",
            Box::new(move |delivery| {
                match delivery {
                    Err(code) => {
                        shared.complete(&channel, Err(code));
                        return false;
                    }
                    Ok(NetworkMessage::Verack) => {}
                    Ok(_) => return true,
                }

                let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
                if *state != State::AwaitingVerack {
                    return true;
                }
                *state = State::Done;
                drop(state);

                pending.remove(channel.nonce());
                shared.complete(&channel, Ok(()));
                false
            }),
        );
    }
}

/// Best-effort: send a BIP61 `reject{message="version", code=obsolete, reason}`
/// ahead of stopping the channel. Not delivery-awaited — the channel is going away
/// either way.
fn send_reject(channel: &Channel, reason: &'static str) {
    let reject = Reject {
        message: Cow::Borrowed("version"),
        ccode: RejectReason::Obsolete,
        reason: Cow::Borrowed(reason),
        hash: Default::default(),
    };
    let _ = channel.send(NetworkMessage::Reject(reject));
}

fn send_version<C: Clock>(channel: &Channel, config: &Config, clock: &C, chain: &dyn ChainView) {
    let peer: SocketAddr = channel.remote().into();
    let local: SocketAddr = config.self_authority.into();

    let message = VersionMessage {
        version: config.protocol_maximum,
        services: config.services,
        timestamp: clock.now() as i64,
        receiver: BitcoinAddress::new(&peer, bitcoin::network::constants::ServiceFlags::NONE),
        sender: BitcoinAddress::new(&local, config.services),
        nonce: channel.nonce(),
        user_agent: config.user_agent.to_string(),
        start_height: chain.height() as i32,
        relay: config.relay,
    };
    let _ = channel.send(NetworkMessage::Version(message));
}
