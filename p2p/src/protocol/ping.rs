//! Keepalive heartbeat. Pings the peer on a fixed period; for peers that negotiated
//! BIP-31 nonces (protocol version 60001+), the echoed `pong` is checked against the
//! nonce just sent and a missing or mismatched reply stops the channel.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bitcoin::network::message::NetworkMessage;
use log::warn;

use bn_common::error::Error;

use crate::channel::Channel;
use crate::protocol::timer::ProtocolTimer;
use crate::protocol::version::PING_NONCE_VERSION;

struct State {
    awaiting: AtomicBool,
    expected_nonce: AtomicU64,
}

/// Attach the heartbeat to `channel`, pinging every `period` and stopping the
/// channel if a nonce-bearing ping (version 60001+) goes unanswered for a full
/// period.
pub fn attach(channel: Channel, period: Duration) -> ProtocolTimer {
    let state = Arc::new(State { awaiting: AtomicBool::new(false), expected_nonce: AtomicU64::new(0) });
    let timer_slot: Arc<Mutex<Option<ProtocolTimer>>> = Arc::new(Mutex::new(None));

    {
        let state = state.clone();
        let channel = channel.clone();
        let timer_slot = timer_slot.clone();
        channel.subscribe(
            "pong",
            Box::new(move |delivery| {
                let nonce = match delivery {
                    Err(_) => {
                        if let Some(timer) = timer_slot.lock().unwrap_or_else(|e| e.into_inner()).take() {
                            timer.stop();
                        }
                        return false;
                    }
                    Ok(NetworkMessage::Pong(nonce)) => *nonce,
                    Ok(_) => return true,
                };
                if !state.awaiting.load(Ordering::SeqCst) {
                    return true;
                }
                if nonce == state.expected_nonce.load(Ordering::SeqCst) {
                    state.awaiting.store(false, Ordering::SeqCst);
                } else {
                    warn!(target: "p2p", "{}: pong nonce mismatch", channel.remote());
                    channel.stop(Error::BadStream("pong nonce mismatch"));
                }
                true
            }),
        );
    }

    let timer_state = state.clone();
    let timer_channel = channel.clone();
    let timer = ProtocolTimer::spawn("bn-ping", period, true, move || {
        if timer_channel.is_stopped() {
            return;
        }
        if timer_state.awaiting.swap(false, Ordering::SeqCst) {
            warn!(target: "p2p", "{}: ping timeout", timer_channel.remote());
            timer_channel.stop(Error::ChannelTimeout("ping"));
            return;
        }
        if timer_channel.negotiated_version() >= PING_NONCE_VERSION {
            let nonce = crate::channel::random_nonce();
            timer_state.expected_nonce.store(nonce, Ordering::SeqCst);
            timer_state.awaiting.store(true, Ordering::SeqCst);
            let _ = timer_channel.send(NetworkMessage::Ping(nonce));
        } else {
            let _ = timer_channel.send(NetworkMessage::Ping(0));
        }
    });

    // Give the pong handler's stop path a handle to this same timer so a channel
    // stop tears down the heartbeat thread instead of leaving it ticking forever.
    *timer_slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(timer.clone());
    timer
}
