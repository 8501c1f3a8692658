//! Gossip of peer addresses: incoming `addr` messages feed the hosts pool, and
//! `getaddr` requests are answered from it.
use std::convert::TryFrom;
use std::sync::{Arc, Mutex};

use bitcoin::network::address::Address as BitcoinAddress;
use bitcoin::network::message::NetworkMessage;
use log::{debug, warn};

use bn_common::clock::Clock;
use bn_common::network_address::NetworkAddress;
use bn_common::Authority;

use crate::channel::Channel;
use crate::hosts::Hosts;

/// A burst larger than this many `addr` entries is dropped whole rather than
/// processed — Bitcoin Core's own anti-spam cap (BIP appendix: `MAX_ADDR_TO_SEND`).
pub const MAX_ADDR_PER_MESSAGE: usize = 1000;

/// The lowest protocol version at which we ask a peer for addresses after the
/// handshake completes.
const MIN_GETADDR_VERSION: u32 = 31402;

/// Attach `addr`/`getaddr` handling to `channel`, backed by the shared `hosts` pool,
/// and request the peer's own address list if the negotiated version supports it.
pub fn attach<C: Clock>(channel: Channel, hosts: Arc<Mutex<Hosts>>, clock: C) {
    {
        let hosts = hosts.clone();
        let channel = channel.clone();
        channel.subscribe(
            "addr",
            Box::new(move |delivery| {
                let entries = match delivery {
                    Err(_) => return false,
                    Ok(NetworkMessage::Addr(entries)) => entries,
                    Ok(_) => return true,
                };
                if entries.len() > MAX_ADDR_PER_MESSAGE {
                    warn!(
                        target: "p2p",
                        "{}: addr burst of {} entries dropped (cap {})",
                        channel.remote(),
                        entries.len(),
                        MAX_ADDR_PER_MESSAGE
                    );
                    return true;
                }
                let mut pool = hosts.lock().unwrap_or_else(|e| e.into_inner());
                for (timestamp, address) in entries.iter() {
                    if let Ok(network_address) = NetworkAddress::try_from(address.clone()) {
                        if let Ok(authority) = Authority::try_from(&network_address) {
                            pool.insert(authority, *timestamp);
                        }
                    }
                }
                debug!(target: "p2p", "{}: merged {} addr entries", channel.remote(), entries.len());
                true
            }),
        );
    }

    {
        let hosts = hosts.clone();
        let channel = channel.clone();
        channel.subscribe(
            "getaddr",
            Box::new(move |delivery| {
                match delivery {
                    Err(_) => return false,
                    Ok(NetworkMessage::GetAddr) => {}
                    Ok(_) => return true,
                }
                let pool = hosts.lock().unwrap_or_else(|e| e.into_inner());
                let now = clock.now();
                let entries: Vec<(u32, BitcoinAddress)> = pool
                    .all()
                    .into_iter()
                    .take(MAX_ADDR_PER_MESSAGE)
                    .map(|authority| {
                        let network_address = NetworkAddress::from(authority).with_timestamp(now);
                        (now, BitcoinAddress::from(network_address))
                    })
                    .collect();
                drop(pool);
                let _ = channel.send(NetworkMessage::Addr(entries));
                true
            }),
        );
    }

    if channel.negotiated_version() >= MIN_GETADDR_VERSION {
        let _ = channel.send(NetworkMessage::GetAddr);
    }
}
