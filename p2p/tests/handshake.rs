//! End-to-end exercise of the channel + version handshake against a raw TCP peer
//! that speaks the wire protocol by hand, the way the teacher's own
//! connection-level tests drive a bare socket against the real state machine.
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use bitcoin::network::address::Address as BitcoinAddress;
use bitcoin::network::constants::ServiceFlags;
use bitcoin::network::message::NetworkMessage;
use bitcoin::network::message_network::VersionMessage;

use bn_common::clock::{Clock, SystemClock};
use bn_common::config::Config;
use bn_common::Authority;
use bn_p2p::chain::StaticChainView;
use bn_p2p::channel::{Channel, Link};
use bn_p2p::framing;
use bn_p2p::pending::PendingChannels;
use bn_p2p::protocol::version;

const MAGIC: u32 = 0xD9B4_BEF9;

fn peer_version(version: u32, nonce: u64, height: i32) -> NetworkMessage {
    let addr: std::net::SocketAddr = (Ipv4Addr::LOCALHOST, 0).into();
    NetworkMessage::Version(VersionMessage {
        version,
        services: ServiceFlags::NONE,
        timestamp: 0,
        receiver: BitcoinAddress::new(&addr, ServiceFlags::NONE),
        sender: BitcoinAddress::new(&addr, ServiceFlags::NONE),
        nonce,
        user_agent: "/raw-peer:0.0/".to_string(),
        start_height: height,
        relay: false,
    })
}

#[test]
fn handshake_completes_against_a_well_behaved_peer() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let version = framing::read_message(&mut stream, MAGIC).unwrap();
        assert!(matches!(version, NetworkMessage::Version(_)));

        let frame = framing::encode_message(MAGIC, peer_version(70015, 999, 42));
        framing::write_frame(&mut stream, &frame).unwrap();

        let verack = framing::read_message(&mut stream, MAGIC).unwrap();
        assert!(matches!(verack, NetworkMessage::Verack));

        let frame = framing::encode_message(MAGIC, NetworkMessage::Verack);
        framing::write_frame(&mut stream, &frame).unwrap();
    });

    let stream = TcpStream::connect(addr).unwrap();
    let remote = Authority::from(addr);
    let config = Arc::new(Config { identifier: MAGIC, ..Config::default() });
    let chain = Arc::new(StaticChainView::new(7));
    let pending = Arc::new(PendingChannels::new());

    let channel = Channel::spawn(
        stream,
        remote,
        Link::Outbound,
        bn_p2p::channel::random_nonce(),
        MAGIC,
        config.protocol_minimum,
        SystemClock,
        "test",
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    version::attach(channel.clone(), config, SystemClock, chain, pending, move |_channel, result| {
        let _ = tx.send(result);
    });

    let result = rx.recv_timeout(Duration::from_secs(5)).expect("handshake did not complete");
    assert!(result.is_ok(), "handshake failed: {:?}", result);
    assert_eq!(channel.negotiated_version(), 70015);

    server.join().unwrap();
}

#[test]
fn handshake_rejects_version_below_minimum() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _version = framing::read_message(&mut stream, MAGIC).unwrap();
        let frame = framing::encode_message(MAGIC, peer_version(31402, 1, 0));
        framing::write_frame(&mut stream, &frame).unwrap();
        // Peer never sends verack; the old-version rejection should happen first.
        std::thread::sleep(Duration::from_millis(200));
    });

    let stream = TcpStream::connect(addr).unwrap();
    let remote = Authority::from(addr);
    let mut config = Config::default();
    config.identifier = MAGIC;
    config.protocol_minimum = 70015;
    let config = Arc::new(config);
    let chain = Arc::new(StaticChainView::new(0));
    let pending = Arc::new(PendingChannels::new());

    let channel = Channel::spawn(
        stream,
        remote,
        Link::Outbound,
        bn_p2p::channel::random_nonce(),
        MAGIC,
        config.protocol_minimum,
        SystemClock,
        "test",
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    version::attach(channel.clone(), config, SystemClock, chain, pending, move |_channel, result| {
        let _ = tx.send(result);
    });

    let result = rx.recv_timeout(Duration::from_secs(5)).expect("handshake did not complete");
    assert!(result.is_err());

    let _ = server.join();
}
