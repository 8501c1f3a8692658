//! A minimal node binary: wires `bn-p2p` to a fixed chain height and logs
//! connection counts. Useful for exercising the handshake and session threads
//! against real peers without a real validation engine.
use std::net::Ipv4Addr;
use std::thread;
use std::time::Duration;

use bn_common::clock::SystemClock;
use bn_common::{Authority, Config};
use bn_p2p::chain::StaticChainView;
use bn_p2p::P2p;

fn main() {
    env_logger::init();

    let mut config = Config::default();
    config.threads = "echo";
    config.seeds = std::env::args()
        .skip(1)
        .filter_map(|arg| arg.parse::<Authority>().ok())
        .collect();
    if config.seeds.is_empty() {
        config.seeds.push(Authority::from_ipv4(Ipv4Addr::LOCALHOST, 8333));
    }
    config.hosts_file = std::env::temp_dir().join("echo-node-hosts.txt");

    let node = P2p::new(config, SystemClock, StaticChainView::new(0))
        .expect("failed to build p2p core");
    node.start().expect("failed to start sessions");

    loop {
        thread::sleep(Duration::from_secs(30));
        log::info!(target: "p2p", "connections: {}", node.connection_count());
    }
}
