//! The top-level orchestrator: owns shared state, starts every session, and
//! exposes the operations embedders drive the network with.
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bitcoin::network::message::NetworkMessage;
use log::info;

use bn_common::clock::Clock;
use bn_common::config::Config;
use bn_common::error::Error;
use bn_common::Authority;

use crate::chain::ChainView;
use crate::connections::Connections;
use crate::hosts::Hosts;
use crate::pending::{PendingChannels, PendingSockets};
use crate::session::{inbound, manual, outbound, seed, SessionContext};

/// The running peer-to-peer core. Construct with [`P2p::new`], then [`P2p::start`]
/// to spawn its sessions.
pub struct P2p<C: Clock, T: ChainView> {
    ctx: Arc<SessionContext<C, T>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock, T: ChainView + 'static> P2p<C, T> {
    /// Build a new instance from `config`, loading the hosts pool from
    /// `config.hosts_file` (a missing file starts with an empty pool).
    pub fn new(config: Config, clock: C, chain: T) -> Result<Self, Error> {
        let hosts = Hosts::load(config.hosts_file.clone(), config.limits.host_pool_capacity)?;
        let batch_size = config.limits.connect_batch_size;
        let ctx = Arc::new(SessionContext {
            config: Arc::new(config),
            clock,
            chain: Arc::new(chain),
            hosts: Arc::new(Mutex::new(hosts)),
            connections: Arc::new(Connections::new()),
            pending_channels: Arc::new(PendingChannels::new()),
            pending_sockets: Arc::new(PendingSockets::new(batch_size)),
            stopped: std::sync::atomic::AtomicBool::new(false),
        });
        Ok(Self { ctx, handles: Mutex::new(Vec::new()) })
    }

    /// Start every configured session: seeding (if the pool is empty and seeds are
    /// configured), manual peers, the outbound scanner, and the inbound listener.
    pub fn start(&self) -> Result<(), Error> {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());

        let pool_count = self.ctx.hosts.lock().unwrap_or_else(|e| e.into_inner()).count();
        if pool_count < self.ctx.config.limits.host_pool_capacity && !self.ctx.config.seeds.is_empty() {
            handles.push(seed::spawn(self.ctx.clone()));
        }

        handles.extend(manual::spawn(self.ctx.clone()));
        handles.push(outbound::spawn(self.ctx.clone()));
        if self.ctx.config.limits.inbound_connections > 0 {
            handles.push(inbound::spawn(self.ctx.clone()));
        }

        info!(target: "p2p", "started with {} session threads", handles.len());
        Ok(())
    }

    /// Stop every live channel and session thread, then persist the hosts pool.
    pub fn stop(&self) -> Result<(), Error> {
        self.ctx.stopped.store(true, Ordering::SeqCst);
        for channel in self.ctx.connections.all() {
            channel.stop(Error::ServiceStopped);
        }
        for handle in self.handles.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            let _ = handle.join();
        }
        self.ctx.hosts.lock().unwrap_or_else(|e| e.into_inner()).save()
    }

    /// Dial `remote` outside of the outbound scanner's normal candidate selection,
    /// blocking until the handshake completes or times out.
    pub fn connect(&self, remote: Authority) -> Result<(), Error> {
        let channel = crate::session::dial_and_handshake(&self.ctx, remote)?;
        if let Some(previous) = self.ctx.connections.insert(channel) {
            previous.stop(Error::ServiceStopped);
        }
        Ok(())
    }

    /// Send `message` to every live channel.
    pub fn broadcast(&self, message: NetworkMessage) {
        self.ctx.connections.broadcast(message);
    }

    /// Number of live channels.
    pub fn connection_count(&self) -> usize {
        self.ctx.connections.len()
    }

    /// Shared view of the live connection set, for embedders that need direct
    /// per-channel access (e.g. to subscribe to application-level commands).
    pub fn connections(&self) -> Arc<Connections> {
        self.ctx.connections.clone()
    }
}
