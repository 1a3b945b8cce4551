//! Peer Registry
//!
//! Maps node ids to live client handles plus a last-seen timestamp. Clients
//! are materialized lazily on first send and verified with a heartbeat; the
//! stabilizer sweeps the registry, re-probing quiet peers and evicting idle
//! ones. At most one client exists per peer id.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::{ChordError, ChordResult};
use crate::ring::types::{Node, NodeId};
use super::client::ChordClient;
use super::protocol::{Message, Purpose};

/// Idle window after which a peer entry is evicted.
pub const PEER_IDLE_TIMEOUT: Duration = Duration::from_secs(180);
/// Peers silent for this long are re-probed during a sweep; fresher entries
/// are skipped.
pub const PEER_REAFFIRM_AFTER: Duration = Duration::from_secs(30);

/// One registered peer.
pub struct PeerEntry {
    pub client: ChordClient,
    pub last_seen: Instant,
}

/// Shared table of live peers for one node.
pub struct PeerRegistry {
    local: Node,
    pub(crate) peers: DashMap<NodeId, PeerEntry>,
    idle_timeout: Duration,
}

impl PeerRegistry {
    pub fn new(local: Node) -> Self {
        Self::with_idle_timeout(local, PEER_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(local: Node, idle_timeout: Duration) -> Self {
        Self {
            local,
            peers: DashMap::new(),
            idle_timeout,
        }
    }

    /// Returns a verified client for `node`, dialing when none is installed.
    ///
    /// A registered client is reused after answering a heartbeat; a silent
    /// one is replaced by a fresh dial. Dial failures surface as
    /// [`ChordError::PeerUnreachable`] and leave the registry unchanged.
    pub async fn check_node(&self, node: &Node) -> ChordResult<ChordClient> {
        if let Some(entry) = self.peers.get(&node.id) {
            let client = entry.client.clone();
            // Release the map shard before suspending on the heartbeat.
            drop(entry);
            match client.heart_beat(&self.heartbeat_message()).await {
                Ok(reply) if reply.is_ok() => {
                    self.touch(&node.id);
                    return Ok(client);
                }
                _ => {
                    tracing::debug!("peer {} failed heartbeat, redialing", node.id);
                }
            }
        }

        let client = ChordClient::connect(&node.host, node.port);
        let reply = client.heart_beat(&self.heartbeat_message()).await?;
        if !reply.is_ok() {
            return Err(ChordError::PeerUnreachable {
                addr: node.addr(),
                reason: reply.join_errors(),
            });
        }

        self.peers.insert(
            node.id,
            PeerEntry {
                client: client.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!("registered peer {} at {}", node.id, node.addr());
        Ok(client)
    }

    /// Marks a peer as just heard from.
    pub fn touch(&self, id: &NodeId) {
        if let Some(mut entry) = self.peers.get_mut(id) {
            entry.last_seen = Instant::now();
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Expires idle peers and re-probes quiet ones.
    ///
    /// Driven by the stabilizer, which passes the tick time; tests pass a
    /// simulated clock. Dropping an entry drops its client, which tears down
    /// the pooled connections.
    pub async fn sweep(&self, now: Instant) {
        let mut expired = Vec::new();
        let mut quiet = Vec::new();

        for entry in self.peers.iter() {
            let age = now.saturating_duration_since(entry.value().last_seen);
            if age > self.idle_timeout {
                expired.push(*entry.key());
            } else if age > PEER_REAFFIRM_AFTER {
                quiet.push((*entry.key(), entry.value().client.clone()));
            }
        }

        for id in expired {
            self.peers.remove(&id);
            tracing::info!("evicted idle peer {}", id);
        }

        for (id, client) in quiet {
            match client.heart_beat(&self.heartbeat_message()).await {
                Ok(reply) if reply.is_ok() => self.touch(&id),
                _ => {
                    // Leave the entry to age out; the next sweeps retry and
                    // eventually evict it.
                    tracing::debug!("peer {} missed reaffirm heartbeat", id);
                }
            }
        }
    }

    fn heartbeat_message(&self) -> Message {
        Message {
            id: self.local.id,
            key: Vec::new(),
            purpose: Purpose::HeartBeat,
            sender: self.local.clone(),
            target: None,
            hops: 0,
            body: Vec::new(),
            errors: Vec::new(),
        }
    }
}
