//! Chord Node Service
//!
//! The overlay engine for a single ring member: next-hop routing over the
//! finger table, the forward-or-serve request engine, the membership
//! handshakes, and the periodic stabilizer that keeps the ring healthy
//! under concurrent joins and failures.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};

use crate::error::{ChordError, ChordResult};
use crate::ring::hasher::Hasher;
use crate::ring::types::{FingerTable, Node, NodeId};
use crate::storage::memory::KvStore;
use super::protocol::{self, Message, Purpose};
use super::registry::PeerRegistry;

/// Interval between stabilizer ticks.
pub const STABILIZE_INTERVAL: Duration = Duration::from_secs(2);
/// Forward budget; a message bouncing past this many hops is reported as a
/// routing error instead of circling a ring that is still converging.
pub const MAX_HOPS: u32 = 64;

/// Successor/predecessor links plus the finger table.
///
/// Mutated only under the enclosing lock so that a routing decision always
/// observes a consistent snapshot of the three.
pub struct RingState {
    pub predecessor: Option<Node>,
    pub successor: Option<Node>,
    pub fingers: FingerTable,
}

/// One ring member.
pub struct ChordNode {
    self_node: Node,
    pub ring: RwLock<RingState>,
    pub peers: PeerRegistry,
    store: Arc<dyn KvStore>,
    hasher: Arc<dyn Hasher>,
}

impl ChordNode {
    /// Creates a node whose ring position is `hash(host:port)`. The node
    /// starts as a lone ring member; [`ChordNode::join_node`] splices it
    /// into an existing ring.
    pub fn new(
        host: &str,
        port: u16,
        hasher: Arc<dyn Hasher>,
        store: Arc<dyn KvStore>,
    ) -> Arc<Self> {
        let id = hasher.hash(format!("{}:{}", host, port).as_bytes());
        let self_node = Node {
            id,
            host: host.to_string(),
            port,
        };
        Self::with_node(self_node, hasher, store)
    }

    /// Creates a node from an explicit descriptor. Used by `new` and by
    /// embedders that derive the descriptor elsewhere.
    pub fn with_node(
        self_node: Node,
        hasher: Arc<dyn Hasher>,
        store: Arc<dyn KvStore>,
    ) -> Arc<Self> {
        let fingers = FingerTable::new(&self_node, hasher.size());
        Arc::new(Self {
            peers: PeerRegistry::new(self_node.clone()),
            ring: RwLock::new(RingState {
                predecessor: None,
                successor: None,
                fingers,
            }),
            self_node,
            store,
            hasher,
        })
    }

    pub fn id(&self) -> NodeId {
        self.self_node.id
    }

    pub fn self_node(&self) -> &Node {
        &self.self_node
    }

    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    pub async fn successor(&self) -> Option<Node> {
        self.ring.read().await.successor.clone()
    }

    pub async fn predecessor(&self) -> Option<Node> {
        self.ring.read().await.predecessor.clone()
    }

    /// Builds an outbound request originating at this node.
    pub fn new_message(&self, purpose: Purpose, id: NodeId, key: Vec<u8>, body: Vec<u8>) -> Message {
        Message {
            id,
            key,
            purpose,
            sender: self.self_node.clone(),
            target: None,
            hops: 0,
            body,
            errors: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Router
    // ------------------------------------------------------------------

    /// Next-hop selection for `target`.
    ///
    /// First matching rule wins: self when the target falls in our owned
    /// arc, self when we are alone, the successor when the target falls in
    /// `(self, successor]`, otherwise the finger pair whose arc covers the
    /// target. `None` means no rule fired, which only happens in
    /// pathological states while the ring is still stabilizing.
    pub(crate) fn find_finger(&self, target: &NodeId, ring: &RingState) -> Option<Node> {
        let self_id = self.self_node.id;

        // Rule 1: the target falls in our owned arc (predecessor, self].
        let owned = match &ring.predecessor {
            None => *target <= self_id,
            Some(p) => NodeId::in_arc(&p.id, &self_id, target),
        };
        if owned {
            return Some(self.self_node.clone());
        }

        // Rule 2: no successor, nowhere else to send it.
        let successor = match &ring.successor {
            None => return Some(self.self_node.clone()),
            Some(s) => s,
        };

        // Rule 3: the target falls in the successor's arc (self, successor].
        if NodeId::in_arc(&self_id, &successor.id, target) {
            return Some(successor.clone());
        }

        let fingers = ring.fingers.entries();
        let n = fingers.len();
        for (index, finger) in fingers.iter().enumerate() {
            if finger.id == *target {
                return Some(finger.node.clone());
            }
            let next = &fingers[(index + 1) % n];
            if NodeId::in_arc(&finger.id, &next.id, target) {
                return Some(next.node.clone());
            }
        }

        None
    }

    // ------------------------------------------------------------------
    // Request engine
    // ------------------------------------------------------------------

    /// Dispatches one inbound request: serve locally when responsible,
    /// otherwise forward to the chosen next hop and relay its reply.
    pub async fn handle(&self, req: Message) -> Message {
        if matches!(req.purpose, Purpose::StatusOk | Purpose::StatusError) {
            return self.error_reply(&req, format!("unknown purpose {:?}", req.purpose));
        }
        // Heartbeats probe this node, not a key; never route them.
        if req.purpose == Purpose::HeartBeat {
            return self.new_reply(&req);
        }
        if req.hops >= MAX_HOPS {
            return self.error_reply(
                &req,
                format!("hop budget exhausted routing {}", req.id),
            );
        }

        let hop = {
            let ring = self.ring.read().await;
            self.find_finger(&req.id, &ring)
        };
        let Some(hop) = hop else {
            return self.error_reply(
                &req,
                format!(
                    "can't find finger for {} at node: {}",
                    req.id, self.self_node.id
                ),
            );
        };

        if hop.id == self.self_node.id {
            return self.serve_local(req).await;
        }

        let client = match self.peers.check_node(&hop).await {
            Ok(client) => client,
            Err(e) => {
                return self.error_reply(
                    &req,
                    format!("can't find remote node by id: {} ({})", hop.id, e),
                );
            }
        };

        let mut forwarded = req.clone();
        forwarded.hops += 1;
        match client.send(&forwarded).await {
            Ok(reply) => reply,
            Err(e) => self.error_reply(&req, format!("forward to {} failed: {}", hop.id, e)),
        }
    }

    async fn serve_local(&self, req: Message) -> Message {
        let mut reply = self.new_reply(&req);

        match req.purpose {
            Purpose::KeySet => {
                if let Err(e) = self.store.set(&req.key, &req.body).await {
                    self.fail(&mut reply, &e.to_string());
                } else {
                    tracing::debug!("set key ({} value bytes)", req.body.len());
                }
            }
            Purpose::KeyGet => match self.store.get(&req.key).await {
                Ok(value) => reply.body = value,
                Err(e) => self.fail(&mut reply, &e.to_string()),
            },
            Purpose::KeyDel => {
                if let Err(e) = self.store.del(&req.key).await {
                    self.fail(&mut reply, &e.to_string());
                }
            }
            Purpose::PredReq => {
                let link = {
                    let ring = self.ring.read().await;
                    ring.predecessor
                        .clone()
                        .unwrap_or_else(|| self.self_node.clone())
                };
                match protocol::encode_node(&link) {
                    Ok(body) => reply.body = body,
                    Err(e) => self.fail(&mut reply, &e.to_string()),
                }
            }
            Purpose::SuccReq => {
                let link = {
                    let ring = self.ring.read().await;
                    ring.successor
                        .clone()
                        .unwrap_or_else(|| self.self_node.clone())
                };
                match protocol::encode_node(&link) {
                    Ok(body) => reply.body = body,
                    Err(e) => self.fail(&mut reply, &e.to_string()),
                }
            }
            Purpose::Notify => self.handle_notify(&req).await,
            Purpose::FindSuccessor => {
                if let Err(e) = self.handle_find_successor(&req).await {
                    self.fail(&mut reply, &e.to_string());
                }
            }
            Purpose::Join => {
                if let Err(e) = self.handle_join(&req).await {
                    self.fail(&mut reply, &e.to_string());
                }
            }
            Purpose::Leave => {
                if let Err(e) = self.handle_leave(&req).await {
                    self.fail(&mut reply, &e.to_string());
                }
            }
            // Answered before routing.
            Purpose::HeartBeat | Purpose::StatusOk | Purpose::StatusError => {}
        }

        reply
    }

    /// The sender claims to be our predecessor; accept when we have none or
    /// the claim tightens the link.
    async fn handle_notify(&self, req: &Message) {
        let mut ring = self.ring.write().await;
        let sender = &req.sender;
        let accept = match &ring.predecessor {
            None => true,
            Some(p) => NodeId::in_open_arc(&p.id, &self.self_node.id, &sender.id),
        };
        if accept {
            tracing::debug!("set predecessor to {}", sender.id);
            ring.predecessor = Some(sender.clone());
        }
    }

    /// A successor probe reached us while we have no successor of our own:
    /// adopt the sender so a forming ring links up.
    async fn handle_find_successor(&self, req: &Message) -> ChordResult<()> {
        let adopted = {
            let mut ring = self.ring.write().await;
            let vacant = match &ring.successor {
                None => true,
                Some(s) => s.id == self.self_node.id,
            };
            if vacant && req.sender.id != self.self_node.id {
                tracing::info!("adopting {} as successor", req.sender.id);
                ring.successor = Some(req.sender.clone());
                true
            } else {
                false
            }
        };
        if adopted {
            self.notify_successor().await?;
        }
        Ok(())
    }

    /// Splices a joining node in front of us when it falls in our owned arc
    /// and we have no proper successor yet.
    async fn handle_join(&self, req: &Message) -> ChordResult<()> {
        let sender = &req.sender;
        let adopted = {
            let mut ring = self.ring.write().await;
            let in_gap = match &ring.predecessor {
                None => true,
                Some(p) => NodeId::in_open_arc(&p.id, &self.self_node.id, &sender.id),
            };
            let no_successor = match &ring.successor {
                None => true,
                Some(s) => s.id == self.self_node.id,
            };
            if in_gap && no_successor && sender.id != self.self_node.id {
                tracing::info!("join: adopting {} as successor", sender.id);
                ring.successor = Some(sender.clone());
                true
            } else {
                false
            }
        };
        if adopted {
            self.notify_successor().await?;
        }
        Ok(())
    }

    /// The sender is leaving. When it was our successor, its own successor
    /// (carried in the body) takes its place.
    async fn handle_leave(&self, req: &Message) -> ChordResult<()> {
        let replacement = protocol::decode_node(&req.body)
            .map_err(|_| ChordError::Protocol(format!("can't parse new successor for: {}", self.self_node.id)))?;

        let notify = {
            let mut ring = self.ring.write().await;
            let was_successor = ring
                .successor
                .as_ref()
                .map(|s| s.id == req.sender.id)
                .unwrap_or(false);
            if !was_successor {
                false
            } else if replacement.id == self.self_node.id {
                // The departing node handed the ring back to us alone.
                tracing::info!("leave: {} departed, ring collapses to this node", req.sender.id);
                ring.successor = None;
                false
            } else {
                tracing::info!("leave: {} departed, successor now {}", req.sender.id, replacement.id);
                ring.successor = Some(replacement.clone());
                true
            }
        };
        if notify {
            self.notify_successor().await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Membership operations
    // ------------------------------------------------------------------

    /// Splices this node into the ring reachable at `bootstrap_addr`.
    ///
    /// On success the reply's sender is our new successor; we notify it and
    /// seed every finger through the bootstrap node. A `StatusError` reply
    /// is fatal to the join and leaves no state beyond a possibly-updated
    /// successor.
    pub async fn join_node(&self, bootstrap_addr: &str) -> ChordResult<()> {
        let (host, port) = parse_addr(bootstrap_addr)?;
        let bootstrap = Node {
            id: self.hasher.hash(bootstrap_addr.as_bytes()),
            host,
            port,
        };
        let client = self.peers.check_node(&bootstrap).await?;

        let req = self.new_message(Purpose::Join, self.self_node.id, Vec::new(), Vec::new());
        let reply = client.join(&req).await.map_err(|e| ChordError::Join {
            addr: bootstrap_addr.to_string(),
            reason: e.to_string(),
        })?;
        if reply.is_error() {
            return Err(ChordError::Join {
                addr: bootstrap_addr.to_string(),
                reason: reply.join_errors(),
            });
        }

        let successor = reply.sender.clone();
        tracing::info!("joined ring via {}; successor {}", bootstrap_addr, successor.id);
        {
            let mut ring = self.ring.write().await;
            ring.successor = Some(successor);
        }
        self.notify_successor().await?;

        // Seed the finger table from the bootstrap's view of the ring;
        // failed probes keep their self-pointing entry until the next
        // stabilizer tick.
        let targets: Vec<(usize, NodeId)> = {
            let ring = self.ring.read().await;
            ring.fingers.entries().iter().map(|f| (f.index, f.id)).collect()
        };
        for (index, id) in targets {
            let probe = self.new_message(Purpose::FindSuccessor, id, Vec::new(), Vec::new());
            match client.find_successor(&probe).await {
                Ok(reply) if reply.is_ok() => {
                    let mut ring = self.ring.write().await;
                    let owner = reply.sender.clone();
                    ring.fingers.set_node(index, owner);
                }
                _ => continue,
            }
        }

        Ok(())
    }

    /// Announces departure to the node that precedes us, handing it our
    /// successor. Stored keys are not migrated; keys owned by this node are
    /// lost once it stops serving.
    pub async fn leave_ring(&self) -> ChordResult<()> {
        let (predecessor, successor) = {
            let ring = self.ring.read().await;
            (ring.predecessor.clone(), ring.successor.clone())
        };
        let (Some(predecessor), Some(successor)) = (predecessor, successor) else {
            return Ok(());
        };
        if predecessor.id == self.self_node.id {
            return Ok(());
        }

        let body = protocol::encode_node(&successor)?;
        let req = self.new_message(Purpose::Leave, predecessor.id, Vec::new(), body);
        let client = self.peers.check_node(&predecessor).await?;
        let reply = client.leave(&req).await?;
        if reply.is_error() {
            tracing::warn!("leave rejected: {}", reply.join_errors());
        }
        Ok(())
    }

    /// Sends a Notify to the current successor, claiming the predecessor
    /// slot on its side of the link.
    pub async fn notify_successor(&self) -> ChordResult<()> {
        let Some(successor) = self.successor().await else {
            return Ok(());
        };
        let client = self.peers.check_node(&successor).await?;
        let mut msg = self.new_message(Purpose::Notify, successor.id, Vec::new(), Vec::new());
        msg.target = Some(successor.clone());
        let reply = client.notify(&msg).await?;
        if reply.is_error() {
            tracing::debug!("notify rejected: {}", reply.join_errors());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Stabilizer
    // ------------------------------------------------------------------

    /// Periodic repair loop: peer sweep, successor update, finger refresh.
    /// Runs until the quit signal flips; cancellation interrupts the tick
    /// wait, so shutdown is prompt.
    pub async fn run_stabilizer(self: Arc<Self>, mut quit: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(STABILIZE_INTERVAL);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.peers.sweep(Instant::now()).await;
                    self.update_successor().await;
                    self.refresh_fingers().await;
                }
                _ = quit.changed() => {
                    tracing::debug!("quit stabilize");
                    break;
                }
            }
        }
    }

    /// Standard Chord stabilize: ask the successor for its predecessor and
    /// adopt the answer when it sits between us and the successor.
    pub(crate) async fn update_successor(&self) {
        let Some(successor) = self.successor().await else {
            return;
        };

        let client = match self.peers.check_node(&successor).await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("successor {} unreachable, dropping link: {}", successor.id, e);
                let mut ring = self.ring.write().await;
                if ring.successor.as_ref().map(|s| s.id) == Some(successor.id) {
                    ring.successor = None;
                }
                return;
            }
        };

        let req = self.new_message(Purpose::PredReq, successor.id, Vec::new(), Vec::new());
        let reply = match client.lookup(&req).await {
            Ok(reply) if reply.is_ok() && !reply.body.is_empty() => reply,
            _ => return,
        };
        let Ok(candidate) = protocol::decode_node(&reply.body) else {
            return;
        };

        let adopted = {
            let mut ring = self.ring.write().await;
            let link_unchanged =
                ring.successor.as_ref().map(|s| s.id) == Some(successor.id);
            if link_unchanged
                && NodeId::in_open_arc(&self.self_node.id, &successor.id, &candidate.id)
            {
                tracing::info!("stabilize: tightened successor to {}", candidate.id);
                ring.successor = Some(candidate);
                true
            } else {
                false
            }
        };
        if adopted {
            if let Err(e) = self.notify_successor().await {
                tracing::warn!("notify after stabilize failed: {}", e);
            }
        }
    }

    /// Re-resolves the owner of every finger target, probing through the
    /// successor so the answer reflects the ring beyond our own arcs. Failed
    /// probes are skipped; the stale entry stands until the next tick. A
    /// lone node has nothing to learn from and keeps its self-pointing table.
    pub(crate) async fn refresh_fingers(&self) {
        let Some(successor) = self.successor().await else {
            return;
        };
        let client = match self.peers.check_node(&successor).await {
            Ok(client) => client,
            Err(_) => return,
        };

        let targets: Vec<(usize, NodeId)> = {
            let ring = self.ring.read().await;
            ring.fingers.entries().iter().map(|f| (f.index, f.id)).collect()
        };

        for (index, id) in targets {
            let probe = self.new_message(Purpose::FindSuccessor, id, Vec::new(), Vec::new());
            match client.find_successor(&probe).await {
                Ok(reply) if reply.is_ok() => {
                    let owner = reply.sender.clone();
                    let mut ring = self.ring.write().await;
                    ring.fingers.set_node(index, owner);
                }
                _ => continue,
            }
        }
    }

    // ------------------------------------------------------------------
    // Reply plumbing
    // ------------------------------------------------------------------

    fn new_reply(&self, req: &Message) -> Message {
        Message {
            id: req.sender.id,
            key: Vec::new(),
            purpose: Purpose::StatusOk,
            sender: self.self_node.clone(),
            target: Some(req.sender.clone()),
            hops: req.hops,
            body: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn error_reply(&self, req: &Message, diagnostic: String) -> Message {
        let mut reply = self.new_reply(req);
        self.fail(&mut reply, &diagnostic);
        reply
    }

    fn fail(&self, reply: &mut Message, diagnostic: &str) {
        reply.purpose = Purpose::StatusError;
        reply.errors.push(self.wrap_err(diagnostic));
    }

    /// Prefixes a diagnostic with this node's id so errors stay traceable
    /// as replies unwind through forwarders.
    pub(crate) fn wrap_err(&self, err: &str) -> String {
        format!("node {}: {}", self.self_node.id, err)
    }
}

fn parse_addr(addr: &str) -> ChordResult<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| ChordError::Protocol(format!("malformed address: {}", addr)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| ChordError::Protocol(format!("malformed port in address: {}", addr)))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_addr() {
        assert_eq!(
            parse_addr("127.0.0.1:7001").unwrap(),
            ("127.0.0.1".to_string(), 7001)
        );
        assert!(parse_addr("no-port-here").is_err());
        assert!(parse_addr("host:not-a-port").is_err());
    }
}
