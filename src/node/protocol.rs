//! Chord Wire Protocol
//!
//! Defines the routed message envelope, the purpose constants, the HTTP
//! endpoints each RPC is served on, and the public key-value DTOs.
//!
//! Requests and replies share one envelope; replies reuse the `purpose`
//! field as a status code and accumulate diagnostics in `errors` as they
//! unwind through forwarders.

use serde::{Deserialize, Serialize};

use crate::error::{ChordError, ChordResult};
use crate::ring::types::{Node, NodeId};

// --- Chord RPC endpoints (one per client method) ---

pub const ENDPOINT_JOIN: &str = "/chord/join";
pub const ENDPOINT_LEAVE: &str = "/chord/leave";
pub const ENDPOINT_NOTIFY: &str = "/chord/notify";
pub const ENDPOINT_FIND_SUCCESSOR: &str = "/chord/find_successor";
pub const ENDPOINT_LOOKUP: &str = "/chord/lookup";
pub const ENDPOINT_HEARTBEAT: &str = "/chord/heartbeat";
pub const ENDPOINT_SET: &str = "/chord/set";
pub const ENDPOINT_GET: &str = "/chord/get";
pub const ENDPOINT_DEL: &str = "/chord/del";

// --- Public key-value facade endpoints ---

/// Public endpoint for client write requests.
pub const ENDPOINT_KV_PUT: &str = "/kv/put";
/// Public endpoint for client read requests.
pub const ENDPOINT_KV_GET: &str = "/kv/get";
/// Public endpoint for client delete requests.
pub const ENDPOINT_KV_DEL: &str = "/kv/del";

/// Message purposes.
///
/// `PredReq` and `SuccReq` travel over the Lookup RPC; every other request
/// purpose has an eponymous RPC. `StatusOk`/`StatusError` appear only on
/// replies. Unknown purposes fail deserialization and are rejected at the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purpose {
    Join,
    Leave,
    Notify,
    FindSuccessor,
    PredReq,
    SuccReq,
    HeartBeat,
    KeySet,
    KeyGet,
    KeyDel,
    StatusOk,
    StatusError,
}

/// The routed request/reply envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Ring position the message is routed toward.
    pub id: NodeId,
    /// Key bytes for the key-value purposes; empty otherwise.
    pub key: Vec<u8>,
    /// Request purpose, or reply status.
    pub purpose: Purpose,
    /// Originating node. Preserved across forwards, so the node that finally
    /// serves a request replies toward the true origin.
    pub sender: Node,
    /// Reply destination; set on replies, absent on requests.
    pub target: Option<Node>,
    /// Number of forwards this message has taken.
    pub hops: u32,
    /// Purpose-specific payload: value bytes for `KeySet`/`KeyGet`, an
    /// encoded [`Node`] for `PredReq`/`SuccReq`/`Leave`.
    pub body: Vec<u8>,
    /// Diagnostics accumulated on the reply path, each prefixed with the
    /// originating node id.
    pub errors: Vec<String>,
}

impl Message {
    pub fn is_ok(&self) -> bool {
        self.purpose == Purpose::StatusOk
    }

    pub fn is_error(&self) -> bool {
        self.purpose == Purpose::StatusError
    }

    /// Flattens the accumulated diagnostics for logs and error returns.
    pub fn join_errors(&self) -> String {
        self.errors.join(" || ")
    }
}

/// Encodes a node descriptor for a message body.
pub fn encode_node(node: &Node) -> ChordResult<Vec<u8>> {
    bincode::serialize(node).map_err(|e| ChordError::Protocol(format!("encode node: {}", e)))
}

/// Decodes a node descriptor from a message body.
pub fn decode_node(body: &[u8]) -> ChordResult<Node> {
    bincode::deserialize(body).map_err(|e| ChordError::Protocol(format!("decode node: {}", e)))
}

// --- Public facade DTOs ---

/// Client write request.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

/// Acknowledgment for writes and deletes.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetResponse {
    pub success: bool,
}

/// Read response. Missing keys come back as an empty value, matching the
/// store contract.
#[derive(Debug, Serialize, Deserialize)]
pub struct GetResponse {
    pub value: String,
}
