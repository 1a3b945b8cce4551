//! Chord API Handlers
//!
//! HTTP endpoints that expose the node to the network: the chord wire
//! endpoints every peer RPC arrives on, and the public key-value facade
//! clients call. Handlers translate HTTP requests into engine calls.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::System;

use super::protocol::{GetResponse, Message, Purpose, SetRequest, SetResponse};
use super::service::ChordNode;

/// Inbound chord RPC. Every wire endpoint funnels into the request engine;
/// the engine decides between serving locally and forwarding.
pub async fn handle_chord_message(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<Message>,
) -> Json<Message> {
    Json(node.handle(req).await)
}

/// Public write. Hashes the key, builds a `KeySet` message, and injects it
/// into the engine, which places it on the responsible node.
pub async fn handle_kv_put(
    Extension(node): Extension<Arc<ChordNode>>,
    Json(req): Json<SetRequest>,
) -> (StatusCode, Json<SetResponse>) {
    let id = node.hasher().hash(req.key.as_bytes());
    let msg = node.new_message(
        Purpose::KeySet,
        id,
        req.key.into_bytes(),
        req.value.into_bytes(),
    );
    let reply = node.handle(msg).await;
    if reply.is_ok() {
        (StatusCode::OK, Json(SetResponse { success: true }))
    } else {
        tracing::error!("put failed: {}", reply.join_errors());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SetResponse { success: false }),
        )
    }
}

/// Public read. Missing keys come back as an empty value.
pub async fn handle_kv_get(
    Extension(node): Extension<Arc<ChordNode>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<GetResponse>) {
    let id = node.hasher().hash(key.as_bytes());
    let msg = node.new_message(Purpose::KeyGet, id, key.into_bytes(), Vec::new());
    let reply = node.handle(msg).await;
    if reply.is_ok() {
        (
            StatusCode::OK,
            Json(GetResponse {
                value: String::from_utf8_lossy(&reply.body).into_owned(),
            }),
        )
    } else {
        tracing::error!("get failed: {}", reply.join_errors());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(GetResponse {
                value: String::new(),
            }),
        )
    }
}

/// Public delete.
pub async fn handle_kv_del(
    Extension(node): Extension<Arc<ChordNode>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<SetResponse>) {
    let id = node.hasher().hash(key.as_bytes());
    let msg = node.new_message(Purpose::KeyDel, id, key.into_bytes(), Vec::new());
    let reply = node.handle(msg).await;
    if reply.is_ok() {
        (StatusCode::OK, Json(SetResponse { success: true }))
    } else {
        tracing::error!("del failed: {}", reply.join_errors());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SetResponse { success: false }),
        )
    }
}

#[derive(Serialize)]
pub struct RoutesResponse {
    routes: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct NodeStatsResponse {
    node_id: String,
    addr: String,
    successor: Option<String>,
    predecessor: Option<String>,
    fingers: usize,
    peers: usize,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

pub async fn handle_routes() -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: vec![
            "/health/routes",
            "/health/stats",
            "/kv/put",
            "/kv/get/:key",
            "/kv/del/:key",
            "/chord/join",
            "/chord/leave",
            "/chord/notify",
            "/chord/find_successor",
            "/chord/lookup",
            "/chord/heartbeat",
            "/chord/set",
            "/chord/get",
            "/chord/del",
        ],
    })
}

/// Ring and host statistics for this node.
pub async fn handle_stats(
    Extension(node): Extension<Arc<ChordNode>>,
) -> Json<NodeStatsResponse> {
    let (successor, predecessor, fingers) = {
        let ring = node.ring.read().await;
        (
            ring.successor.as_ref().map(|s| s.id.to_string()),
            ring.predecessor.as_ref().map(|p| p.id.to_string()),
            ring.fingers.len(),
        )
    };

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        node_id: node.id().to_hex(),
        addr: node.self_node().addr(),
        successor,
        predecessor,
        fingers,
        peers: node.peers.len(),
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
