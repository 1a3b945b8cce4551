use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use chord_cluster::node::handlers::{
    handle_chord_message, handle_kv_del, handle_kv_get, handle_kv_put, handle_routes,
    handle_stats,
};
use chord_cluster::node::protocol::{
    ENDPOINT_DEL, ENDPOINT_FIND_SUCCESSOR, ENDPOINT_GET, ENDPOINT_HEARTBEAT, ENDPOINT_JOIN,
    ENDPOINT_KV_DEL, ENDPOINT_KV_GET, ENDPOINT_KV_PUT, ENDPOINT_LEAVE, ENDPOINT_LOOKUP,
    ENDPOINT_NOTIFY, ENDPOINT_SET,
};
use chord_cluster::node::service::ChordNode;
use chord_cluster::ring::hasher::Blake2bHasher;
use chord_cluster::storage::memory::MemoryStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} --port <port> [--host <host>] [--join <addr:port>]", args[0]);
        eprintln!("Example: {} --port 7001", args[0]);
        eprintln!("Example: {} --port 7002 --join 127.0.0.1:7001", args[0]);
        std::process::exit(1);
    }

    let mut host = "127.0.0.1".to_string();
    let mut port: Option<u16> = None;
    let mut join_addr: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                host = args[i + 1].clone();
                i += 2;
            }
            "--port" => {
                port = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--join" => {
                join_addr = Some(args[i + 1].clone());
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }

    let port = port.expect("--port is required");

    tracing::info!("Starting chord node on {}:{}", host, port);
    if let Some(addr) = &join_addr {
        tracing::info!("Joining ring via {}", addr);
    } else {
        tracing::info!("Starting as a lone ring member");
    }

    // 1. The node: ring position, finger table, peer registry, local store.
    let node = ChordNode::new(
        &host,
        port,
        Arc::new(Blake2bHasher),
        Arc::new(MemoryStore::new()),
    );
    tracing::info!("Node id: {}", node.id());

    // 2. HTTP router: chord wire endpoints + public key-value facade.
    let app = Router::new()
        .route("/health/routes", get(handle_routes))
        .route("/health/stats", get(handle_stats))
        // Public facade
        .route(ENDPOINT_KV_PUT, post(handle_kv_put))
        .route(&format!("{}/:key", ENDPOINT_KV_GET), get(handle_kv_get))
        .route(&format!("{}/:key", ENDPOINT_KV_DEL), post(handle_kv_del))
        // Chord wire endpoints, one per RPC, all feeding the engine
        .route(ENDPOINT_JOIN, post(handle_chord_message))
        .route(ENDPOINT_LEAVE, post(handle_chord_message))
        .route(ENDPOINT_NOTIFY, post(handle_chord_message))
        .route(ENDPOINT_FIND_SUCCESSOR, post(handle_chord_message))
        .route(ENDPOINT_LOOKUP, post(handle_chord_message))
        .route(ENDPOINT_HEARTBEAT, post(handle_chord_message))
        .route(ENDPOINT_SET, post(handle_chord_message))
        .route(ENDPOINT_GET, post(handle_chord_message))
        .route(ENDPOINT_DEL, post(handle_chord_message))
        .layer(Extension(node.clone()));

    // 3. Serve before joining: the bootstrap node dials back during the
    // join handshake, so the listener must already be accepting.
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    tracing::info!("Listening on {}:{}", host, port);

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
    });

    // 4. Join an existing ring when a bootstrap address was given.
    if let Some(addr) = &join_addr {
        node.join_node(addr).await?;
    }

    // 5. Spawn the stabilizer.
    let (quit_tx, quit_rx) = tokio::sync::watch::channel(false);
    let stabilizer = {
        let node = node.clone();
        tokio::spawn(async move {
            node.run_stabilizer(quit_rx).await;
        })
    };

    tracing::info!("Press Ctrl+C to shutdown");
    server.await??;

    // 6. Graceful departure: hand our successor to our predecessor, then
    // stop the stabilizer.
    if let Err(e) = node.leave_ring().await {
        tracing::warn!("leave failed: {}", e);
    }
    let _ = quit_tx.send(true);
    let _ = stabilizer.await;

    Ok(())
}
