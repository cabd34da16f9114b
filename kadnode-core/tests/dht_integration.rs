//! Multi-node end-to-end scenarios over real loopback TCP sockets, per the
//! "concrete end-to-end scenarios" the core's design commits to: bootstrap
//! join, cross-node put/get, and resilience to a malformed request.

use std::sync::Arc;
use std::time::Duration;

use kadnode_core::core_dht::server;
use kadnode_core::DhtNode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::sleep;

async fn spawn_node(addr: &str, port: u16) -> Arc<DhtNode> {
    let node = Arc::new(DhtNode::new(addr.to_string(), port));
    let spawned = Arc::clone(&node);
    tokio::spawn(async move {
        let _ = server::run(spawned).await;
    });
    sleep(Duration::from_millis(100)).await;
    node
}

#[tokio::test]
async fn test_bootstrap_join_learns_each_other() {
    let a = spawn_node("127.0.0.1", 15100).await;
    let b = spawn_node("127.0.0.1", 15101).await;

    b.bootstrap("127.0.0.1", 15100).await;
    sleep(Duration::from_millis(100)).await;

    assert!(a.routing.all_hosts().iter().any(|h| h.uid == *b.local_uid()));
    assert!(b.routing.all_hosts().iter().any(|h| h.uid == *a.local_uid()));
}

#[tokio::test]
async fn test_put_on_one_node_replicates_to_bootstrap_peer() {
    let a = spawn_node("127.0.0.1", 15110).await;
    let b = spawn_node("127.0.0.1", 15111).await;

    b.bootstrap("127.0.0.1", 15110).await;
    sleep(Duration::from_millis(100)).await;

    b.put("hello", "world").await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(b.get("hello").await, Some("world".to_string()));
    assert_eq!(a.get("hello").await, Some("world".to_string()));
}

#[tokio::test]
async fn test_get_via_findvalue_reaches_remote_peer() {
    let a = spawn_node("127.0.0.1", 15120).await;
    let c = spawn_node("127.0.0.1", 15121).await;

    c.bootstrap("127.0.0.1", 15120).await;
    sleep(Duration::from_millis(100)).await;

    // A holds the value locally; C never saw the put but knows A through
    // bootstrap, so C's get() round-trips a FINDVALUE to A.
    a.put("k", "v").await.unwrap();

    let found = c.get("k").await;
    assert_eq!(found, Some("v".to_string()));
}

#[tokio::test]
async fn test_put_with_no_known_peers_only_updates_local_store() {
    let a = spawn_node("127.0.0.1", 15130).await;
    a.put("solo", "value").await.unwrap();
    assert_eq!(a.get("solo").await, Some("value".to_string()));
}

#[tokio::test]
async fn test_malformed_buffer_is_dropped_and_connection_recovers() {
    let a = spawn_node("127.0.0.1", 15140).await;

    let mut stream = TcpStream::connect(("127.0.0.1", 15140)).await.unwrap();
    stream.write_all(b"not json at all").await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty(), "malformed request must get no reply");

    // A subsequent well-formed request must still be served.
    let ping = serde_json::json!({
        "type": "PING",
        "source-address": "127.0.0.1",
        "source-port": 15141u16,
    });
    let mut stream = TcpStream::connect(("127.0.0.1", 15140)).await.unwrap();
    stream.write_all(ping.to_string().as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let reply: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(reply["type"], "PONG");

    let _ = a;
}
