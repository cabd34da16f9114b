/*
    Replicator - periodic republishing of local KV entries to their k
    closest known peers.

    Responsibilities:
    First fire 60s after startup, self-rescheduling 60s after the prior
    run completes. Each run snapshots the local KV store (skipping
    entirely if empty) and pushes a STORE to the k closest peers for every
    entry. Per-peer I/O failures are swallowed — the pinger owns peer
    culling, not the replicator.

    Inputs:
    - a snapshot of the local KV store
    - the routing table's k-closest queries

    Outputs:
    - outbound STORE messages, best-effort
*/

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::message::Message;
use super::node::DhtNode;
use super::routing_table::K;
use super::transport::send_fire_and_forget;

const REPLICATE_INTERVAL: Duration = Duration::from_secs(60);

/// Runs forever, sleeping `REPLICATE_INTERVAL` before each run.
pub async fn run(node: Arc<DhtNode>) {
    loop {
        tokio::time::sleep(REPLICATE_INTERVAL).await;
        run_once(&node).await;
    }
}

async fn run_once(node: &Arc<DhtNode>) {
    let entries = node.kv.all_entries();
    if entries.is_empty() {
        return;
    }

    for (uid, entry) in &entries {
        for peer in node.routing.k_closest(uid, K) {
            let request =
                Message::Store { envelope: node.envelope(), key: uid.clone(), value: entry.value.clone() };
            if let Err(e) = send_fire_and_forget(&peer.address, peer.port, &request).await {
                debug!("replication STORE to {}:{} failed: {e}", peer.address, peer.port);
            }
        }
    }

    info!("replication run complete: {} entries republished", entries.len());
}
