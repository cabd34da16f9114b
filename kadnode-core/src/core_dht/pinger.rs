/*
    Pinger - periodic liveness check over the routing table.

    Responsibilities:
    First fire 20s after startup, self-rescheduling 20s after the prior
    run completes (not a fixed wall-clock interval). Each run snapshots
    every known host, deduplicates by uid, and probes each sequentially
    with a 10s connect timeout and a 10s read timeout. A peer that fails
    to answer with a well-formed PONG is evicted.

    Inputs:
    - the routing table's current hosts

    Outputs:
    - `remove_host` calls for unreachable peers
*/

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::message::Message;
use super::node::DhtNode;
use super::transport::send_request_timeout;

const PING_INTERVAL: Duration = Duration::from_secs(20);
const PING_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PING_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs forever, sleeping `PING_INTERVAL` before each run.
pub async fn run(node: Arc<DhtNode>) {
    loop {
        tokio::time::sleep(PING_INTERVAL).await;
        run_once(&node).await;
    }
}

async fn run_once(node: &Arc<DhtNode>) {
    let mut seen = HashSet::new();
    let mut evicted = 0usize;

    for host in node.routing.all_hosts() {
        if !seen.insert(host.uid.clone()) {
            continue;
        }

        let request = Message::Ping(node.envelope());
        let result = send_request_timeout(
            &host.address,
            host.port,
            &request,
            PING_CONNECT_TIMEOUT,
            PING_READ_TIMEOUT,
        )
        .await;

        let alive = matches!(result, Ok(Some(Message::Pong(_))));
        if !alive {
            warn!("peer {} ({}:{}) failed its liveness check, evicting", host.uid, host.address, host.port);
            node.routing.remove_host(&host.uid);
            evicted += 1;
        }
    }

    info!("pinger run complete: {} probed, {evicted} evicted", seen.len());
}
