/*
    DhtNode - the DHT engine: owns local identity, routing table, and
    key-value store, and exposes the outbound `put`/`get` algorithms plus
    the bootstrap join procedure.

    Responsibilities:
    `put`: hash the key, store locally, push STORE to the k closest known
    peers. `get`: hash the key, return a local hit immediately, otherwise
    query the k closest known peers in order until one yields a value.
    `bootstrap`: seed the routing table from one known peer via FINDNODE.

    This is single-round: a `get` never recursively contacts peers learned
    during the same call. The enlarged routing table benefits later calls.

    Inputs:
    - local application calls (CLI `.put`/`.lookup`/`.showroutes`/`.kvstore`)
    - a constructed config record {listen_addr, listen_port, boot_addr,
      boot_port}

    Outputs:
    - stored/retrieved values
    - routing table and KV store mutations
*/

use std::sync::Arc;

use tracing::{debug, warn};

use super::error::DhtError;
use super::host::Host;
use super::kv_store::KeyValueStore;
use super::message::{Envelope, Message, WireHost};
use super::routing_table::{RoutingTable, K};
use super::transport::{send_fire_and_forget, send_request};
use super::uid::Uid;

pub struct DhtNode {
    pub local_addr: String,
    pub local_port: u16,
    local_uid: Uid,
    pub routing: Arc<RoutingTable>,
    pub kv: Arc<KeyValueStore>,
}

impl DhtNode {
    pub fn new(local_addr: String, local_port: u16) -> Self {
        let local_uid = Uid::for_node(&local_addr, local_port);
        let routing = Arc::new(RoutingTable::new(local_uid.clone()));
        DhtNode { local_addr, local_port, local_uid, routing, kv: Arc::new(KeyValueStore::new()) }
    }

    pub fn local_uid(&self) -> &Uid {
        &self.local_uid
    }

    /// §4.7: seed the routing table from one known peer, then FINDNODE it
    /// for ourselves. Errors are logged; the node starts regardless with a
    /// near-empty routing table.
    pub async fn bootstrap(&self, boot_addr: &str, boot_port: u16) {
        let boot_uid = Uid::for_node(boot_addr, boot_port);
        let host = match Host::new(boot_addr.to_string(), boot_port, boot_uid) {
            Ok(host) => host,
            Err(e) => {
                warn!("bootstrap peer {boot_addr}:{boot_port} rejected: {e}");
                return;
            }
        };
        self.routing.add_host(host);

        let request = Message::FindNode { envelope: self.envelope(), target_uid: self.local_uid.clone() };
        match send_request(boot_addr, boot_port, &request).await {
            Ok(Some(Message::NodeList { hosts, .. })) => self.fold_hosts(hosts),
            Ok(_) => debug!("bootstrap peer {boot_addr}:{boot_port} replied with a non-NODELIST message"),
            Err(e) => warn!("bootstrap join to {boot_addr}:{boot_port} failed: {e}"),
        }
    }

    /// §4.6 `put`.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), DhtError> {
        if key.is_empty() {
            return Err(DhtError::EmptyKey);
        }

        let uid = Uid::for_key(key);
        self.kv.put_with_key(uid.clone(), key.to_string(), value.to_string());

        for peer in self.routing.k_closest(&uid, K) {
            let request =
                Message::Store { envelope: self.envelope(), key: uid.clone(), value: value.to_string() };
            if let Err(e) = send_fire_and_forget(&peer.address, peer.port, &request).await {
                warn!("STORE to {}:{} failed: {e}", peer.address, peer.port);
            }
        }

        Ok(())
    }

    /// §4.6 `get`.
    pub async fn get(&self, key: &str) -> Option<String> {
        let uid = Uid::for_key(key);
        if let Some(value) = self.kv.get(&uid) {
            return Some(value);
        }

        for peer in self.routing.k_closest(&uid, K) {
            let request = Message::FindValue { envelope: self.envelope(), target_uid: uid.clone() };
            match send_request(&peer.address, peer.port, &request).await {
                Ok(Some(Message::Value { value: Some(value), .. })) => {
                    self.kv.put(uid.clone(), value.clone());
                    return Some(value);
                }
                Ok(Some(Message::Value { value: None, .. })) => {
                    debug!("peer {}:{} returned a null VALUE, continuing", peer.address, peer.port);
                }
                Ok(Some(Message::NodeList { hosts, .. })) => self.fold_hosts(hosts),
                Ok(_) => {}
                Err(e) => warn!("FINDVALUE to {}:{} failed: {e}", peer.address, peer.port),
            }
        }

        None
    }

    pub fn format_routes(&self) -> String {
        self.routing.format_routes()
    }

    pub fn format_kv_store(&self) -> String {
        self.kv.format()
    }

    pub(crate) fn envelope(&self) -> Envelope {
        Envelope { source_address: self.local_addr.clone(), source_port: self.local_port }
    }

    pub(crate) fn fold_hosts(&self, hosts: Vec<WireHost>) {
        let hosts = hosts
            .into_iter()
            .filter_map(|h| Host::new(h.addr, h.port, Uid::from_raw(h.uid)).ok());
        self.routing.add_hosts(hosts);
    }
}
