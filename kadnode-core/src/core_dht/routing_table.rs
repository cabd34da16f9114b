/*
    RoutingTable - Kademlia bucket structure, store nearest peers by XOR distance.

    Responsibilities:
    Maintains 160 fixed buckets indexed by shared-prefix-bit-length with the
    local UID. Performs insert/replace/evict, removal, and k-closest queries.

    Inputs:
    - peers discovered via inbound messages, bootstrap, or NODELIST folding
    - peer removals requested by the pinger

    Outputs:
    - k closest peers to a query UID
    - human-readable dump for the CLI `.showroutes` command
*/

use std::sync::Mutex;

use super::host::Host;
use super::uid::{Uid, PREFIX_BITS};

/// Bucket width (replication/width factor).
pub const K: usize = 3;

#[derive(Debug, Default)]
struct Bucket {
    hosts: Vec<Host>,
}

/// Fixed 160-bucket Kademlia routing table over the local node's UID.
pub struct RoutingTable {
    local: Uid,
    buckets: Mutex<Vec<Bucket>>,
}

impl RoutingTable {
    pub fn new(local: Uid) -> Self {
        let buckets = (0..PREFIX_BITS).map(|_| Bucket::default()).collect();
        RoutingTable { local, buckets: Mutex::new(buckets) }
    }

    pub fn local_uid(&self) -> &Uid {
        &self.local
    }

    /// Insert or refresh a single host. Silently ignored when `bucket_index`
    /// returns -1 (self, identical uid, or undecodable uid).
    pub fn add_host(&self, host: Host) {
        let idx = Uid::bucket_index(&self.local, &host.uid);
        if idx < 0 {
            return;
        }
        let idx = idx as usize;
        assert!(idx < PREFIX_BITS, "bucket_index {idx} out of range [0, {PREFIX_BITS})");

        let mut buckets = self.buckets.lock().unwrap();
        let bucket = &mut buckets[idx];

        if let Some(existing) = bucket.hosts.iter_mut().find(|h| h.uid == host.uid) {
            *existing = host;
            return;
        }

        if bucket.hosts.len() < K {
            bucket.hosts.push(host);
        } else {
            bucket.hosts.remove(0);
            bucket.hosts.push(host);
        }
    }

    /// Null-safe iteration of `add_host`.
    pub fn add_hosts(&self, hosts: impl IntoIterator<Item = Host>) {
        for host in hosts {
            self.add_host(host);
        }
    }

    /// Remove the host with the given uid, wherever it lives. No-op if absent.
    pub fn remove_host(&self, uid: &Uid) {
        let mut buckets = self.buckets.lock().unwrap();
        for bucket in buckets.iter_mut() {
            if let Some(pos) = bucket.hosts.iter().position(|h| &h.uid == uid) {
                bucket.hosts.remove(pos);
                return;
            }
        }
    }

    /// The `n` hosts closest to `target`, ascending by XOR distance. A global
    /// scan across all buckets, not a per-bucket walk: the local UID is
    /// never stored in any bucket, so the closest candidates to a query
    /// landing in an empty bucket live in adjacent buckets.
    pub fn k_closest(&self, target: &Uid, n: usize) -> Vec<Host> {
        let Some(target_bytes) = target.decode() else {
            return Vec::new();
        };

        let buckets = self.buckets.lock().unwrap();
        let mut all: Vec<Host> = buckets.iter().flat_map(|b| b.hosts.iter().cloned()).collect();
        drop(buckets);

        all.sort_by(|a, b| {
            let (Some(da), Some(db)) = (a.uid.decode(), b.uid.decode()) else {
                return std::cmp::Ordering::Equal;
            };
            Uid::xor_distance(&da, &target_bytes).cmp(&Uid::xor_distance(&db, &target_bytes))
        });

        all.truncate(n);
        all
    }

    /// Flat enumeration of every host across every bucket.
    pub fn all_hosts(&self) -> Vec<Host> {
        let buckets = self.buckets.lock().unwrap();
        buckets.iter().flat_map(|b| b.hosts.iter().cloned()).collect()
    }

    /// Human-readable dump for CLI `.showroutes`.
    pub fn format_routes(&self) -> String {
        let buckets = self.buckets.lock().unwrap();
        let mut out = String::new();
        for (i, bucket) in buckets.iter().enumerate() {
            if bucket.hosts.is_empty() {
                continue;
            }
            out.push_str(&format!("bucket {i}:\n"));
            for host in &bucket.hosts {
                out.push_str(&format!("  {} {}:{}\n", host.uid, host.address, host.port));
            }
        }
        out
    }
}
