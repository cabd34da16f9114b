/*
    KeyValueStore - local concurrent map from identifier to (original-key, value).

    Responsibilities:
    A simple overwrite-insert key-value map, the storage half of the DHT.
    No expiration, no versioning, no deletion: later writes to the same
    UID overwrite earlier ones and entries otherwise live forever.

    Inputs:
    - put(identifier, original_key?, value) from the local `put` call, STORE
      messages, VALUE replies, and the replicator's snapshot-and-republish
    - get(identifier) from the local `get` call and FINDVALUE handling

    Outputs:
    - stored values
    - a diagnostics snapshot for CLI `.kvstore`
*/

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::uid::Uid;

/// A stored key-value entry. `original_key` is absent for entries learned
/// via STORE/VALUE messages or cached remote lookups, where the original
/// key text is never transmitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValueEntry {
    pub original_key: Option<String>,
    pub value: String,
}

/// Concurrent mapping `UID -> KeyValueEntry`. Every operation observes a
/// consistent per-call snapshot; compound operations are not required.
#[derive(Default)]
pub struct KeyValueStore {
    entries: Mutex<HashMap<Uid, KeyValueEntry>>,
}

/// Diagnostics-only serialization shape: `{"data": [{"key": UID, "value": V}, ...]}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValueStoreDump {
    pub data: Vec<KeyValueDumpEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValueDumpEntry {
    pub key: Uid,
    pub value: KeyValueEntry,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite-insert with the original key recorded.
    pub fn put_with_key(&self, id: Uid, original_key: String, value: String) {
        self.entries
            .lock()
            .unwrap()
            .insert(id, KeyValueEntry { original_key: Some(original_key), value });
    }

    /// Overwrite-insert with the original key absent.
    pub fn put(&self, id: Uid, value: String) {
        self.entries.lock().unwrap().insert(id, KeyValueEntry { original_key: None, value });
    }

    pub fn get(&self, id: &Uid) -> Option<String> {
        self.entries.lock().unwrap().get(id).map(|e| e.value.clone())
    }

    pub fn get_original_key(&self, id: &Uid) -> Option<String> {
        self.entries.lock().unwrap().get(id).and_then(|e| e.original_key.clone())
    }

    pub fn contains(&self, id: &Uid) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    /// Snapshot for the replicator.
    pub fn all_entries(&self) -> HashMap<Uid, KeyValueEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Human-readable dump for CLI `.kvstore`. Entries with no recorded
    /// original key (cached remote hits) display as "(unknown)".
    pub fn format(&self) -> String {
        let entries = self.entries.lock().unwrap();
        let mut out = String::new();
        for (uid, entry) in entries.iter() {
            let key = entry.original_key.as_deref().unwrap_or("(unknown)");
            out.push_str(&format!("{uid} key={key} value={}\n", entry.value));
        }
        out
    }

    /// Diagnostics-only serialization, not used on the wire.
    pub fn to_dump(&self) -> KeyValueStoreDump {
        let entries = self.entries.lock().unwrap();
        KeyValueStoreDump {
            data: entries
                .iter()
                .map(|(k, v)| KeyValueDumpEntry { key: k.clone(), value: v.clone() })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_with_key_and_get() {
        let store = KeyValueStore::new();
        let uid = Uid::for_key("hello");
        store.put_with_key(uid.clone(), "hello".to_string(), "world".to_string());
        assert_eq!(store.get(&uid), Some("world".to_string()));
        assert_eq!(store.get_original_key(&uid), Some("hello".to_string()));
    }

    #[test]
    fn test_put_without_key() {
        let store = KeyValueStore::new();
        let uid = Uid::for_key("hello");
        store.put(uid.clone(), "world".to_string());
        assert_eq!(store.get(&uid), Some("world".to_string()));
        assert_eq!(store.get_original_key(&uid), None);
    }

    #[test]
    fn test_overwrite_last_writer_wins() {
        let store = KeyValueStore::new();
        let uid = Uid::for_key("hello");
        store.put(uid.clone(), "first".to_string());
        store.put(uid.clone(), "second".to_string());
        assert_eq!(store.get(&uid), Some("second".to_string()));
    }

    #[test]
    fn test_contains() {
        let store = KeyValueStore::new();
        let uid = Uid::for_key("hello");
        assert!(!store.contains(&uid));
        store.put(uid.clone(), "world".to_string());
        assert!(store.contains(&uid));
    }

    #[test]
    fn test_get_missing_is_none() {
        let store = KeyValueStore::new();
        assert_eq!(store.get(&Uid::for_key("missing")), None);
    }

    #[test]
    fn test_all_entries_snapshot() {
        let store = KeyValueStore::new();
        store.put(Uid::for_key("a"), "1".to_string());
        store.put(Uid::for_key("b"), "2".to_string());
        assert_eq!(store.all_entries().len(), 2);
    }

    #[test]
    fn test_format_shows_unknown_for_missing_original_key() {
        let store = KeyValueStore::new();
        store.put(Uid::for_key("a"), "1".to_string());
        assert!(store.format().contains("(unknown)"));
    }

    #[test]
    fn test_dump_round_trip() {
        let store = KeyValueStore::new();
        store.put_with_key(Uid::for_key("a"), "a".to_string(), "1".to_string());
        let dump = store.to_dump();
        let json = serde_json::to_string(&dump).unwrap();
        let decoded: KeyValueStoreDump = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.data.len(), 1);
    }
}
