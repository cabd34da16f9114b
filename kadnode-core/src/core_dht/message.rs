/*
    Message - the five-message DHT wire protocol.

    Responsibilities:
    Defines the PING/PONG/FINDNODE/FINDVALUE/STORE/NODELIST/VALUE message
    shapes and their strict JSON encode/decode: every message carries the
    common envelope (type, source-address, source-port) plus exactly the
    fields listed for its type — no extras, no omissions.

    Deliberately not derived via serde's tagged-enum machinery: per-variant
    `deny_unknown_fields` does not compose with `#[serde(flatten)]`, so the
    strict field-set check below is hand-rolled over a `serde_json::Value`
    instead.

    Inputs:
    - inbound JSON buffers (service loop)
    - outbound requests constructed by the DHT engine, pinger, replicator,
      bootstrap join

    Outputs:
    - a typed `Message` for successfully-decoded buffers
    - a `DhtError` describing the first structural violation found
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::DhtError;
use super::host::Host;
use super::uid::Uid;

/// The common envelope every message carries: who sent it, not necessarily
/// who owns the original key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source_address: String,
    pub source_port: u16,
}

/// A peer record as it appears inside a NODELIST's `hosts` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireHost {
    pub addr: String,
    pub port: u16,
    pub uid: String,
}

impl From<&Host> for WireHost {
    fn from(host: &Host) -> Self {
        WireHost { addr: host.address.clone(), port: host.port, uid: host.uid.as_str().to_string() }
    }
}

/// The seven message shapes accepted uniformly — PING and PONG included,
/// with no subclass that bypasses the field-set check.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ping(Envelope),
    Pong(Envelope),
    FindNode { envelope: Envelope, target_uid: Uid },
    FindValue { envelope: Envelope, target_uid: Uid },
    Store { envelope: Envelope, key: Uid, value: String },
    NodeList { envelope: Envelope, hosts: Vec<WireHost> },
    /// `value` is `None` when a VALUE reply arrives with a null inner value
    /// — a protocol-logic edge case to be ignored by the caller, not a
    /// decode failure.
    Value { envelope: Envelope, key: Uid, value: Option<String> },
}

impl Message {
    pub fn envelope(&self) -> &Envelope {
        match self {
            Message::Ping(e) | Message::Pong(e) => e,
            Message::FindNode { envelope, .. }
            | Message::FindValue { envelope, .. }
            | Message::Store { envelope, .. }
            | Message::NodeList { envelope, .. }
            | Message::Value { envelope, .. } => envelope,
        }
    }

    pub fn encode(&self) -> Value {
        let env = self.envelope();
        let mut obj = Map::new();
        obj.insert("source-address".to_string(), Value::String(env.source_address.clone()));
        obj.insert("source-port".to_string(), Value::Number(env.source_port.into()));

        match self {
            Message::Ping(_) => {
                obj.insert("type".to_string(), Value::String("PING".to_string()));
            }
            Message::Pong(_) => {
                obj.insert("type".to_string(), Value::String("PONG".to_string()));
            }
            Message::FindNode { target_uid, .. } => {
                obj.insert("type".to_string(), Value::String("FINDNODE".to_string()));
                obj.insert("target-uid".to_string(), Value::String(target_uid.as_str().to_string()));
            }
            Message::FindValue { target_uid, .. } => {
                obj.insert("type".to_string(), Value::String("FINDVALUE".to_string()));
                obj.insert("target-uid".to_string(), Value::String(target_uid.as_str().to_string()));
            }
            Message::Store { key, value, .. } => {
                obj.insert("type".to_string(), Value::String("STORE".to_string()));
                obj.insert("key".to_string(), Value::String(key.as_str().to_string()));
                obj.insert("value".to_string(), Value::String(value.clone()));
            }
            Message::NodeList { hosts, .. } => {
                obj.insert("type".to_string(), Value::String("NODELIST".to_string()));
                obj.insert("hosts".to_string(), serde_json::to_value(hosts).unwrap());
            }
            Message::Value { key, value, .. } => {
                obj.insert("type".to_string(), Value::String("VALUE".to_string()));
                obj.insert("key".to_string(), Value::String(key.as_str().to_string()));
                obj.insert(
                    "value".to_string(),
                    value.clone().map(Value::String).unwrap_or(Value::Null),
                );
            }
        }

        Value::Object(obj)
    }

    pub fn decode(value: &Value) -> Result<Message, DhtError> {
        let obj = value.as_object().ok_or_else(|| DhtError::MalformedJson("not a JSON object".to_string()))?;

        let type_str = field_str(obj, "type")?;
        let envelope = Envelope {
            source_address: field_str(obj, "source-address")?,
            source_port: field_u16(obj, "source-port")?,
        };

        match type_str.as_str() {
            "PING" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port"])?;
                Ok(Message::Ping(envelope))
            }
            "PONG" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port"])?;
                Ok(Message::Pong(envelope))
            }
            "FINDNODE" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port", "target-uid"])?;
                Ok(Message::FindNode { envelope, target_uid: Uid::from_raw(field_str(obj, "target-uid")?) })
            }
            "FINDVALUE" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port", "target-uid"])?;
                Ok(Message::FindValue { envelope, target_uid: Uid::from_raw(field_str(obj, "target-uid")?) })
            }
            "STORE" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port", "key", "value"])?;
                Ok(Message::Store {
                    envelope,
                    key: Uid::from_raw(field_str(obj, "key")?),
                    value: field_str(obj, "value")?,
                })
            }
            "NODELIST" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port", "hosts"])?;
                let hosts_value =
                    obj.get("hosts").ok_or(DhtError::MissingField("hosts"))?;
                let hosts: Vec<WireHost> = serde_json::from_value(hosts_value.clone())
                    .map_err(|e| DhtError::MalformedJson(e.to_string()))?;
                Ok(Message::NodeList { envelope, hosts })
            }
            "VALUE" => {
                expect_exact_fields(obj, &["type", "source-address", "source-port", "key", "value"])?;
                let value_field = obj.get("value").ok_or(DhtError::MissingField("value"))?;
                let value = match value_field {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    _ => return Err(DhtError::MalformedJson("value must be a string or null".to_string())),
                };
                Ok(Message::Value { envelope, key: Uid::from_raw(field_str(obj, "key")?), value })
            }
            other => Err(DhtError::UnknownMessageType(other.to_string())),
        }
    }
}

fn field_str(obj: &Map<String, Value>, name: &'static str) -> Result<String, DhtError> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(DhtError::MissingField(name))
}

fn field_u16(obj: &Map<String, Value>, name: &'static str) -> Result<u16, DhtError> {
    obj.get(name)
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or(DhtError::MissingField(name))
}

/// Checks the object has exactly `expected` keys — no extras, no omissions.
fn expect_exact_fields(obj: &Map<String, Value>, expected: &[&'static str]) -> Result<(), DhtError> {
    for key in expected {
        if !obj.contains_key(*key) {
            return Err(DhtError::MissingField(*key));
        }
    }
    for key in obj.keys() {
        if !expected.contains(&key.as_str()) {
            return Err(DhtError::UnexpectedField(key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> Envelope {
        Envelope { source_address: "127.0.0.1".to_string(), source_port: 5000 }
    }

    #[test]
    fn test_ping_round_trip() {
        let msg = Message::Ping(envelope());
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_pong_round_trip() {
        let msg = Message::Pong(envelope());
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_findnode_round_trip() {
        let msg = Message::FindNode { envelope: envelope(), target_uid: Uid::for_key("x") };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_findvalue_round_trip() {
        let msg = Message::FindValue { envelope: envelope(), target_uid: Uid::for_key("x") };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_store_round_trip() {
        let msg =
            Message::Store { envelope: envelope(), key: Uid::for_key("x"), value: "v".to_string() };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_nodelist_round_trip() {
        let host = Host::new("1.2.3.4".to_string(), 9, Uid::for_node("1.2.3.4", 9)).unwrap();
        let msg = Message::NodeList {
            envelope: envelope(),
            hosts: vec![WireHost::from(&host)],
        };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_nodelist_empty_round_trip() {
        let msg = Message::NodeList { envelope: envelope(), hosts: vec![] };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_value_round_trip() {
        let msg = Message::Value {
            envelope: envelope(),
            key: Uid::for_key("x"),
            value: Some("v".to_string()),
        };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_value_null_decodes_to_none() {
        let msg = Message::Value { envelope: envelope(), key: Uid::for_key("x"), value: None };
        let decoded = Message::decode(&msg.encode()).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn test_missing_type_rejected() {
        let value = serde_json::json!({"source-address": "a", "source-port": 1});
        assert!(matches!(Message::decode(&value), Err(DhtError::MissingField("type"))));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let value = serde_json::json!({"type": "BOGUS", "source-address": "a", "source-port": 1});
        assert!(matches!(Message::decode(&value), Err(DhtError::UnknownMessageType(_))));
    }

    #[test]
    fn test_extra_field_rejected() {
        let value =
            serde_json::json!({"type": "PING", "source-address": "a", "source-port": 1, "extra": true});
        assert!(matches!(Message::decode(&value), Err(DhtError::UnexpectedField(_))));
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let value = serde_json::json!({"type": "FINDNODE", "source-address": "a", "source-port": 1});
        assert!(matches!(Message::decode(&value), Err(DhtError::MissingField("target-uid"))));
    }

    #[test]
    fn test_not_an_object_rejected() {
        let value = serde_json::json!([1, 2, 3]);
        assert!(matches!(Message::decode(&value), Err(DhtError::MalformedJson(_))));
    }
}
