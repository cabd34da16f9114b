/*
    Server - the inbound service loop.

    Responsibilities:
    Binds a TCP listener with address-reuse enabled. Each accepted
    connection is handled in its own spawned task: read to EOF, parse,
    decode, learn the sender into the routing table, dispatch by message
    type, reply if the type calls for one, close.

    Inputs:
    - inbound TCP connections from peers

    Outputs:
    - routing table mutations (learn-on-every-contact)
    - KV store mutations (STORE, VALUE)
    - replies for FINDNODE, FINDVALUE, PING
*/

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, error, warn};

use super::host::Host;
use super::message::{Message, WireHost};
use super::node::DhtNode;
use super::routing_table::K;
use super::uid::Uid;

/// Runs the accept loop forever. Accept failures are logged and retried;
/// this function only returns on an unrecoverable listener error.
pub async fn run(node: Arc<DhtNode>) -> std::io::Result<()> {
    let listener = bind(&node.local_addr, node.local_port).await?;
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let node = Arc::clone(&node);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(&node, stream).await {
                        warn!("connection from {peer_addr} failed: {e}");
                    }
                });
            }
            Err(e) => error!("accept failed: {e}"),
        }
    }
}

async fn bind(addr: &str, port: u16) -> std::io::Result<TcpListener> {
    let socket_addr: SocketAddr = format!("{addr}:{port}")
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid listen address"))?;

    let socket =
        if socket_addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    socket.set_reuseaddr(true)?;
    socket.bind(socket_addr)?;
    socket.listen(1024)
}

async fn handle_connection(node: &Arc<DhtNode>, mut stream: TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let text = String::from_utf8_lossy(&buf);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        debug!("ignoring empty request buffer");
        return Ok(());
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed JSON payload: {e}");
            return Ok(());
        }
    };

    let message = match Message::decode(&value) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to decode message: {e}");
            return Ok(());
        }
    };

    let envelope = message.envelope().clone();
    let sender_uid = Uid::for_node(&envelope.source_address, envelope.source_port);
    match Host::new(envelope.source_address.clone(), envelope.source_port, sender_uid) {
        Ok(host) => node.routing.add_host(host),
        Err(e) => warn!("refusing to learn sender as a host: {e}"),
    }

    if let Some(reply) = dispatch(node, message) {
        let bytes = reply.encode().to_string();
        stream.write_all(bytes.as_bytes()).await?;
        stream.shutdown().await?;
        debug!("dispatched {} reply", reply_type_name(&reply));
    }

    Ok(())
}

fn dispatch(node: &Arc<DhtNode>, message: Message) -> Option<Message> {
    let envelope = node.envelope();
    match message {
        Message::Ping(_) => Some(Message::Pong(envelope)),
        Message::Pong(_) => None,
        Message::FindNode { target_uid, .. } => {
            let hosts = node.routing.k_closest(&target_uid, K).iter().map(WireHost::from).collect();
            Some(Message::NodeList { envelope, hosts })
        }
        Message::FindValue { target_uid, .. } => {
            if let Some(value) = node.kv.get(&target_uid) {
                Some(Message::Value { envelope, key: target_uid, value: Some(value) })
            } else {
                let hosts = node.routing.k_closest(&target_uid, K).iter().map(WireHost::from).collect();
                Some(Message::NodeList { envelope, hosts })
            }
        }
        Message::Store { key, value, .. } => {
            node.kv.put(key, value);
            None
        }
        Message::NodeList { hosts, .. } => {
            node.fold_hosts(hosts);
            None
        }
        Message::Value { key, value: Some(value), .. } => {
            node.kv.put(key, value);
            None
        }
        Message::Value { value: None, .. } => None,
    }
}

fn reply_type_name(message: &Message) -> &'static str {
    match message {
        Message::Ping(_) => "PING",
        Message::Pong(_) => "PONG",
        Message::FindNode { .. } => "FINDNODE",
        Message::FindValue { .. } => "FINDVALUE",
        Message::Store { .. } => "STORE",
        Message::NodeList { .. } => "NODELIST",
        Message::Value { .. } => "VALUE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_dht::message::Envelope;

    fn envelope() -> Envelope {
        Envelope { source_address: "127.0.0.1".to_string(), source_port: 9000 }
    }

    #[test]
    fn test_dispatch_ping_replies_pong() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let reply = dispatch(&node, Message::Ping(envelope()));
        assert!(matches!(reply, Some(Message::Pong(_))));
    }

    #[test]
    fn test_dispatch_pong_has_no_reply() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        assert!(dispatch(&node, Message::Pong(envelope())).is_none());
    }

    #[test]
    fn test_dispatch_findnode_replies_nodelist() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let reply = dispatch(
            &node,
            Message::FindNode { envelope: envelope(), target_uid: Uid::for_key("x") },
        );
        assert!(matches!(reply, Some(Message::NodeList { .. })));
    }

    #[test]
    fn test_dispatch_findvalue_hit_replies_value() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let uid = Uid::for_key("x");
        node.kv.put(uid.clone(), "y".to_string());
        let reply =
            dispatch(&node, Message::FindValue { envelope: envelope(), target_uid: uid });
        assert!(matches!(reply, Some(Message::Value { value: Some(_), .. })));
    }

    #[test]
    fn test_dispatch_findvalue_miss_replies_nodelist() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let reply = dispatch(
            &node,
            Message::FindValue { envelope: envelope(), target_uid: Uid::for_key("missing") },
        );
        assert!(matches!(reply, Some(Message::NodeList { .. })));
    }

    #[test]
    fn test_dispatch_store_persists_and_has_no_reply() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let uid = Uid::for_key("x");
        let reply = dispatch(
            &node,
            Message::Store { envelope: envelope(), key: uid.clone(), value: "y".to_string() },
        );
        assert!(reply.is_none());
        assert_eq!(node.kv.get(&uid), Some("y".to_string()));
    }

    #[test]
    fn test_dispatch_nodelist_folds_hosts_and_has_no_reply() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let peer_uid = Uid::for_node("127.0.0.1", 6000);
        let reply = dispatch(
            &node,
            Message::NodeList {
                envelope: envelope(),
                hosts: vec![WireHost { addr: "127.0.0.1".to_string(), port: 6000, uid: peer_uid.as_str().to_string() }],
            },
        );
        assert!(reply.is_none());
        assert_eq!(node.routing.all_hosts().len(), 1);
    }

    #[test]
    fn test_dispatch_value_with_null_is_ignored() {
        let node = Arc::new(DhtNode::new("127.0.0.1".to_string(), 5000));
        let uid = Uid::for_key("x");
        let reply =
            dispatch(&node, Message::Value { envelope: envelope(), key: uid.clone(), value: None });
        assert!(reply.is_none());
        assert_eq!(node.kv.get(&uid), None);
    }
}
