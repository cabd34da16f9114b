pub mod error;
pub mod host;
pub mod kv_store;
pub mod message;
pub mod node;
pub mod pinger;
pub mod replicator;
pub mod routing_table;
pub mod server;
pub mod transport;
pub mod uid;

pub use error::DhtError;
pub use host::Host;
pub use kv_store::{KeyValueEntry, KeyValueStore, KeyValueStoreDump};
pub use message::{Envelope, Message, WireHost};
pub use node::DhtNode;
pub use routing_table::{RoutingTable, K};
pub use uid::{Uid, PREFIX_BITS};
