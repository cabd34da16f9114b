//! Kadnode Core Library
//!
//! This library provides the core functionality for the Kademlia-style DHT node.

pub mod config;
pub mod core_dht;
pub mod logging;

pub use config::NodeConfig;
pub use core_dht::{DhtError, DhtNode, Host, KeyValueStore, RoutingTable, Uid};
pub use logging::{init_logging, LogLevel};
