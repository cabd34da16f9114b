use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kadnode_core::core_dht::{pinger, replicator, server};
use kadnode_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use kadnode_core::{DhtNode, NodeConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "kadnode")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the node's JSON configuration file.
    config: PathBuf,

    /// Set the log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    if init_logging_with_config(LogConfig::new(log_level)).is_err() {
        eprintln!("logging was already initialized");
    }

    match run(args.config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("startup failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: PathBuf) -> Result<()> {
    let config = NodeConfig::from_file(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let node = Arc::new(DhtNode::new(config.addr.clone(), config.port));
    info!("node uid {} listening on {}:{}", node.local_uid(), config.addr, config.port);

    if config.has_bootstrap() {
        node.bootstrap(&config.boot_addr, config.boot_port).await;
    }

    let server_node = Arc::clone(&node);
    tokio::spawn(async move {
        if let Err(e) = server::run(server_node).await {
            error!("service loop terminated: {e}");
        }
    });
    tokio::spawn(pinger::run(Arc::clone(&node)));
    tokio::spawn(replicator::run(Arc::clone(&node)));

    repl(node).await
}

async fn repl(node: Arc<DhtNode>) -> Result<()> {
    print_help();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            ".help" => print_help(),
            ".quit" => break,
            ".put" => handle_put(&node).await?,
            ".lookup" => handle_lookup(&node).await?,
            ".showroutes" => print!("{}", node.format_routes()),
            ".showuid" => println!("{}", node.local_uid()),
            ".kvstore" => print!("{}", node.format_kv_store()),
            "" => {}
            other => println!("unknown command: {other} (try .help)"),
        }
    }

    Ok(())
}

async fn handle_put(node: &Arc<DhtNode>) -> Result<()> {
    let key = prompt("key: ")?;
    let value = prompt("value: ")?;
    node.put(&key, &value).await?;
    Ok(())
}

async fn handle_lookup(node: &Arc<DhtNode>) -> Result<()> {
    let key = prompt("key: ")?;
    match node.get(&key).await {
        Some(value) => println!("Value: {value}"),
        None => println!("No such key."),
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn print_help() {
    println!(".help        show this message");
    println!(".quit        exit the node");
    println!(".put         store a key/value pair");
    println!(".lookup      look up a value by key");
    println!(".showroutes  dump the routing table");
    println!(".showuid     print this node's uid");
    println!(".kvstore     dump the local key-value store");
}
