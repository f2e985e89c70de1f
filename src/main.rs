//! Multi-room TLS Chat Server - Entry Point
//!
//! Loads configuration, starts the ChatServer actor and accepts connections.

use std::env;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roomcast::config::Config;
use roomcast::{handle_connection, tls, ChatServer, Identity};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=roomcast=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("roomcast=info")),
        )
        .init();

    // Get config path from command line or use defaults
    let config = match env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path)?
        }
        None => Config::default(),
    };
    config.validate()?;

    let acceptor = match &config.tls {
        Some(tls_config) => Some(tls::load_acceptor(tls_config)?),
        None => {
            warn!("No [tls] section configured - serving plaintext");
            None
        }
    };

    // Start TCP listener
    let listener = TcpListener::bind(config.listen.address).await?;
    info!("Chat server listening on {}", config.listen.address);

    // Create ChatServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.limits.command_queue);
    tokio::spawn(ChatServer::new(cmd_rx).run());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };

        info!("New connection from {}", addr);
        let identity = Identity::from_peer(addr, config.identity.mode);
        let cmd_tx = cmd_tx.clone();
        let limits = config.limits.clone();
        let acceptor = acceptor.clone();

        // Spawn handler task for each connection
        tokio::spawn(async move {
            let result = match acceptor {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(tls_stream) => handle_connection(tls_stream, identity, cmd_tx, limits).await,
                    Err(e) => {
                        warn!("TLS handshake with {} failed: {}", addr, e);
                        return;
                    }
                },
                None => handle_connection(stream, identity, cmd_tx, limits).await,
            };

            if let Err(e) = result {
                error!("Connection handler error: {}", e);
            }
        });
    }
}
