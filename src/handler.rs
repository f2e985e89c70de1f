//! Connection worker
//!
//! Drives one client connection: line framing, command parsing, and
//! bidirectional communication with the ChatServer. Generic over the
//! byte stream so TLS, plain TCP and in-memory pipes all work.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

use crate::config::LimitsConfig;
use crate::connection::ConnectionHandle;
use crate::error::AppError;
use crate::message::{ClientCommand, ServerMessage};
use crate::server::ServerCommand;
use crate::types::{ConnectionId, Identity};

/// Handle an established connection
///
/// Registers with the ChatServer, then runs a read task and a write task
/// until either side ends. A read failure or a timed-out write both end
/// the connection, after which `Disconnect` is sent.
pub async fn handle_connection<S>(
    stream: S,
    identity: Identity,
    cmd_tx: mpsc::Sender<ServerCommand>,
    limits: LimitsConfig,
) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    limits.validate()?;

    let framed = Framed::new(stream, LinesCodec::new_with_max_length(limits.max_line_length));
    let (mut sink, mut lines) = framed.split();

    // Channel for server -> client lines
    let (msg_tx, mut msg_rx) = mpsc::channel::<String>(limits.outbound_queue);
    let handle = ConnectionHandle::new(identity, msg_tx);
    let id = handle.id();
    info!("Connection {} established for {}", id, handle.identity());

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            handle: handle.clone(),
        })
        .await
        .is_err()
    {
        error!("Failed to register connection {} - server closed", id);
        return Err(AppError::ChannelSend);
    }

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (lines -> ServerCommand)
    let mut read_task = tokio::spawn(async move {
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Read error for {}: {}", id, e);
                    break;
                }
            };

            let cmd = match ClientCommand::parse(&line) {
                Ok(cmd) => into_server_command(id, cmd),
                Err(e) => Err(ServerMessage::from(e)),
            };

            match cmd {
                Ok(cmd) => {
                    if cmd_tx_read.send(cmd).await.is_err() {
                        debug!("Server closed, ending read task for {}", id);
                        break;
                    }
                }
                // Answered without touching shared state
                Err(reply) => {
                    if handle.write(reply).is_err() {
                        debug!("Local reply to {} dropped", id);
                    }
                }
            }
        }
        debug!("Read task ended for {}", id);
    });

    // Spawn write task (queued lines -> socket)
    let write_timeout = limits.write_timeout();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = msg_rx.recv().await {
            match timeout(write_timeout, sink.send(line)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!("Write failed for {}: {}", id, e);
                    break;
                }
                Err(_) => {
                    warn!("Write to {} timed out after {:?}", id, write_timeout);
                    break;
                }
            }
        }
        debug!("Write task ended for {}", id);

        let _ = timeout(write_timeout, sink.close()).await;
    });

    // Wait for either task to complete, then stop the other
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", id);
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", id);
        }
    }
    read_task.abort();
    write_task.abort();

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { id }).await;

    info!("Connection {} closed", id);

    Ok(())
}

/// Convert a parsed ClientCommand to a ServerCommand
///
/// Commands that need no shared state come back as `Err(reply)`.
fn into_server_command(id: ConnectionId, cmd: ClientCommand) -> Result<ServerCommand, ServerMessage> {
    match cmd {
        ClientCommand::Create(room) => Ok(ServerCommand::Create { id, room }),
        ClientCommand::Join(room) => Ok(ServerCommand::Join { id, room }),
        ClientCommand::Msg(text) => Ok(ServerCommand::Message { id, text }),
        ClientCommand::Kick(target) => Ok(ServerCommand::Kick { id, target }),
        ClientCommand::Ban(target) => Ok(ServerCommand::Ban { id, target }),
        ClientCommand::AddBot => Ok(ServerCommand::AddBot { id }),
        ClientCommand::Typing => Ok(ServerCommand::Typing { id }),
        ClientCommand::Help => Err(ServerMessage::Help),
        ClientCommand::Unknown => Err(ServerMessage::Unknown),
    }
}
