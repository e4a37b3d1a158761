use crate::protocol::{decode_inbound, Envelope};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Payload of one inbound envelope, cut at an arbitrary point
    Chunk(String),
    Connected,
    Disconnected,
    Error(String),
}

pub struct MudConnection;

impl MudConnection {
    /// Connect to the game proxy and pump frames until either side closes.
    ///
    /// Inbound envelopes are unwrapped and forwarded as [`ServerMessage::Chunk`];
    /// outbound envelopes from `command_rx` are written as text frames.
    pub async fn start(
        url: &str,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
        mut command_rx: mpsc::UnboundedReceiver<Envelope>,
    ) -> Result<()> {
        info!("Connecting to {}...", url);

        let (stream, _response) = match connect_async(url).await {
            Ok(ok) => ok,
            Err(e) => {
                let _ = server_tx.send(ServerMessage::Error(e.to_string()));
                let _ = server_tx.send(ServerMessage::Disconnected);
                return Err(e).context("Failed to connect to game server");
            }
        };

        info!("Connected successfully");
        let _ = server_tx.send(ServerMessage::Connected);

        let (mut writer, mut reader) = stream.split();

        // Spawn reader task
        let server_tx_clone = server_tx.clone();
        let mut read_handle = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Some(data) = decode_inbound(&text) {
                            if server_tx_clone.send(ServerMessage::Chunk(data)).is_err() {
                                break;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("Connection closed by server");
                        break;
                    }
                    Ok(other) => {
                        debug!("Ignoring non-text frame: {:?}", other);
                    }
                    Err(e) => {
                        error!("Error reading from server: {}", e);
                        let _ = server_tx_clone.send(ServerMessage::Error(e.to_string()));
                        break;
                    }
                }
            }
            let _ = server_tx_clone.send(ServerMessage::Disconnected);
        });

        // Writer loop (runs in this function) until the reader finishes or
        // the command channel closes
        loop {
            tokio::select! {
                _ = &mut read_handle => break,
                cmd = command_rx.recv() => {
                    let Some(envelope) = cmd else { break };
                    debug!("Sending command: {}", envelope.data);
                    let json = envelope.to_json().context("Failed to encode command")?;
                    if let Err(e) = writer.send(Message::Text(json)).await {
                        error!("Failed to write command: {}", e);
                        break;
                    }
                }
            }
        }

        read_handle.abort();
        let _ = writer.close().await;
        Ok(())
    }
}
