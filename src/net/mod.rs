//! WebSocket transport adapter
//!
//! Bridges the room server's WebSocket to the engine's message channels: a
//! writer task serializes outbound messages, a reader task parses inbound
//! frames. Malformed frames are logged and dropped; a dropped socket closes
//! the inbound channel, which the engine reports as a lost connection.

use anyhow::{Context, Result};
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::{Message, Utf8Bytes};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::sync::mpsc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::utils::sos::SignalOfStop;

/// Channel ends handed to the engine (and, for chat, the UI).
pub struct Connection {
    pub inbound: mpsc::Receiver<ServerMessage>,
    pub outbound: mpsc::Sender<ClientMessage>,
}

/// Connect to the room endpoint and spawn the pump tasks. Both tasks stop
/// when the signal fires or the socket dies.
pub async fn connect(url: &str, sos: SignalOfStop) -> Result<Connection> {
    let (ws_stream, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {}", url))?;
    info!("connected to {}", url);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (inbound_tx, inbound_rx) = mpsc::channel::<ServerMessage>(64);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientMessage>(64);

    sos.spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::Text(Utf8Bytes::from(text))).await {
                warn!("websocket send failed: {}", e);
                break;
            }
        }
    });

    sos.spawn(async move {
        while let Some(frame) = ws_receiver.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(msg) => {
                            if inbound_tx.send(msg).await.is_err() {
                                break; // engine gone
                            }
                        }
                        Err(e) => warn!("dropping malformed message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("server closed the connection");
                    break;
                }
                Ok(_) => {} // ping/pong/binary handled by the stack
                Err(e) => {
                    warn!("websocket error: {}", e);
                    break;
                }
            }
        }
        // inbound_tx drops here; the engine sees the channel close.
    });

    Ok(Connection {
        inbound: inbound_rx,
        outbound: outbound_tx,
    })
}
