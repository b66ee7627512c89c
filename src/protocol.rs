//! Wire protocol for the watch-party channel
//!
//! Messages are tagged JSON objects exchanged as WebSocket text frames over
//! an ordered, reliable stream. The server relays `sync` reports from the
//! host to every viewer and fans chat out to the whole room; everything the
//! engine needs is expressed by these two enums.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Messages sent by this client to the room server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce ourselves; the server answers with `Role`.
    Join {
        session_id: String,
        username: String,
    },
    /// Latency probe. Correlation is timestamp based, one in flight.
    Ping,
    /// Authoritative playback report (host only).
    Sync { current_time: f64, is_playing: bool },
    /// Room-wide chat message.
    Chat { message: String },
}

/// Messages received from the room server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Echo of the most recent `Ping`.
    Pong,
    /// Role assignment from the join handshake.
    Role { is_host: bool, video_url: String },
    /// Host playback report relayed to viewers.
    Sync { current_time: f64, is_playing: bool },
    Chat { username: String, message: String },
    UserJoined { username: String },
    UserLeft { username: String },
    /// Terminal: the host ended the party.
    RoomClosed { message: String },
    /// Advisory server-side error, non fatal.
    Error { message: String },
    /// Any message kind this build does not know about.
    #[serde(other)]
    Unknown,
}

/// Validate and normalize an outgoing chat message.
///
/// The server silently drops empty messages, so reject them here where the
/// caller can react; overlong messages are refused rather than truncated.
pub fn validate_chat(message: &str, max_len: usize) -> Result<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        bail!("chat message is empty");
    }
    if trimmed.chars().count() > max_len {
        bail!("chat message exceeds {} characters", max_len);
    }
    Ok(trimmed.to_string())
}
