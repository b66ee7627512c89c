//! Player-control capability
//!
//! The engine never talks to a concrete video widget; it drives whatever
//! implements [`PlayerControl`] and listens to the event stream the player
//! produces. Transitions are reported for every play/pause change, whether a
//! human or the engine caused it; the action guard on the engine side is
//! what tells the two apart.

pub mod simulated;

use anyhow::Result;
use async_trait::async_trait;

pub use simulated::SimulatedPlayer;

/// State transitions and lifecycle notifications from the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The player finished internal initialization and accepts commands.
    Ready,
    /// Playback started (any cause).
    Playing,
    /// Playback paused (any cause).
    Paused,
}

/// Control surface of the local video player.
///
/// Commands may fail on an uninitialized or torn-down player; callers log
/// and skip the tick, relying on the next tick as the retry.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    /// Current playback position in seconds.
    async fn current_time(&self) -> Result<f64>;

    /// Whether the player is currently playing.
    async fn is_playing(&self) -> Result<bool>;

    /// Jump to an absolute position in seconds.
    async fn seek(&self, seconds: f64) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Set the playback rate multiplier (1.0 = normal speed).
    async fn set_rate(&self, rate: f64) -> Result<()>;
}
