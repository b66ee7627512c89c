//! Engine tunables
//!
//! All synchronization thresholds live here. The zone boundaries and the
//! nudge formula were chosen empirically against real player behavior;
//! changing them changes how visible corrections are, not whether the
//! engine converges.

use std::time::Duration;

/// Tunable parameters for the synchronization engine.
#[derive(Debug, Clone)]
pub struct SyncTuning {
    /// Drift above which the engine hard-seeks instead of nudging (seconds).
    pub hard_seek_threshold: f64,
    /// Drift above which the engine nudges the playback rate (seconds).
    /// At or below this the player is considered locked.
    pub nudge_threshold: f64,
    /// Multiplier applied to the drift to obtain the nudge intensity.
    pub nudge_gain: f64,
    /// Maximum rate deviation from 1.0 (0.1 = at most 10% faster/slower).
    pub nudge_cap: f64,
    /// How often the host samples its player and emits a report while playing.
    pub broadcast_interval: Duration,
    /// How often a viewer re-evaluates drift between inbound reports.
    pub reconcile_interval: Duration,
    /// How long the action guard stays held after a programmatic command.
    pub settle_window: Duration,
    /// Delay between the player becoming ready and the initial sync jump.
    pub grace_delay: Duration,
    /// Number of one-way latency samples averaged into the offset.
    pub latency_window: usize,
    /// Steady-state interval between latency probes.
    pub probe_interval: Duration,
    /// Maximum accepted chat message length, in characters.
    pub max_chat_len: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            hard_seek_threshold: 0.5,
            nudge_threshold: 0.1,
            nudge_gain: 0.2,
            nudge_cap: 0.1,
            broadcast_interval: Duration::from_millis(500),
            reconcile_interval: Duration::from_millis(250),
            settle_window: Duration::from_millis(300),
            grace_delay: Duration::from_millis(500),
            latency_window: 5,
            probe_interval: Duration::from_secs(2),
            max_chat_len: 500,
        }
    }
}

/// Returns a version as specified in Cargo.toml
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
