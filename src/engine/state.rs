//! Shared synchronization state
//!
//! Holds the latest authoritative report, the handshake-done flag and the
//! action guard. Everything here is touched from the single engine loop
//! only, so there is no locking; the guard is a classification flag, not a
//! mutex.

use std::time::{Duration, Instant};

/// Authoritative playback snapshot from the host. Superseded wholesale by
/// the next report, never merged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncReport {
    /// Host playback position in seconds at send time.
    pub current_time: f64,
    pub is_playing: bool,
    /// When this client observed the report (local monotonic time).
    pub observed_at: Instant,
}

impl SyncReport {
    pub fn new(current_time: f64, is_playing: bool) -> Self {
        Self {
            current_time,
            is_playing,
            observed_at: Instant::now(),
        }
    }
}

/// Marks player mutations as engine-inflicted for a bounded settle window,
/// so the resulting player events are not misread as user actions.
///
/// Deadline based: holding the guard again extends the window, and expiry
/// needs no timer because callers only ever ask "is it held right now".
#[derive(Debug, Default)]
pub struct ActionGuard {
    held_until: Option<Instant>,
}

impl ActionGuard {
    pub fn new() -> Self {
        Self { held_until: None }
    }

    /// Hold the guard for `window` from now.
    pub fn hold(&mut self, window: Duration) {
        self.held_until = Some(Instant::now() + window);
    }

    pub fn is_held(&self) -> bool {
        self.held_until.is_some_and(|t| Instant::now() < t)
    }
}

/// Per-connection synchronization state.
#[derive(Debug, Default)]
pub struct SyncState {
    /// Latest report, last writer wins.
    report: Option<SyncReport>,
    /// Whether the initial sync handshake has completed.
    handshake_done: bool,
    pub guard: ActionGuard,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            report: None,
            handshake_done: false,
            guard: ActionGuard::new(),
        }
    }

    /// Replace the authoritative report.
    pub fn store_report(&mut self, report: SyncReport) {
        self.report = Some(report);
    }

    pub fn report(&self) -> Option<&SyncReport> {
        self.report.as_ref()
    }

    pub fn handshake_done(&self) -> bool {
        self.handshake_done
    }

    pub fn mark_handshake_done(&mut self) {
        self.handshake_done = true;
    }
}
