//! Initial sync handshake
//!
//! A viewer joining mid-session must jump to the host's position once
//! before continuous reconciliation is allowed to run; otherwise the
//! reconciler and the initial jump would fight over the player. The
//! handshake arms when the player is ready and at least one report has been
//! seen, waits a short grace delay for the player to finish settling, fires
//! exactly once, then stays done for the connection's lifetime.

use std::time::{Duration, Instant};

/// One-shot handshake state machine. The engine owns the clock: it arms the
/// machine, sleeps until [`InitialSync::due_at`], then fires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialSync {
    /// Waiting for player readiness and a first report.
    Waiting { player_ready: bool },
    /// Both preconditions met; fire at the deadline.
    Armed { due: Instant },
    Done,
}

impl InitialSync {
    pub fn new() -> Self {
        Self::Waiting {
            player_ready: false,
        }
    }

    /// Note that the local player reported ready.
    pub fn player_ready(&mut self, have_report: bool, grace: Duration) {
        if let Self::Waiting { .. } = self {
            *self = if have_report {
                Self::Armed {
                    due: Instant::now() + grace,
                }
            } else {
                Self::Waiting { player_ready: true }
            };
        }
    }

    /// Note that a sync report arrived.
    pub fn report_seen(&mut self, grace: Duration) {
        if let Self::Waiting { player_ready: true } = self {
            *self = Self::Armed {
                due: Instant::now() + grace,
            };
        }
    }

    /// Deadline to fire at, if armed.
    pub fn due_at(&self) -> Option<Instant> {
        match self {
            Self::Armed { due } => Some(*due),
            _ => None,
        }
    }

    /// Push the deadline forward by `grace`. Used when the deadline is hit
    /// but the role answer is still in flight.
    pub fn defer(&mut self, grace: Duration) {
        if let Self::Armed { due } = self {
            *due = Instant::now() + grace;
        }
    }

    /// Consume the armed state. Returns true exactly once.
    pub fn fire(&mut self) -> bool {
        if matches!(self, Self::Armed { .. }) {
            *self = Self::Done;
            true
        } else {
            false
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Default for InitialSync {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRACE: Duration = Duration::from_millis(500);

    #[test]
    fn test_arms_only_with_both_preconditions() {
        let mut hs = InitialSync::new();
        assert!(hs.due_at().is_none());

        hs.player_ready(false, GRACE);
        assert!(hs.due_at().is_none());

        hs.report_seen(GRACE);
        assert!(hs.due_at().is_some());
    }

    #[test]
    fn test_arms_when_report_precedes_ready() {
        // The server sends a sync snapshot on connect, often before role or
        // player init; readiness is then the arming edge.
        let mut hs = InitialSync::new();
        hs.report_seen(GRACE); // ignored while not ready
        assert!(hs.due_at().is_none());

        hs.player_ready(true, GRACE);
        assert!(hs.due_at().is_some());
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut hs = InitialSync::new();
        hs.player_ready(true, GRACE);
        assert!(hs.fire());
        assert!(hs.is_done());

        // Repeat triggers are no-ops.
        assert!(!hs.fire());
        hs.player_ready(true, GRACE);
        hs.report_seen(GRACE);
        assert!(hs.is_done());
        assert!(hs.due_at().is_none());
    }

    #[test]
    fn test_defer_pushes_deadline() {
        let mut hs = InitialSync::new();
        hs.player_ready(true, GRACE);
        let first = hs.due_at().unwrap();

        std::thread::sleep(Duration::from_millis(5));
        hs.defer(GRACE);
        assert!(hs.due_at().unwrap() > first);
    }

    #[test]
    fn test_grace_delay_applied() {
        let mut hs = InitialSync::new();
        let before = Instant::now();
        hs.player_ready(true, GRACE);
        let due = hs.due_at().unwrap();
        assert!(due >= before + GRACE);
    }
}
