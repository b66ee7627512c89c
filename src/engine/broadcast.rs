//! Host broadcast reports
//!
//! While the host's player is playing, its position is sampled on a fixed
//! cadence and sent to the room. Player transitions that the engine did not
//! cause itself are reported immediately, so viewers react to a host pause
//! or resume without waiting for the next tick. Nothing is sent while the
//! player sits paused; viewers converge to the locked zone and stay there.

use log::debug;

use crate::engine::reconciler::PlayerTelemetry;
use crate::protocol::ClientMessage;

/// Builds the host's outbound sync reports.
#[derive(Debug, Default)]
pub struct HostBroadcaster {
    reports_sent: u64,
}

impl HostBroadcaster {
    pub fn new() -> Self {
        Self { reports_sent: 0 }
    }

    /// Cadence sample. Only emits while playing.
    pub fn cadence_report(&mut self, telemetry: &PlayerTelemetry) -> Option<ClientMessage> {
        if !telemetry.is_playing {
            return None;
        }
        Some(self.report(telemetry.current_time, true))
    }

    /// Immediate report for a player transition. `self_inflicted` is the
    /// guard state: transitions the engine caused are suppressed.
    pub fn transition_report(
        &mut self,
        current_time: f64,
        now_playing: bool,
        self_inflicted: bool,
    ) -> Option<ClientMessage> {
        if self_inflicted {
            debug!("suppressing self-inflicted transition report");
            return None;
        }
        Some(self.report(current_time, now_playing))
    }

    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    fn report(&mut self, current_time: f64, is_playing: bool) -> ClientMessage {
        self.reports_sent += 1;
        ClientMessage::Sync {
            current_time,
            is_playing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_only_while_playing() {
        let mut b = HostBroadcaster::new();

        let paused = PlayerTelemetry {
            current_time: 12.0,
            is_playing: false,
        };
        assert!(b.cadence_report(&paused).is_none());

        let playing = PlayerTelemetry {
            current_time: 12.0,
            is_playing: true,
        };
        assert_eq!(
            b.cadence_report(&playing),
            Some(ClientMessage::Sync {
                current_time: 12.0,
                is_playing: true
            })
        );
        assert_eq!(b.reports_sent(), 1);
    }

    #[test]
    fn test_transition_reports_respect_guard() {
        let mut b = HostBroadcaster::new();

        // Engine-caused transition: nothing goes out.
        assert!(b.transition_report(30.0, false, true).is_none());
        assert_eq!(b.reports_sent(), 0);

        // Host hit pause themselves: report at once.
        assert_eq!(
            b.transition_report(30.0, false, false),
            Some(ClientMessage::Sync {
                current_time: 30.0,
                is_playing: false
            })
        );
    }
}
