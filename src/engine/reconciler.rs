//! Drift reconciliation policy
//!
//! The algorithmic core of viewer-side sync. Drift between the
//! latency-compensated host position and the local player falls into one of
//! three zones: large drift is corrected with a hard seek, moderate drift by
//! temporarily running the player slightly fast or slow, and small drift is
//! left alone at normal speed. Rate nudging is what keeps ordinary network
//! jitter from turning into visible seek pops; hard seeks are reserved for
//! genuine desync such as a host seek or a reconnect.
//!
//! Play/pause reconciliation is orthogonal to the drift zone: a paused host
//! pauses the viewer no matter how small the drift is.

use crate::config::SyncTuning;
use crate::engine::state::SyncReport;

/// Positional correction decided for one reconciliation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftAction {
    /// Jump straight to the target and reset the rate to 1.0.
    Seek { target: f64 },
    /// Run at `rate` until drift shrinks; no seek.
    Nudge { rate: f64 },
    /// Within tolerance: make sure the rate is back at 1.0.
    Lock,
}

/// Play/pause correction decided for one reconciliation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    Play,
    /// Pause and reset the rate, so a later resume starts at normal speed.
    Pause,
    None,
}

/// Local player telemetry sampled at the start of a tick.
#[derive(Debug, Clone, Copy)]
pub struct PlayerTelemetry {
    pub current_time: f64,
    pub is_playing: bool,
}

/// Decide the positional correction for the given report and telemetry.
///
/// `latency_offset` shifts the target to where the host is *now* rather
/// than where it was when the report left it.
pub fn classify_drift(
    report: &SyncReport,
    telemetry: &PlayerTelemetry,
    latency_offset: f64,
    tuning: &SyncTuning,
) -> DriftAction {
    let target = report.current_time + latency_offset;
    let diff = target - telemetry.current_time;
    let abs_diff = diff.abs();

    if abs_diff > tuning.hard_seek_threshold {
        DriftAction::Seek { target }
    } else if abs_diff > tuning.nudge_threshold && report.is_playing {
        let intensity = (abs_diff * tuning.nudge_gain).min(tuning.nudge_cap);
        let rate = if diff > 0.0 {
            1.0 + intensity
        } else {
            1.0 - intensity
        };
        DriftAction::Nudge { rate }
    } else {
        DriftAction::Lock
    }
}

/// Decide the play/pause correction, independent of the drift zone.
pub fn classify_transport(report: &SyncReport, telemetry: &PlayerTelemetry) -> TransportAction {
    match (report.is_playing, telemetry.is_playing) {
        (true, false) => TransportAction::Play,
        (false, true) => TransportAction::Pause,
        _ => TransportAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> SyncTuning {
        SyncTuning::default()
    }

    fn telemetry(current_time: f64, is_playing: bool) -> PlayerTelemetry {
        PlayerTelemetry {
            current_time,
            is_playing,
        }
    }

    #[test]
    fn test_large_drift_hard_seeks() {
        let report = SyncReport::new(100.0, true);
        let action = classify_drift(&report, &telemetry(95.0, true), 0.2, &tuning());
        // absDiff = 5.2 -> seek to the compensated target
        assert_eq!(action, DriftAction::Seek { target: 100.2 });
    }

    #[test]
    fn test_moderate_drift_nudges_ahead() {
        // target 100.3, local 100.0 -> behind by 0.3s, speed up
        let report = SyncReport::new(100.3, true);
        let action = classify_drift(&report, &telemetry(100.0, true), 0.0, &tuning());
        match action {
            DriftAction::Nudge { rate } => assert!((rate - 1.06).abs() < 1e-9),
            other => panic!("expected nudge, got {:?}", other),
        }
    }

    #[test]
    fn test_moderate_drift_nudges_behind() {
        // local ahead of target by 0.3s, slow down
        let report = SyncReport::new(100.0, true);
        let action = classify_drift(&report, &telemetry(100.3, true), 0.0, &tuning());
        match action {
            DriftAction::Nudge { rate } => assert!((rate - 0.94).abs() < 1e-9),
            other => panic!("expected nudge, got {:?}", other),
        }
    }

    #[test]
    fn test_nudge_intensity_is_capped() {
        // 0.5s drift * 0.2 gain = 0.1, exactly at the cap
        let report = SyncReport::new(100.5, true);
        let action = classify_drift(&report, &telemetry(100.0, true), 0.0, &tuning());
        match action {
            DriftAction::Nudge { rate } => assert!((rate - 1.1).abs() < 1e-9),
            other => panic!("expected nudge, got {:?}", other),
        }
    }

    #[test]
    fn test_small_drift_locks() {
        let report = SyncReport::new(100.05, true);
        let action = classify_drift(&report, &telemetry(100.0, true), 0.0, &tuning());
        assert_eq!(action, DriftAction::Lock);
    }

    #[test]
    fn test_no_nudge_while_host_paused() {
        // Moderate drift but host paused: nudging a paused player is useless.
        let report = SyncReport::new(100.3, false);
        let action = classify_drift(&report, &telemetry(100.0, false), 0.0, &tuning());
        assert_eq!(action, DriftAction::Lock);
    }

    #[test]
    fn test_latency_offset_shifts_target() {
        // Without compensation this would be in the locked zone.
        let report = SyncReport::new(100.0, true);
        let action = classify_drift(&report, &telemetry(100.0, true), 0.15, &tuning());
        assert!(matches!(action, DriftAction::Nudge { .. }));
    }

    #[test]
    fn test_transport_independent_of_zone() {
        // Tiny drift, but host is paused while local plays.
        let report = SyncReport::new(100.0, false);
        let t = telemetry(100.01, true);
        assert_eq!(classify_drift(&report, &t, 0.0, &tuning()), DriftAction::Lock);
        assert_eq!(classify_transport(&report, &t), TransportAction::Pause);
    }

    #[test]
    fn test_transport_play_when_host_playing() {
        let report = SyncReport::new(50.0, true);
        assert_eq!(
            classify_transport(&report, &telemetry(50.0, false)),
            TransportAction::Play
        );
        assert_eq!(
            classify_transport(&report, &telemetry(50.0, true)),
            TransportAction::None
        );
    }
}
