//! One-way latency estimation from probe round trips
//!
//! The engine sends `ping` probes and halves the observed round-trip time.
//! A short window of samples is averaged so a single delayed echo does not
//! yank the offset around. Only one probe is outstanding at a time; if its
//! echo never arrives the next probe simply replaces it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use log::debug;

/// Smoothed one-way latency estimate built from probe round trips.
#[derive(Debug)]
pub struct LatencyEstimator {
    /// Most recent one-way samples, oldest first. Never exceeds `window`.
    samples: VecDeque<f64>,
    /// Send time of the probe currently in flight, if any.
    outstanding: Option<Instant>,
    window: usize,
}

impl LatencyEstimator {
    pub fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window),
            outstanding: None,
            window,
        }
    }

    /// Record that a probe was just sent. An unanswered previous probe is
    /// abandoned: its echo, should it still arrive, will be attributed to
    /// this one, which only errs the estimate upward briefly.
    pub fn probe_sent(&mut self, now: Instant) {
        self.outstanding = Some(now);
    }

    /// Record the echo for the outstanding probe. Echoes with no matching
    /// probe are ignored.
    pub fn echo_received(&mut self, now: Instant) {
        let Some(sent) = self.outstanding.take() else {
            debug!("ignoring echo with no outstanding probe");
            return;
        };
        let rtt = now.saturating_duration_since(sent);
        let one_way_ms = rtt.as_secs_f64() * 1000.0 / 2.0;

        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(one_way_ms);

        debug!(
            "latency sample {:.1}ms (avg {:.1}ms over {})",
            one_way_ms,
            self.offset_seconds() * 1000.0,
            self.samples.len()
        );
    }

    /// Current one-way latency estimate in seconds: the arithmetic mean of
    /// the retained samples, 0.0 before any echo arrived.
    pub fn offset_seconds(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().sum();
        sum / self.samples.len() as f64 / 1000.0
    }

    /// Number of samples currently retained.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    fn push_sample(&mut self, one_way_ms: f64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(one_way_ms);
    }
}

/// Probe cadence: a burst right after connect to calibrate quickly, then a
/// slow steady interval. Yields the delay to wait before each probe.
#[derive(Debug)]
pub struct ProbeSchedule {
    fired: usize,
    steady: Duration,
}

impl ProbeSchedule {
    pub fn new(steady: Duration) -> Self {
        Self { fired: 0, steady }
    }

    /// Delay before the next probe. The calibration burst lands probes at
    /// connect time, +0.5s, +1s and +2s; afterwards the steady interval.
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.fired {
            0 => Duration::ZERO,
            1 | 2 => Duration::from_millis(500),
            3 => Duration::from_secs(1),
            _ => self.steady,
        };
        self.fired += 1;
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_mean_of_samples() {
        let mut est = LatencyEstimator::new(5);
        assert_eq!(est.offset_seconds(), 0.0);

        est.push_sample(10.0);
        assert!((est.offset_seconds() - 0.010).abs() < 1e-9);

        est.push_sample(20.0);
        est.push_sample(30.0);
        // mean(10, 20, 30) = 20ms
        assert!((est.offset_seconds() - 0.020).abs() < 1e-9);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut est = LatencyEstimator::new(5);
        for ms in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0] {
            est.push_sample(ms);
        }
        assert_eq!(est.sample_count(), 5);
        // mean(30, 40, 50, 60, 70) = 50ms
        assert!((est.offset_seconds() - 0.050).abs() < 1e-9);
    }

    #[test]
    fn test_probe_echo_pairing() {
        let mut est = LatencyEstimator::new(5);
        let t0 = Instant::now();

        est.probe_sent(t0);
        est.echo_received(t0 + Duration::from_millis(80));
        assert_eq!(est.sample_count(), 1);
        // 80ms RTT -> 40ms one way
        assert!((est.offset_seconds() - 0.040).abs() < 1e-6);

        // Echo without an outstanding probe is dropped.
        est.echo_received(t0 + Duration::from_millis(200));
        assert_eq!(est.sample_count(), 1);
    }

    #[test]
    fn test_abandoned_probe_replaced() {
        let mut est = LatencyEstimator::new(5);
        let t0 = Instant::now();

        est.probe_sent(t0);
        // No echo; a new probe takes over the slot.
        est.probe_sent(t0 + Duration::from_secs(2));
        est.echo_received(t0 + Duration::from_secs(2) + Duration::from_millis(20));

        assert_eq!(est.sample_count(), 1);
        assert!((est.offset_seconds() - 0.010).abs() < 1e-6);
    }

    #[test]
    fn test_calibration_burst_then_steady() {
        let mut sched = ProbeSchedule::new(Duration::from_secs(2));
        assert_eq!(sched.next_delay(), Duration::ZERO);
        assert_eq!(sched.next_delay(), Duration::from_millis(500));
        assert_eq!(sched.next_delay(), Duration::from_millis(500));
        assert_eq!(sched.next_delay(), Duration::from_secs(1));
        for _ in 0..10 {
            assert_eq!(sched.next_delay(), Duration::from_secs(2));
        }
    }
}
