//! Wall-clock-driven virtual player
//!
//! Stands in for a real video widget in the headless client and in tests.
//! Position advances with wall time scaled by the playback rate, so rate
//! nudges and seeks behave like they would on a real player.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

use super::{PlayerControl, PlayerEvent};

#[derive(Debug)]
struct PlayerState {
    /// Position at the last anchor point, in seconds.
    position: f64,
    /// When `position` was anchored.
    anchored_at: Instant,
    playing: bool,
    rate: f64,
    ready: bool,
}

impl PlayerState {
    /// Position now, extrapolated from the anchor while playing.
    fn current(&self) -> f64 {
        if self.playing {
            self.position + self.anchored_at.elapsed().as_secs_f64() * self.rate
        } else {
            self.position
        }
    }

    /// Re-anchor at the current position before changing playback params.
    fn anchor(&mut self) {
        self.position = self.current();
        self.anchored_at = Instant::now();
    }
}

/// A playerless player: a clock dressed up as a video widget.
#[derive(Clone)]
pub struct SimulatedPlayer {
    state: Arc<Mutex<PlayerState>>,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

impl SimulatedPlayer {
    /// Create a player and the event stream the engine will consume.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let player = Self {
            state: Arc::new(Mutex::new(PlayerState {
                position: 0.0,
                anchored_at: Instant::now(),
                playing: false,
                rate: 1.0,
                ready: false,
            })),
            events: tx,
        };
        (player, rx)
    }

    /// Mark the player ready and notify listeners. Idempotent.
    pub fn make_ready(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.ready {
            state.ready = true;
            drop(state);
            let _ = self.events.send(PlayerEvent::Ready);
        }
    }

    /// Play initiated by the local user rather than the engine. Emits the
    /// same event the engine-initiated path does; classification is the
    /// engine's job.
    pub fn user_play(&self) {
        self.transition(true);
    }

    pub fn user_pause(&self) {
        self.transition(false);
    }

    pub fn user_seek(&self, seconds: f64) {
        let mut state = self.state.lock().unwrap();
        state.anchor();
        state.position = seconds.max(0.0);
    }

    /// Current playback rate, exposed for tests and the client UI.
    pub fn rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    /// Synchronous playing flag for the client UI.
    pub fn playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    /// Synchronous position read for the client UI.
    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().current()
    }

    fn transition(&self, playing: bool) {
        let mut state = self.state.lock().unwrap();
        if state.playing == playing {
            return;
        }
        state.anchor();
        state.playing = playing;
        drop(state);
        let _ = self.events.send(if playing {
            PlayerEvent::Playing
        } else {
            PlayerEvent::Paused
        });
    }
}

#[async_trait]
impl PlayerControl for SimulatedPlayer {
    async fn current_time(&self) -> Result<f64> {
        let state = self.state.lock().unwrap();
        if !state.ready {
            bail!("player not ready");
        }
        Ok(state.current())
    }

    async fn is_playing(&self) -> Result<bool> {
        let state = self.state.lock().unwrap();
        if !state.ready {
            bail!("player not ready");
        }
        Ok(state.playing)
    }

    async fn seek(&self, seconds: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.ready {
            bail!("player not ready");
        }
        state.anchor();
        state.position = seconds.max(0.0);
        debug!("seek -> {:.3}s", state.position);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        if !self.state.lock().unwrap().ready {
            bail!("player not ready");
        }
        self.transition(true);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        if !self.state.lock().unwrap().ready {
            bail!("player not ready");
        }
        self.transition(false);
        Ok(())
    }

    async fn set_rate(&self, rate: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.ready {
            bail!("player not ready");
        }
        state.anchor();
        state.rate = rate;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_not_ready_rejects_commands() {
        let (player, _events) = SimulatedPlayer::new();
        assert!(player.seek(10.0).await.is_err());
        assert!(player.play().await.is_err());
        assert!(player.current_time().await.is_err());

        player.make_ready();
        assert!(player.seek(10.0).await.is_ok());
        assert!((player.current_time().await.unwrap() - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_position_advances_while_playing() {
        let (player, _events) = SimulatedPlayer::new();
        player.make_ready();
        player.seek(100.0).await.unwrap();
        player.play().await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let pos = player.current_time().await.unwrap();
        assert!(pos > 100.0 && pos < 101.0, "pos = {}", pos);

        player.pause().await.unwrap();
        let frozen = player.current_time().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(player.current_time().await.unwrap(), frozen);
    }

    #[tokio::test]
    async fn test_rate_scales_position() {
        let (player, _events) = SimulatedPlayer::new();
        player.make_ready();
        player.set_rate(2.0).await.unwrap();
        player.play().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let pos = player.current_time().await.unwrap();
        // 100ms at 2x should land near 0.2s
        assert!(pos > 0.15 && pos < 0.4, "pos = {}", pos);
    }

    #[tokio::test]
    async fn test_events_on_transitions_only() {
        let (player, mut events) = SimulatedPlayer::new();
        player.make_ready();
        assert_eq!(events.recv().await, Some(PlayerEvent::Ready));

        player.make_ready(); // idempotent, no second Ready
        player.user_play();
        player.user_play(); // no transition, no event
        player.user_pause();

        assert_eq!(events.recv().await, Some(PlayerEvent::Playing));
        assert_eq!(events.recv().await, Some(PlayerEvent::Paused));
        assert!(events.try_recv().is_err());
    }
}
