//! Playback synchronization engine
//!
//! One [`SyncEngine`] per connection, running a single event loop: inbound
//! protocol messages, the reconcile and broadcast ticks, latency probes,
//! player callbacks and the handshake grace deadline are all arms of one
//! `tokio::select!`, so no two steps ever interleave and the sync state
//! needs no locking. Every timer is owned by the loop and dies with it.

pub mod broadcast;
pub mod handshake;
pub mod reconciler;
pub mod state;

pub use broadcast::HostBroadcaster;
pub use handshake::InitialSync;
pub use reconciler::{DriftAction, PlayerTelemetry, TransportAction};
pub use state::{ActionGuard, SyncReport, SyncState};

use std::future::pending;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval, sleep_until};

use crate::config::SyncTuning;
use crate::latency::{LatencyEstimator, ProbeSchedule};
use crate::player::{PlayerControl, PlayerEvent};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::RoleResolver;
use crate::utils::sos::SignalOfStop;

use reconciler::{classify_drift, classify_transport};

/// Who we are when joining the room.
#[derive(Debug, Clone)]
pub struct Identity {
    pub session_id: String,
    pub username: String,
}

/// Notifications for the embedding application (UI, CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    RoleAssigned { is_host: bool, video_url: String },
    Chat { username: String, message: String },
    UserJoined { username: String },
    UserLeft { username: String },
    /// Terminal: the party ended; the engine has already shut down.
    RoomClosed { reason: String },
    /// Advisory error relayed from the server.
    ServerError { message: String },
    /// The transport dropped; a fresh engine on a fresh connection is the
    /// only way back in.
    ConnectionLost,
}

/// Outcome of handling one loop event.
enum Outcome {
    Continue,
    RoomClosed,
    ConnectionLost,
    PlayerGone,
}

/// Per-connection synchronization engine.
///
/// Viewers steer their player after the host's reports; the host samples
/// its player and feeds the room. Which side is active is decided by the
/// role handshake and never changes within a connection.
pub struct SyncEngine {
    tuning: SyncTuning,
    identity: Identity,
    player: Arc<dyn PlayerControl>,
    player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    inbound: mpsc::Receiver<ServerMessage>,
    outbound: mpsc::Sender<ClientMessage>,
    events: mpsc::UnboundedSender<EngineEvent>,
    role: RoleResolver,
    state: SyncState,
    latency: LatencyEstimator,
    probes: ProbeSchedule,
    handshake: InitialSync,
    broadcaster: HostBroadcaster,
    sos: SignalOfStop,
}

impl SyncEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tuning: SyncTuning,
        identity: Identity,
        player: Arc<dyn PlayerControl>,
        player_events: mpsc::UnboundedReceiver<PlayerEvent>,
        inbound: mpsc::Receiver<ServerMessage>,
        outbound: mpsc::Sender<ClientMessage>,
        events: mpsc::UnboundedSender<EngineEvent>,
        sos: SignalOfStop,
    ) -> Self {
        let latency = LatencyEstimator::new(tuning.latency_window);
        let probes = ProbeSchedule::new(tuning.probe_interval);
        Self {
            tuning,
            identity,
            player,
            player_events,
            inbound,
            outbound,
            events,
            role: RoleResolver::new(),
            state: SyncState::new(),
            latency,
            probes,
            handshake: InitialSync::new(),
            broadcaster: HostBroadcaster::new(),
            sos,
        }
    }

    /// Run the engine until the room closes, the transport drops or the
    /// stop signal fires. Consumes the engine: per-connection state cannot
    /// outlive the connection.
    pub async fn run(mut self) -> Result<()> {
        info!("joining room as '{}'", self.identity.username);
        self.outbound
            .send(ClientMessage::Join {
                session_id: self.identity.session_id.clone(),
                username: self.identity.username.clone(),
            })
            .await
            .map_err(|_| anyhow!("transport closed before join"))?;

        let mut reconcile = interval(self.tuning.reconcile_interval);
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast = interval(self.tuning.broadcast_interval);
        broadcast.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut next_probe = Instant::now() + self.probes.next_delay();

        loop {
            let handshake_due = self.handshake.due_at();

            let outcome = tokio::select! {
                _ = self.sos.wait_cancellation() => break,
                msg = self.inbound.recv() => match msg {
                    Some(msg) => self.handle_message(msg).await,
                    None => Outcome::ConnectionLost,
                },
                _ = sleep_until(next_probe.into()) => {
                    next_probe = Instant::now() + self.probes.next_delay();
                    self.send_probe().await
                }
                _ = reconcile.tick() => {
                    self.reconcile_tick().await;
                    Outcome::Continue
                }
                _ = broadcast.tick() => self.broadcast_tick().await,
                ev = self.player_events.recv() => match ev {
                    Some(ev) => self.handle_player_event(ev).await,
                    None => Outcome::PlayerGone,
                },
                _ = sleep_opt(handshake_due) => {
                    self.run_initial_sync().await;
                    Outcome::Continue
                }
            };

            match outcome {
                Outcome::Continue => {}
                Outcome::RoomClosed => {
                    info!("room closed, shutting down engine");
                    break;
                }
                Outcome::ConnectionLost => {
                    warn!("connection lost");
                    let _ = self.events.send(EngineEvent::ConnectionLost);
                    break;
                }
                Outcome::PlayerGone => {
                    warn!("player event stream ended, shutting down engine");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Route one inbound message. The router owns no reconciliation logic;
    /// it updates state and delegates.
    async fn handle_message(&mut self, msg: ServerMessage) -> Outcome {
        match msg {
            ServerMessage::Pong => {
                self.latency.echo_received(Instant::now());
            }
            ServerMessage::Role { is_host, video_url } => {
                self.role.assign(is_host, video_url.clone());
                let _ = self
                    .events
                    .send(EngineEvent::RoleAssigned { is_host, video_url });
            }
            ServerMessage::Sync {
                current_time,
                is_playing,
            } => {
                // The server relays the host's own reports back; ignore them.
                if self.role.is_host() {
                    return Outcome::Continue;
                }
                self.state
                    .store_report(SyncReport::new(current_time, is_playing));
                self.handshake.report_seen(self.tuning.grace_delay);
                if self.state.handshake_done() {
                    self.reconcile_tick().await;
                }
            }
            ServerMessage::Chat { username, message } => {
                let _ = self.events.send(EngineEvent::Chat { username, message });
            }
            ServerMessage::UserJoined { username } => {
                let _ = self.events.send(EngineEvent::UserJoined { username });
            }
            ServerMessage::UserLeft { username } => {
                let _ = self.events.send(EngineEvent::UserLeft { username });
            }
            ServerMessage::RoomClosed { message } => {
                let _ = self.events.send(EngineEvent::RoomClosed { reason: message });
                return Outcome::RoomClosed;
            }
            ServerMessage::Error { message } => {
                warn!("server error: {}", message);
                let _ = self.events.send(EngineEvent::ServerError { message });
            }
            ServerMessage::Unknown => {
                debug!("ignoring unknown message kind");
            }
        }
        Outcome::Continue
    }

    async fn send_probe(&mut self) -> Outcome {
        self.latency.probe_sent(Instant::now());
        if self.outbound.send(ClientMessage::Ping).await.is_err() {
            Outcome::ConnectionLost
        } else {
            Outcome::Continue
        }
    }

    /// One reconciliation pass (viewer only). Player faults are logged and
    /// the pass is skipped; the next tick is the retry.
    async fn reconcile_tick(&mut self) {
        if !self.role.is_viewer() || !self.state.handshake_done() {
            return;
        }
        let Some(report) = self.state.report().copied() else {
            return;
        };
        let Some(telemetry) = self.read_telemetry().await else {
            return;
        };

        let offset = self.latency.offset_seconds();
        match classify_drift(&report, &telemetry, offset, &self.tuning) {
            DriftAction::Seek { target } => {
                debug!(
                    "hard seek: local {:.2}s -> target {:.2}s",
                    telemetry.current_time, target
                );
                self.state.guard.hold(self.tuning.settle_window);
                if let Err(e) = self.player.seek(target).await {
                    warn!("seek failed: {:#}", e);
                    return;
                }
                if let Err(e) = self.player.set_rate(1.0).await {
                    warn!("rate reset failed: {:#}", e);
                    return;
                }
            }
            DriftAction::Nudge { rate } => {
                if let Err(e) = self.player.set_rate(rate).await {
                    warn!("rate nudge failed: {:#}", e);
                    return;
                }
            }
            DriftAction::Lock => {
                if let Err(e) = self.player.set_rate(1.0).await {
                    warn!("rate reset failed: {:#}", e);
                    return;
                }
            }
        }

        match classify_transport(&report, &telemetry) {
            TransportAction::Play => {
                self.state.guard.hold(self.tuning.settle_window);
                if let Err(e) = self.player.play().await {
                    warn!("play failed: {:#}", e);
                }
            }
            TransportAction::Pause => {
                self.state.guard.hold(self.tuning.settle_window);
                if let Err(e) = self.player.pause().await {
                    warn!("pause failed: {:#}", e);
                    return;
                }
                if let Err(e) = self.player.set_rate(1.0).await {
                    warn!("rate reset failed: {:#}", e);
                }
            }
            TransportAction::None => {}
        }
    }

    /// Host cadence sample.
    async fn broadcast_tick(&mut self) -> Outcome {
        if !self.role.is_host() {
            return Outcome::Continue;
        }
        let Some(telemetry) = self.read_telemetry().await else {
            return Outcome::Continue;
        };
        if let Some(msg) = self.broadcaster.cadence_report(&telemetry)
            && self.outbound.send(msg).await.is_err()
        {
            return Outcome::ConnectionLost;
        }
        Outcome::Continue
    }

    async fn handle_player_event(&mut self, ev: PlayerEvent) -> Outcome {
        match ev {
            PlayerEvent::Ready => {
                info!("player ready");
                self.handshake
                    .player_ready(self.state.report().is_some(), self.tuning.grace_delay);
            }
            PlayerEvent::Playing | PlayerEvent::Paused => {
                let now_playing = matches!(ev, PlayerEvent::Playing);
                // Only the host turns its own transitions into reports.
                if !self.role.is_host() {
                    return Outcome::Continue;
                }
                let Some(telemetry) = self.read_telemetry().await else {
                    return Outcome::Continue;
                };
                if let Some(msg) = self.broadcaster.transition_report(
                    telemetry.current_time,
                    now_playing,
                    self.state.guard.is_held(),
                ) && self.outbound.send(msg).await.is_err()
                {
                    return Outcome::ConnectionLost;
                }
            }
        }
        Outcome::Continue
    }

    /// Jump to the host's last reported position, once per connection.
    async fn run_initial_sync(&mut self) {
        if self.role.get().is_none() {
            // Role answer still in flight: try again after another grace.
            self.handshake.defer(self.tuning.grace_delay);
            return;
        }
        if !self.handshake.fire() {
            return;
        }
        if self.role.is_host() {
            self.state.mark_handshake_done();
            return;
        }
        let Some(report) = self.state.report().copied() else {
            self.state.mark_handshake_done();
            return;
        };

        self.state.guard.hold(self.tuning.settle_window);
        if report.current_time > 0.0
            && let Err(e) = self.player.seek(report.current_time).await
        {
            warn!("initial seek failed: {:#}", e);
        }
        if report.is_playing
            && let Err(e) = self.player.play().await
        {
            warn!("initial play failed: {:#}", e);
        }
        self.state.mark_handshake_done();
        info!(
            "initial sync complete at {:.2}s (playing: {})",
            report.current_time, report.is_playing
        );
    }

    async fn read_telemetry(&self) -> Option<PlayerTelemetry> {
        let current_time = match self.player.current_time().await {
            Ok(v) => v,
            Err(e) => {
                debug!("telemetry unavailable: {:#}", e);
                return None;
            }
        };
        let is_playing = match self.player.is_playing().await {
            Ok(v) => v,
            Err(e) => {
                debug!("telemetry unavailable: {:#}", e);
                return None;
            }
        };
        Some(PlayerTelemetry {
            current_time,
            is_playing,
        })
    }
}

/// Sleep until the deadline, or forever when there is none.
async fn sleep_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at.into()).await,
        None => pending::<()>().await,
    }
}
