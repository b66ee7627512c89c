//! Headless watch-party client
//!
//! Joins a room, runs the synchronization engine against a simulated
//! player, prints chat and presence to the terminal and reads chat (or host
//! commands) from stdin.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::{Arg, Command};
use log::error;
use once_cell::sync::Lazy;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use lockstep::config::{SyncTuning, app_name, version};
use lockstep::engine::{EngineEvent, Identity, SyncEngine};
use lockstep::net;
use lockstep::player::SimulatedPlayer;
use lockstep::protocol::{ClientMessage, validate_chat};
use lockstep::utils::sos::SignalOfStop;

static SESSION_SEQ: Lazy<AtomicU32> = Lazy::new(|| AtomicU32::new(0));

/// Session ids only need to be unique per server, not secret.
fn new_session_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}-{:x}", nanos, SESSION_SEQ.fetch_add(1, Ordering::Relaxed))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let matches = Command::new(app_name())
        .version(version())
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new("server")
                .short('s')
                .long("server")
                .value_name("URL")
                .help("Room server base URL.")
                .default_value("ws://127.0.0.1:8000"),
        )
        .arg(
            Arg::new("room")
                .short('r')
                .long("room")
                .value_name("CODE")
                .help("Room code to join.")
                .required(true),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .value_name("NAME")
                .help("Display name shown to other participants.")
                .required(true),
        )
        .get_matches();

    let server = matches.get_one::<String>("server").unwrap();
    let room = matches.get_one::<String>("room").unwrap();
    let name = matches.get_one::<String>("name").unwrap().clone();

    let sos = SignalOfStop::new();
    {
        let sos = sos.clone();
        ctrlc::set_handler(move || sos.cancel())?;
    }

    let url = format!("{}/ws/watch/{}/", server.trim_end_matches('/'), room);
    let conn = net::connect(&url, sos.clone()).await?;
    let outbound = conn.outbound.clone();

    let tuning = SyncTuning::default();
    let (player, player_events) = SimulatedPlayer::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let engine = SyncEngine::new(
        tuning.clone(),
        Identity {
            session_id: new_session_id(),
            username: name,
        },
        Arc::new(player.clone()),
        player_events,
        conn.inbound,
        conn.outbound,
        events_tx,
        sos.clone(),
    );
    let engine_task = tokio::spawn(engine.run());

    // A real embedding would wait for the video widget; the simulated
    // player is ready as soon as it exists.
    player.make_ready();

    println!("connected - type a message to chat, /help for commands");
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = sos.wait_cancellation() => break,
            ev = events_rx.recv() => match ev {
                Some(ev) => {
                    if print_event(ev) {
                        break;
                    }
                }
                None => break,
            },
            line = stdin.next_line() => match line {
                Ok(Some(line)) => {
                    if handle_line(&line, &player, &outbound, &tuning).await {
                        break;
                    }
                }
                _ => break, // stdin closed
            },
        }
    }

    sos.cancel();
    let _ = engine_task.await;
    Ok(())
}

/// Print one engine event. Returns true when the session is over.
fn print_event(ev: EngineEvent) -> bool {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    match ev {
        EngineEvent::RoleAssigned { is_host, video_url } => {
            let role = if is_host { "host" } else { "viewer" };
            println!("[{}] joined as {} (video: {})", stamp, role, video_url);
        }
        EngineEvent::Chat { username, message } => {
            println!("[{}] <{}> {}", stamp, username, message);
        }
        EngineEvent::UserJoined { username } => {
            println!("[{}] * {} joined the party", stamp, username);
        }
        EngineEvent::UserLeft { username } => {
            println!("[{}] * {} left the party", stamp, username);
        }
        EngineEvent::ServerError { message } => {
            println!("[{}] server: {}", stamp, message);
        }
        EngineEvent::RoomClosed { reason } => {
            println!("[{}] {}", stamp, reason);
            return true;
        }
        EngineEvent::ConnectionLost => {
            println!("[{}] connection lost - run again to rejoin", stamp);
            return true;
        }
    }
    false
}

/// Handle one stdin line. Returns true to quit.
async fn handle_line(
    line: &str,
    player: &SimulatedPlayer,
    outbound: &mpsc::Sender<ClientMessage>,
    tuning: &SyncTuning,
) -> bool {
    match line.trim() {
        "" => {}
        "/help" => {
            println!("/play /pause /seek <seconds> /status /quit - anything else is chat");
            println!("playback commands only take effect when you are the host");
        }
        "/play" => player.user_play(),
        "/pause" => player.user_pause(),
        "/status" => {
            println!(
                "position {:.1}s rate {:.2} {}",
                player.position(),
                player.rate(),
                if player.playing() { "playing" } else { "paused" }
            );
        }
        "/quit" => return true,
        cmd if cmd.starts_with("/seek ") => {
            match cmd.trim_start_matches("/seek ").trim().parse::<f64>() {
                Ok(seconds) if seconds >= 0.0 => player.user_seek(seconds),
                _ => println!("usage: /seek <seconds>"),
            }
        }
        text => match validate_chat(text, tuning.max_chat_len) {
            Ok(message) => {
                if outbound.send(ClientMessage::Chat { message }).await.is_err() {
                    error!("transport closed, cannot send chat");
                    return true;
                }
            }
            Err(e) => println!("{}", e),
        },
    }
    false
}
