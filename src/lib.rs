//! lockstep: keep a room full of players on the same frame-ish
//!
//! One participant is the host; its playback drives the session. Everyone
//! else runs a [`engine::SyncEngine`] that steers the local player after the
//! host's reports, compensating for network latency and smoothing small
//! drift with rate nudges instead of visible seeks.

pub mod config;
pub mod engine;
pub mod latency;
pub mod net;
pub mod player;
pub mod protocol;
pub mod session;
pub mod utils;
