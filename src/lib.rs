//! Encore, a real-time multi-room blind test quiz server.
//!
//! Master and player clients connect to a room over a WebSocket channel;
//! each room runs an authoritative [`engine`] that drives rounds and songs,
//! arbitrates buzz races by client timestamp, validates answers through
//! pluggable [`modes`] and [`media`] handlers, keeps the scores and fans
//! typed events out with per-audience redaction.

pub mod config;
pub mod engine;
pub mod housekeeping;
pub mod hub;
pub mod media;
pub mod models;
pub mod modes;
pub mod params;
pub mod protocol;
pub mod questions;
pub mod scoring;
pub mod server;
pub mod storage;
pub mod utils;
