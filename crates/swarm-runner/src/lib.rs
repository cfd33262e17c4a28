//! Swarm Runner: runs a configured swarm of painting agents against a canvas
//! API.
//!
//! This crate wraps the kernel with everything a deployment needs:
//! - Settings files (TOML or JSON) describing zones, agents and timings
//! - An HTTP client for the canvas API
//! - An event monitor that keeps the activity ranking current and collects
//!   run statistics
//! - An offline preview of a single agent

pub mod http_api;
pub mod monitor;
pub mod preview;
pub mod settings;
pub mod swarm;
