//! jetfly: a small 2D arcade flyer built on a scene-graph entity core.
//!
//! - `collision`: bounding boxes and 2D overlap tests
//! - `tile`: tile grid data and tile collision queries
//! - `game`: entities, the entity graph, commands and the frame manager
//! - `system`: input, camera and level progress
//! - `config`: RON game configuration

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod collision;
pub mod tile;
pub mod game;
pub mod system;
pub mod config;
