//! Tile Grid
//!
//! The level's static geometry is a grid of square tiles split across named
//! layers. This module holds the tile data contract:
//! - `Tile`: one cell's record, as handed out by a tile provider
//! - `TileProperties`: per-index collision box and optional slope line
//! - `TileSource`: the provider trait the collision engine queries
//!
//! `TileMap` is the concrete grid provider; `collide` holds the broadphase
//! and slope narrowphase.

pub mod map;
pub mod collide;

use serde::{Serialize, Deserialize};

pub use map::{TileMap, TileLayer, TileMapError};
pub use collide::{TileCollision, TileQuery};

/// Well-known layer names
pub mod layer {
    pub const BACKGROUND: &str = "Background";
    pub const FOREGROUND: &str = "Foreground";
    pub const GROUND: &str = "Ground";
    pub const COLLISION: &str = "Collision";
}

/// Default tile edge length in pixels
pub const DEFAULT_TILE_SIZE: f32 = 16.0;

/// A single cell of a tile layer.
///
/// `index < 0` marks an empty cell. `x`/`y` are grid coordinates,
/// `pixel_x`/`pixel_y` the cell's top-left corner in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub index: i32,
    pub x: i32,
    pub y: i32,
    pub pixel_x: f32,
    pub pixel_y: f32,
}

impl Tile {
    pub fn is_empty(&self) -> bool {
        self.index < 0
    }

    /// Grid coordinate, used for ignore-list matching.
    pub fn grid(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Stair-step description of a sloped ground tile.
///
/// The anchor line runs from (x1, y1) to (x2, y2) relative to the cell's
/// top-left corner. Only left-to-right rising ground slopes are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeProperties {
    pub stepw: f32,
    pub steph: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Collision footprint of a tile index.
///
/// `width`/`height` of 0 fall back to the full tile size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TileProperties {
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub left: f32,
    #[serde(default)]
    pub top: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub slope: Option<SlopeProperties>,
}

/// Tile classification for filtered overlap queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileType {
    Solid = 0,
    Slope = 1,
}

/// Tile data provider.
///
/// Lookups outside the grid or on an unknown layer return `None`.
pub trait TileSource {
    /// Edge length of a tile in pixels
    fn tile_size(&self) -> f32;

    /// Tile at grid coordinates
    fn tile_at(&self, grid_x: i32, grid_y: i32, layer: &str) -> Option<Tile>;

    /// Collision properties registered for a tile index
    fn properties(&self, index: i32) -> Option<&TileProperties>;

    /// Tile covering a world-space pixel position
    fn tile_at_position(&self, pixel_x: f32, pixel_y: f32, layer: &str) -> Option<Tile> {
        let size = self.tile_size();
        self.tile_at((pixel_x / size).floor() as i32, (pixel_y / size).floor() as i32, layer)
    }
}
