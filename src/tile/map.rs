//! Grid-backed tile provider
//!
//! Layers are dense row-major index arrays (`-1` = empty). The per-index
//! property table is plain data and can be loaded from RON:
//!
//! ```ron
//! {
//!     2: (left: 0.0, top: 8.0, width: 16.0, height: 8.0),
//!     5: (slope: Some((stepw: 4.0, steph: 1.0, x1: 0.0, y1: 15.0, x2: 15.0, y2: 12.0))),
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use super::{Tile, TileProperties, TileSource, DEFAULT_TILE_SIZE};

/// Error type for tile map construction and property loading
#[derive(Debug, Error)]
pub enum TileMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("layer '{layer}' has {actual} cells, expected {expected}")]
    LayerSize { layer: String, expected: usize, actual: usize },
}

/// One named layer of tile indices.
#[derive(Debug, Clone)]
pub struct TileLayer {
    /// Width in tiles
    pub width: usize,
    /// Height in tiles
    pub height: usize,
    /// Row-major tile indices, negative for empty cells
    pub indices: Vec<i32>,
}

impl TileLayer {
    /// Empty layer of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, indices: vec![-1; width * height] }
    }

    fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<i32> {
        self.index_of(x, y).map(|i| self.indices[i])
    }

    pub fn set(&mut self, x: i32, y: i32, index: i32) {
        if let Some(i) = self.index_of(x, y) {
            self.indices[i] = index;
        }
    }
}

/// Tile map: named layers plus the shared property table.
#[derive(Debug, Clone)]
pub struct TileMap {
    tile_size: f32,
    layers: HashMap<String, TileLayer>,
    properties: HashMap<i32, TileProperties>,
}

impl TileMap {
    pub fn new(tile_size: f32) -> Self {
        Self {
            tile_size,
            layers: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    /// Add (or replace) a layer from row-major indices.
    pub fn add_layer(&mut self, name: &str, width: usize, height: usize, indices: Vec<i32>) -> Result<(), TileMapError> {
        if indices.len() != width * height {
            return Err(TileMapError::LayerSize {
                layer: name.to_string(),
                expected: width * height,
                actual: indices.len(),
            });
        }
        self.layers.insert(name.to_string(), TileLayer { width, height, indices });
        Ok(())
    }

    /// Add an empty layer if it does not exist yet.
    pub fn add_empty_layer(&mut self, name: &str, width: usize, height: usize) {
        self.layers
            .entry(name.to_string())
            .or_insert_with(|| TileLayer::new(width, height));
    }

    pub fn layer(&self, name: &str) -> Option<&TileLayer> {
        self.layers.get(name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut TileLayer> {
        self.layers.get_mut(name)
    }

    /// Set a single cell. Unknown layers and out-of-range cells are ignored.
    pub fn set_tile(&mut self, layer: &str, x: i32, y: i32, index: i32) {
        if let Some(l) = self.layers.get_mut(layer) {
            l.set(x, y, index);
        }
    }

    /// Register collision properties for a tile index.
    pub fn set_properties(&mut self, index: i32, props: TileProperties) {
        self.properties.insert(index, props);
    }

    /// Replace the property table from a RON map of index → properties.
    pub fn load_properties_str(&mut self, source: &str) -> Result<usize, TileMapError> {
        let table: HashMap<i32, TileProperties> = ron::from_str(source)?;
        let count = table.len();
        self.properties = table;
        Ok(count)
    }

    /// Replace the property table from a RON file.
    pub fn load_properties<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, TileMapError> {
        let contents = fs::read_to_string(path)?;
        self.load_properties_str(&contents)
    }
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_SIZE)
    }
}

impl TileSource for TileMap {
    fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn tile_at(&self, grid_x: i32, grid_y: i32, layer: &str) -> Option<Tile> {
        let index = self.layers.get(layer)?.get(grid_x, grid_y)?;
        Some(Tile {
            index,
            x: grid_x,
            y: grid_y,
            pixel_x: grid_x as f32 * self.tile_size,
            pixel_y: grid_y as f32 * self.tile_size,
        })
    }

    fn properties(&self, index: i32) -> Option<&TileProperties> {
        self.properties.get(&index)
    }
}
