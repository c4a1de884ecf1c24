//! Game configuration
//!
//! Loaded from RON at startup. Every field has a default, so a config file
//! only needs the values it changes:
//!
//! ```ron
//! (room_width: 320.0, debug_boxes: true, log_filter: "jetfly=debug")
//! ```

use std::fs;
use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::game::command::CommandType;
use crate::tile::{layer, DEFAULT_TILE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Initial room size; levels replace it when built
    pub room_width: f32,
    pub room_height: f32,
    pub tile_size: f32,
    /// Upper bound for one frame's delta, seconds
    pub max_delta: f32,
    pub collision_layer: String,
    /// Command types that may be raised with `add_static`
    pub static_commands: Vec<CommandType>,
    pub debug_boxes: bool,
    /// Default tracing filter; `RUST_LOG` wins when set
    pub log_filter: String,
    pub next_level_time_max: f32,
    pub next_level_time_speed: f32,
    /// RON level list; the bundled levels are used when unset
    pub levels_path: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            room_width: 240.0,
            room_height: 160.0,
            tile_size: DEFAULT_TILE_SIZE,
            max_delta: 1.0 / 20.0,
            collision_layer: layer::COLLISION.to_string(),
            static_commands: vec![
                CommandType::NextLevel,
                CommandType::Restart,
                CommandType::ClearedLevel,
                CommandType::Pause,
                CommandType::PlayerNormal,
                CommandType::PlayerDead,
            ],
            debug_boxes: false,
            log_filter: "jetfly=info".to_string(),
            next_level_time_max: 35.0,
            next_level_time_speed: 10.0,
            levels_path: None,
        }
    }
}

impl GameConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("room_width", self.room_width),
            ("room_height", self.room_height),
            ("tile_size", self.tile_size),
            ("max_delta", self.max_delta),
            ("next_level_time_speed", self.next_level_time_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.collision_layer.is_empty() {
            return Err(ConfigError::Invalid("collision_layer is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.static_commands.len(), 6);
        assert_eq!(config.next_level_time_max, 35.0);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = GameConfig::from_ron_str("(room_width: 320.0, debug_boxes: true)").unwrap();
        assert_eq!(config.room_width, 320.0);
        assert!(config.debug_boxes);
        assert_eq!(config.room_height, 160.0);
        assert_eq!(config.collision_layer, "Collision");
    }

    #[test]
    fn test_static_commands_by_name() {
        let config = GameConfig::from_ron_str("(static_commands: [PlayerDead, Pause])").unwrap();
        assert_eq!(config.static_commands, vec![CommandType::PlayerDead, CommandType::Pause]);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(GameConfig::from_ron_str("(max_delta: 0.0)"), Err(ConfigError::Invalid(_))));
        assert!(matches!(GameConfig::from_ron_str("(tile_size: -16.0)"), Err(ConfigError::Invalid(_))));
        assert!(matches!(GameConfig::from_ron_str("(collision_layer: \"\")"), Err(ConfigError::Invalid(_))));
        assert!(matches!(GameConfig::from_ron_str("(room_width: \"wide\")"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(log_filter: \"jetfly=trace\", levels_path: Some(\"levels.ron\"))").unwrap();
        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.log_filter, "jetfly=trace");
        assert_eq!(config.levels_path.as_deref(), Some("levels.ron"));

        assert!(matches!(GameConfig::load("/nonexistent/jetfly.ron"), Err(ConfigError::Io(_))));
    }
}
