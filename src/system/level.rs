//! Level system
//!
//! Level data, the builder that turns it into queued entities and a tile
//! map, and the `LevelSystem` that tracks progress: collecting, reaching
//! the goal, the countdown to the next level and game over.
//!
//! Levels are RON:
//!
//! ```ron
//! (
//!     name: "first flight",
//!     size: (320.0, 160.0),
//!     collision: [
//!         "11111111111111111111",
//!         "1..................1",
//!     ],
//!     obstacles: [(kind: "asteroid", x: 150.0, y: 80.0, width: 16.0, height: 16.0, key: Some("rock"))],
//!     player: Some((x: 40.0, y: 80.0, width: 12.0, height: 12.0)),
//!     foods: [(x: 150.0, y: 60.0, width: 8.0, height: 8.0, parent: Some("rock"))],
//! )
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use macroquad::math::Vec2;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{error, info, warn};
use crate::game::command::{Command, CommandQueue, CommandType};
use crate::game::entity::{BodyKind, Entity, EntityId, EntityState, EntityType};
use crate::game::manager::{EntityManager, ParentRef, QueueTicket};
use crate::tile::{TileMap, TileProperties};
use super::{Action, FrameSystem, SystemContext};

/// Group ids created for every level
pub mod group {
    pub const OBSTACLE: &str = "obstacle";
    pub const COLLECTABLE: &str = "collectable";
    pub const ENEMY: &str = "enemy";
}

/// Limits for level validation
pub mod limits {
    /// Maximum room edge in pixels
    pub const MAX_ROOM_SIZE: f32 = 16384.0;
    /// Maximum entities of one section (obstacles, foods, ...)
    pub const MAX_SECTION_LEN: usize = 1024;
}

/// Error type for level loading and building
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("level {0} does not exist")]
    MissingLevel(usize),
}

/// Obstacle entry. `kind` is `"asteroid"` or `"goal"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleData {
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub radius: Option<f32>,
    /// Name collectables use to orbit this obstacle
    #[serde(default)]
    pub key: Option<String>,
}

/// Player or enemy entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorData {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub radius: Option<f32>,
}

/// Food or item entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectableData {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Offset from the collector once carried
    #[serde(default)]
    pub collected_offset: (f32, f32),
    /// Obstacle key to orbit
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelData {
    #[serde(default)]
    pub name: String,
    /// Room size in pixels
    pub size: (f32, f32),
    /// Marks the closing screen: building it ends the game
    #[serde(default)]
    pub game_over: bool,
    /// Collision rows, one char per cell: a digit is a tile index,
    /// `.` or a space is empty
    #[serde(default)]
    pub collision: Vec<String>,
    #[serde(default)]
    pub tile_properties: HashMap<i32, TileProperties>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleData>,
    #[serde(default)]
    pub player: Option<ActorData>,
    #[serde(default)]
    pub enemies: Vec<ActorData>,
    #[serde(default)]
    pub foods: Vec<CollectableData>,
    #[serde(default)]
    pub items: Vec<CollectableData>,
}

fn valid_float(v: f32) -> bool {
    v.is_finite() && v.abs() <= limits::MAX_ROOM_SIZE
}

impl LevelData {
    pub fn from_ron_str(s: &str) -> Result<Self, LevelError> {
        let level: LevelData = ron::from_str(s)?;
        level.validate()?;
        Ok(level)
    }

    pub fn room(&self) -> Vec2 {
        Vec2::new(self.size.0, self.size.1)
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        let (w, h) = self.size;
        if !(w > 0.0 && h > 0.0) || !valid_float(w) || !valid_float(h) {
            return Err(LevelError::Validation(format!("invalid room size {}x{}", w, h)));
        }

        if let Some(first) = self.collision.first() {
            let width = first.chars().count();
            for (i, row) in self.collision.iter().enumerate() {
                if row.chars().count() != width {
                    return Err(LevelError::Validation(format!(
                        "collision row {} has {} cells, expected {}", i, row.chars().count(), width
                    )));
                }
                if let Some(c) = row.chars().find(|c| !(c.is_ascii_digit() || *c == '.' || *c == ' ')) {
                    return Err(LevelError::Validation(format!("collision row {}: bad cell '{}'", i, c)));
                }
            }
        }

        let sections = [
            ("obstacles", self.obstacles.len()),
            ("enemies", self.enemies.len()),
            ("foods", self.foods.len()),
            ("items", self.items.len()),
        ];
        for (name, len) in sections {
            if len > limits::MAX_SECTION_LEN {
                return Err(LevelError::Validation(format!(
                    "too many {} ({} > {})", name, len, limits::MAX_SECTION_LEN
                )));
            }
        }

        let positions = self.obstacles.iter().map(|o| (o.x, o.y, o.width, o.height))
            .chain(self.player.iter().chain(&self.enemies).map(|a| (a.x, a.y, a.width, a.height)))
            .chain(self.foods.iter().chain(&self.items).map(|c| (c.x, c.y, c.width, c.height)));
        for (x, y, w, h) in positions {
            if !(valid_float(x) && valid_float(y) && valid_float(w) && valid_float(h)) || w < 0.0 || h < 0.0 {
                return Err(LevelError::Validation(format!("invalid entity bounds ({}, {}, {}, {})", x, y, w, h)));
            }
        }
        Ok(())
    }

    /// Tile map with the collision rows on `layer` and the property table.
    pub fn tile_map(&self, tile_size: f32, layer: &str) -> Result<TileMap, LevelError> {
        let mut map = TileMap::new(tile_size);
        let height = self.collision.len();
        let width = self.collision.first().map(|r| r.chars().count()).unwrap_or(0);
        let indices: Vec<i32> = self
            .collision
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| c.to_digit(10).map(|d| d as i32).unwrap_or(-1))
            .collect();
        map.add_layer(layer, width, height, indices)
            .map_err(|e| LevelError::Validation(e.to_string()))?;
        for (index, props) in &self.tile_properties {
            map.set_properties(*index, props.clone());
        }
        Ok(map)
    }
}

/// Parse a RON list of levels.
pub fn load_levels_from_str(s: &str) -> Result<Vec<LevelData>, LevelError> {
    let levels: Vec<LevelData> = ron::from_str(s)?;
    for (i, level) in levels.iter().enumerate() {
        level.validate().map_err(|e| LevelError::Validation(format!("level {}: {}", i, e)))?;
    }
    Ok(levels)
}

pub fn load_levels<P: AsRef<Path>>(path: P) -> Result<Vec<LevelData>, LevelError> {
    let contents = fs::read_to_string(path)?;
    load_levels_from_str(&contents)
}

/// What a successful build hands back to the caller.
#[derive(Debug)]
pub struct BuiltLevel {
    pub tiles: TileMap,
    pub room: Vec2,
    pub player: Option<QueueTicket>,
}

/// Create the groups, then queue obstacles, the player, enemies, foods and
/// items, in that order. Obstacles go first so collectables can name one
/// as their parent.
pub fn build_level(
    data: &LevelData,
    manager: &mut EntityManager,
    tile_size: f32,
    collision_layer: &str,
) -> Result<BuiltLevel, LevelError> {
    data.validate()?;
    let tiles = data.tile_map(tile_size, collision_layer)?;

    manager.create_group(group::OBSTACLE, BodyKind::Static);
    manager.create_group(group::COLLECTABLE, BodyKind::Static);
    manager.create_group(group::ENEMY, BodyKind::Dynamic);

    let mut keys: HashMap<&str, QueueTicket> = HashMap::new();
    for o in &data.obstacles {
        let size = Vec2::new(o.width, o.height);
        let entity = match o.kind.as_str() {
            "asteroid" => Entity::new(EntityType::Asteroid, Vec2::new(o.x, o.y), size)
                .with_radius(o.radius.unwrap_or(o.width * 0.5)),
            "goal" => Entity::new(EntityType::Goal, Vec2::new(o.x, o.y), size),
            other => {
                error!(kind = other, level = %data.name, "unknown obstacle type, skipped");
                continue;
            }
        };
        let ticket = manager.add_entity_to_add(entity, BodyKind::Static, Some(group::OBSTACLE), None);
        if let Some(key) = &o.key {
            keys.insert(key.as_str(), ticket);
        }
    }

    let player = data.player.as_ref().map(|p| {
        let entity = Entity::new(EntityType::Player, Vec2::new(p.x, p.y), Vec2::new(p.width, p.height))
            .with_radius(p.radius.unwrap_or(p.width * 0.5));
        manager.add_entity_to_add(entity, BodyKind::Dynamic, None, None)
    });

    for e in &data.enemies {
        let entity = Entity::new(EntityType::Enemy, Vec2::new(e.x, e.y), Vec2::new(e.width, e.height));
        manager.add_entity_to_add(entity, BodyKind::Dynamic, Some(group::ENEMY), None);
    }

    let collectables = data.foods.iter().map(|c| (EntityType::Food, c))
        .chain(data.items.iter().map(|c| (EntityType::Item, c)));
    for (kind, c) in collectables {
        let parent = match &c.parent {
            Some(key) => match keys.get(key.as_str()) {
                Some(&ticket) => Some(ParentRef::Queued(ticket)),
                None => {
                    warn!(key = %key, level = %data.name, "unknown parent key, collectable floats free");
                    None
                }
            },
            None => None,
        };
        let entity = Entity::new(kind, Vec2::new(c.x, c.y), Vec2::new(c.width, c.height))
            .with_collected_offset(Vec2::new(c.collected_offset.0, c.collected_offset.1));
        manager.add_entity_to_add(entity, BodyKind::Static, Some(group::COLLECTABLE), parent);
    }

    info!(level = %data.name, obstacles = data.obstacles.len(), "level built");
    Ok(BuiltLevel { tiles, room: data.room(), player })
}

/// Level progress.
#[derive(Debug, Clone)]
pub struct LevelSystem {
    pub levels: Vec<LevelData>,
    pub level: usize,
    /// A level change is pending; the owner rebuilds on seeing it
    pub next: bool,
    pub complete: bool,
    pub gameover: bool,
    pub food_collected: bool,
    /// Countdown from completion to `NextLevel`
    pub next_level_time: f32,
    pub next_level_time_max: f32,
    pub next_level_time_speed: f32,
}

impl LevelSystem {
    pub fn new(levels: Vec<LevelData>, next_level_time_max: f32, next_level_time_speed: f32) -> Self {
        Self {
            levels,
            level: 0,
            next: false,
            complete: false,
            gameover: false,
            food_collected: false,
            next_level_time: next_level_time_max,
            next_level_time_max,
            next_level_time_speed,
        }
    }

    pub fn current(&self) -> Option<&LevelData> {
        self.levels.get(self.level)
    }

    /// Build the current level into `manager`. Content errors are logged and
    /// leave the level empty.
    pub fn create_level(
        &mut self,
        manager: &mut EntityManager,
        tile_size: f32,
        collision_layer: &str,
    ) -> Option<BuiltLevel> {
        self.next = false;
        self.complete = false;
        self.food_collected = false;
        self.next_level_time = self.next_level_time_max;

        let Some(data) = self.levels.get(self.level) else {
            error!(error = %LevelError::MissingLevel(self.level), "cannot create level");
            return None;
        };
        if data.game_over {
            info!(level = self.level, "final screen reached");
            self.gameover = true;
            return None;
        }

        match build_level(data, manager, tile_size, collision_layer) {
            Ok(built) => Some(built),
            Err(e) => {
                error!(level = self.level, error = %e, "level abandoned");
                None
            }
        }
    }

    /// Forget per-level state before a rebuild.
    pub fn clean(&mut self) {
        self.gameover = false;
        self.food_collected = false;
    }

    fn find_player(ctx: &SystemContext<'_>) -> Option<EntityId> {
        ctx.graph.find(|e| e.entity_type == EntityType::Player).map(|e| e.id)
    }

    fn player_active(ctx: &SystemContext<'_>, player_id: EntityId) -> bool {
        ctx.graph.get_entity(player_id).map(|p| !p.is_dead() && !p.is_goal()).unwrap_or(false)
    }

    /// Player touching obstacles and collectables.
    fn interact(&mut self, ctx: &mut SystemContext<'_>, player_id: EntityId) {
        if !Self::player_active(ctx, player_id) {
            return;
        }

        if let Some(obstacles) = ctx.group(group::OBSTACLE) {
            let hits = obstacles.overlapping(ctx.graph, player_id);
            let at_goal = hits.iter().any(|&id| {
                ctx.graph.get_entity(id).map(|e| e.entity_type == EntityType::Goal).unwrap_or(false)
            });
            if at_goal && self.food_collected {
                if let Some(player) = ctx.graph.get_entity_mut(player_id) {
                    player.current_state = EntityState::Goal;
                }
            }
        }

        if !Self::player_active(ctx, player_id) {
            return;
        }

        let hits = ctx
            .group(group::COLLECTABLE)
            .map(|g| g.overlapping(ctx.graph, player_id))
            .unwrap_or_default();
        for id in hits {
            let carried = ctx.graph.get_node(id).map(|n| n.parent_id == player_id).unwrap_or(true);
            let Some(entity) = ctx.graph.get_entity_mut(id) else { continue };
            if entity.is_collected() || carried {
                continue;
            }
            entity.current_state = EntityState::Collected;
            if entity.entity_type == EntityType::Food {
                self.food_collected = true;
            }
            ctx.commands.add(Command::move_child(id, player_id));
        }
    }
}

impl FrameSystem for LevelSystem {
    fn command(&mut self, command: &Command, _commands: &mut CommandQueue) {
        match command.kind {
            CommandType::NextLevel | CommandType::Restart if !self.next => {
                if command.kind == CommandType::NextLevel {
                    self.level += 1;
                } else if self.current().map(|l| l.game_over).unwrap_or(false) {
                    self.level = 0;
                }
                self.next = true;
            }
            CommandType::PlayerDead => self.gameover = true,
            CommandType::ClearedLevel => self.next_level_time = self.next_level_time_max,
            _ => {}
        }
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) {
        if self.gameover {
            if ctx.input.is_pressed(Action::Confirm) {
                ctx.commands.add_static(CommandType::Restart);
            }
            return;
        }

        if self.complete && self.next_level_time > 0.0 {
            self.next_level_time -= self.next_level_time_speed * ctx.delta;
            if self.next_level_time <= 0.0 {
                ctx.commands.add_static(CommandType::NextLevel);
            }
        }
    }

    fn post_update(&mut self, ctx: &mut SystemContext<'_>) {
        if self.gameover || self.complete {
            return;
        }
        let Some(player_id) = Self::find_player(ctx) else {
            return;
        };

        self.interact(ctx, player_id);

        self.complete = ctx.graph.get_entity(player_id).map(|p| p.is_goal()).unwrap_or(false);
        if self.complete {
            info!(level = self.level, "level complete");
            ctx.commands.clear();
            ctx.commands.add_static(CommandType::Pause);
            self.next_level_time = self.next_level_time_max;
        }
    }
}
