//! Game context
//!
//! The application handle: owns the manager, the command queue, the input
//! latch, the tile map and the systems, and steps them one frame at a time.
//! Rebuilding the level when the level system asks for it happens here,
//! after the frame, so no phase ever sees a half-torn-down world.

use macroquad::math::Vec2;
use tracing::info;
use crate::config::GameConfig;
use crate::system::{CameraSystem, Follow, FrameSystem, InputState, LevelData, LevelSystem};
use crate::tile::TileMap;
use super::command::CommandQueue;
use super::entity::EntityType;
use super::graph::GraphError;
use super::manager::{EntityManager, FrameState};

pub struct GameContext {
    pub config: GameConfig,
    pub manager: EntityManager,
    pub commands: CommandQueue,
    pub input: InputState,
    pub camera: CameraSystem,
    pub level: LevelSystem,
    pub tiles: TileMap,
    /// Current room size in pixels
    pub room: Vec2,
    time: f32,
}

impl GameContext {
    pub fn new(config: GameConfig, levels: Vec<LevelData>) -> Self {
        let mut commands = CommandQueue::new();
        for &kind in &config.static_commands {
            commands.set_static(kind);
        }
        let room = Vec2::new(config.room_width, config.room_height);
        Self {
            manager: EntityManager::new(),
            commands,
            input: InputState::new(),
            camera: CameraSystem::new(room),
            level: LevelSystem::new(levels, config.next_level_time_max, config.next_level_time_speed),
            tiles: TileMap::new(config.tile_size),
            room,
            time: 0.0,
            config,
        }
    }

    /// Seconds simulated so far
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Queue the current level. Its entities appear on the next `update`.
    pub fn start(&mut self) {
        match self.level.create_level(&mut self.manager, self.config.tile_size, &self.config.collision_layer) {
            Some(built) => {
                self.tiles = built.tiles;
                self.room = built.room;
                self.camera.set_target_follow(Follow::Kind(EntityType::Player));
            }
            None => {
                self.tiles = TileMap::new(self.config.tile_size);
                self.camera.set_target_follow(Follow::Nothing);
            }
        }
    }

    /// Step one frame. `delta` is used as given; clamp it beforehand.
    pub fn update(&mut self, delta: f32) -> Result<(), GraphError> {
        self.time += delta;

        let state = FrameState {
            commands: &mut self.commands,
            input: &mut self.input,
            tiles: &self.tiles,
            room: self.room,
            collision_layer: &self.config.collision_layer,
        };
        let mut systems: [&mut dyn FrameSystem; 2] = [&mut self.camera, &mut self.level];
        self.manager.update(self.time, delta, state, &mut systems)?;

        if self.level.next {
            self.restart();
        }
        self.commands.late_update();
        Ok(())
    }

    /// Tear everything down and build the level the level system points at.
    fn restart(&mut self) {
        info!(level = self.level.level, "changing level");
        self.manager.destroy();
        self.manager.reset_id();
        self.commands.clear();
        self.level.clean();
        self.start();
    }
}
