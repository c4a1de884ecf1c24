//! Frame systems
//!
//! Systems sit beside the entity graph: they see every drained command
//! before the graph does, and get a slot before and after the traversal
//! plus one after removal. Unlike entity hooks they may read and mutate
//! any entity, through `SystemContext::graph`. Structural changes still go
//! through the command queue.

pub mod camera;
pub mod input;
pub mod level;

use std::collections::HashMap;
use macroquad::math::Vec2;
use crate::game::command::{Command, CommandQueue};
use crate::game::graph::EntityGraph;
use crate::game::manager::Group;

pub use camera::{CameraSystem, Follow};
pub use input::{Action, InputState};
pub use level::{LevelData, LevelError, LevelSystem};

/// What a system sees in the update, post-update and late phases.
pub struct SystemContext<'a> {
    pub time: f32,
    pub delta: f32,
    pub room: Vec2,
    pub graph: &'a mut EntityGraph,
    pub groups: &'a HashMap<String, Group>,
    pub commands: &'a mut CommandQueue,
    pub input: &'a InputState,
}

impl<'a> SystemContext<'a> {
    pub fn group(&self, id: &str) -> Option<&'a Group> {
        self.groups.get(id)
    }
}

/// A command consumer with per-frame slots. Every method defaults to a
/// no-op.
pub trait FrameSystem {
    /// Called once per drained command, before the graph applies it.
    fn command(&mut self, _command: &Command, _commands: &mut CommandQueue) {}

    /// Before the graph traversal
    fn update(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// After the graph traversal, before removal
    fn post_update(&mut self, _ctx: &mut SystemContext<'_>) {}

    /// After removal
    fn late_update(&mut self, _ctx: &mut SystemContext<'_>) {}
}
