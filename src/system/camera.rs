//! Camera follow
//!
//! Tracks one entity after removal has run, so it never looks at an entity
//! destroyed this frame. No easing: the view snaps to the target and is
//! clamped to the room.

use macroquad::math::Vec2;
use crate::game::command::{Command, CommandQueue, CommandType};
use crate::game::entity::{EntityId, EntityType};
use super::{FrameSystem, SystemContext};

/// What the camera tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Follow {
    #[default]
    Nothing,
    Id(EntityId),
    /// First entity of this kind, lowest id first
    Kind(EntityType),
}

#[derive(Debug, Clone)]
pub struct CameraSystem {
    pub follow: Follow,
    /// Top-left of the view in world space
    pub position: Vec2,
    /// View size in pixels
    pub view: Vec2,
}

impl CameraSystem {
    pub fn new(view: Vec2) -> Self {
        Self { follow: Follow::Nothing, position: Vec2::ZERO, view }
    }

    pub fn set_target_follow(&mut self, follow: Follow) {
        self.follow = follow;
    }

    /// Center the view on `target`, clamped so it stays inside `room`.
    /// An axis where the room is smaller than the view is centered.
    pub fn center_on(&mut self, target: Vec2, room: Vec2) {
        let clamp_axis = |t: f32, view: f32, room: f32| {
            if room <= view {
                (room - view) * 0.5
            } else {
                (t - view * 0.5).clamp(0.0, room - view)
            }
        };
        self.position = Vec2::new(
            clamp_axis(target.x, self.view.x, room.x),
            clamp_axis(target.y, self.view.y, room.y),
        );
    }

    /// World to view coordinates
    pub fn to_view(&self, world: Vec2) -> Vec2 {
        world - self.position
    }
}

impl FrameSystem for CameraSystem {
    fn command(&mut self, command: &Command, _commands: &mut CommandQueue) {
        if command.kind == CommandType::PlayerDead {
            self.follow = Follow::Nothing;
        }
    }

    fn late_update(&mut self, ctx: &mut SystemContext<'_>) {
        let target = match self.follow {
            Follow::Nothing => None,
            Follow::Id(id) => ctx.graph.get_entity(id),
            Follow::Kind(kind) => ctx.graph.find(|e| e.entity_type == kind),
        };
        if let Some(target) = target.map(|e| e.position) {
            self.center_on(target, ctx.room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_clamped_to_room() {
        let mut camera = CameraSystem::new(Vec2::new(100.0, 80.0));
        let room = Vec2::new(400.0, 200.0);

        camera.center_on(Vec2::new(200.0, 100.0), room);
        assert_eq!(camera.position, Vec2::new(150.0, 60.0));

        camera.center_on(Vec2::new(10.0, 10.0), room);
        assert_eq!(camera.position, Vec2::ZERO);

        camera.center_on(Vec2::new(395.0, 199.0), room);
        assert_eq!(camera.position, Vec2::new(300.0, 120.0));
        assert_eq!(camera.to_view(Vec2::new(395.0, 199.0)), Vec2::new(95.0, 79.0));
    }

    #[test]
    fn test_small_room_is_centered() {
        let mut camera = CameraSystem::new(Vec2::new(100.0, 80.0));
        camera.center_on(Vec2::new(30.0, 30.0), Vec2::new(60.0, 200.0));
        assert_eq!(camera.position.x, -20.0);
    }

    #[test]
    fn test_player_death_stops_following() {
        let mut camera = CameraSystem::new(Vec2::new(100.0, 80.0));
        camera.set_target_follow(Follow::Kind(EntityType::Player));
        let mut queue = CommandQueue::new();
        camera.command(&Command::new(CommandType::Pause), &mut queue);
        assert_eq!(camera.follow, Follow::Kind(EntityType::Player));
        camera.command(&Command::new(CommandType::PlayerDead), &mut queue);
        assert_eq!(camera.follow, Follow::Nothing);
    }
}
