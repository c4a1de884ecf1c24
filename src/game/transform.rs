//! Transform cascade data
//!
//! During the update pass every node hands its children a `Transform`: a
//! read-only copy of its own state plus the velocity it inherits. Children
//! never hold references into the parent, only these snapshots.

use macroquad::math::Vec2;
use crate::collision::Aabb;
use super::entity::{EntityId, EntityState, EntityType};

/// Read-only copy of the parts of an entity other entities may look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub state: EntityState,
    pub position: Vec2,
    pub velocity: Vec2,
    pub offset: Vec2,
    pub radius: f32,
    pub aabb: Aabb,
}

impl EntitySnapshot {
    /// The snapshot of the sentinel root
    pub fn is_null(&self) -> bool {
        self.entity_type == EntityType::Null
    }

    pub fn is_dead(&self) -> bool {
        self.state == EntityState::Dead
    }

    pub fn is_collected(&self) -> bool {
        self.state == EntityState::Collected
    }
}

/// Parent transform applied to a child before it integrates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// The entity this transform belongs to (the child's parent)
    pub entity: EntitySnapshot,
    /// That entity's own parent, if it is not the root
    pub parent: Option<EntitySnapshot>,
    pub position: Vec2,
    /// Own velocity plus the immediate parent's
    pub velocity: Vec2,
    pub offset: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Entity;

    #[test]
    fn test_snapshot_copies_state() {
        let mut e = Entity::new(EntityType::Player, Vec2::new(3.0, 4.0), Vec2::new(8.0, 8.0));
        e.current_state = EntityState::Dead;
        let s = e.snapshot();
        assert!(s.is_dead());
        assert!(!s.is_null());
        assert_eq!(s.aabb, e.aabb);

        // later changes do not leak into the copy
        e.position = Vec2::ZERO;
        assert_eq!(s.position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_root_snapshot_is_null() {
        assert!(Entity::null().snapshot().is_null());
    }
}
