//! Entity state
//!
//! An `Entity` is plain simulation state: position, velocity, bounds and a
//! small per-kind state machine. Behavior lives in the dispatch table in
//! `behavior.rs`, keyed by `EntityType`.
//!
//! Ids are assigned by the manager when the entity is materialized. `-1` is
//! reserved for the sentinel root, so a freshly built entity carries
//! `EntityId::NULL` until then.

use std::fmt;
use macroquad::math::Vec2;
use serde::{Serialize, Deserialize};
use crate::collision::Aabb;
use super::transform::{EntitySnapshot, Transform};

/// Identifier of an entity (and of the graph node that owns it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub i32);

impl EntityId {
    /// The sentinel id: "no entity", and the root of the graph.
    pub const NULL: EntityId = EntityId(-1);
    /// Alias used where the id names the graph root.
    pub const ROOT: EntityId = EntityId::NULL;

    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL.0
    }

    pub fn raw(&self) -> i32 {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::NULL
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed set of entity kinds. Tags match the level data format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EntityType {
    None = 0,
    Player = 1,
    Collectable = 2,
    Item = 3,
    Food = 4,
    Obstacle = 5,
    Goal = 6,
    Asteroid = 7,
    Enemy = 8,
    Null = 9,
}

impl EntityType {
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Collectable, Item and Food share the collect/orbit behavior
    pub fn is_collectable(self) -> bool {
        matches!(self, EntityType::Collectable | EntityType::Item | EntityType::Food)
    }

    pub fn is_obstacle(self) -> bool {
        matches!(self, EntityType::Obstacle | EntityType::Goal | EntityType::Asteroid)
    }

    /// Kinds whose physics body is a circle of `radius`
    pub fn has_circle_body(self) -> bool {
        self == EntityType::Player || self.is_collectable() || self.is_obstacle()
    }
}

/// Union of the per-kind state machines.
///
/// - Player: Normal → Goal | Dead
/// - Collectables: Normal ⇄ Collected
/// - everything else stays Normal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityState {
    #[default]
    Normal,
    Collected,
    Goal,
    Dead,
}

/// Physics body category, chosen when the entity is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Static,
    Dynamic,
}

/// Opaque physics body. The core only sizes it on setup and syncs it
/// every frame; nothing in here resolves contacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub kind: BodyKind,
    /// Top-left corner in world space
    pub position: Vec2,
    pub size: Vec2,
    /// Circle radius, for kinds with a circular body
    pub radius: Option<f32>,
}

impl Body {
    pub fn new(kind: BodyKind, size: Vec2) -> Self {
        Self { kind, position: Vec2::ZERO, size, radius: None }
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size * 0.5
    }
}

/// Float/orbit phase data for the bobbing kinds (angles in degrees).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub float_val: f32,
    pub float_dir: f32,
    pub float_spd: f32,
    pub orbit_val: f32,
    pub orbit_dir: f32,
    pub orbit_spd: f32,
    pub lerp_spd: f32,
    /// Collected entity has caught up with its collector
    pub in_pos: bool,
    pub collected_offset: Vec2,
}

impl Motion {
    pub fn for_kind(kind: EntityType) -> Self {
        let (float_val, float_spd) = match kind {
            EntityType::Goal => (2.0, 50.0),
            EntityType::Asteroid => (5.0, 100.0),
            k if k.is_collectable() => (5.0, 100.0),
            _ => (0.0, 0.0),
        };
        Self {
            float_val,
            float_dir: 0.0,
            float_spd,
            orbit_val: 5.0,
            orbit_dir: 0.0,
            orbit_spd: 100.0,
            lerp_spd: 0.15,
            in_pos: false,
            collected_offset: Vec2::ZERO,
        }
    }

    /// Advance the float phase, wrapping back to 0 at a full turn.
    pub fn advance_float(&mut self, delta: f32) -> f32 {
        self.float_dir += self.float_spd * delta;
        if self.float_dir >= 360.0 {
            self.float_dir = 0.0;
        }
        self.float_dir.to_radians()
    }

    pub fn advance_orbit(&mut self, delta: f32) {
        self.orbit_dir += self.orbit_spd * delta;
        if self.orbit_dir >= 360.0 {
            self.orbit_dir = 0.0;
        }
    }
}

/// A game entity.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub group_id: Option<String>,

    pub position: Vec2,
    pub prev_position: Vec2,
    /// Position at creation; the float animations bob around it
    pub initial_position: Vec2,
    pub velocity: Vec2,

    /// Width and height
    pub dimension: Vec2,
    /// Anchor offset of the bounds (usually half the dimension)
    pub offset: Vec2,
    pub body_offset: Vec2,
    pub radius: f32,
    pub aabb: Aabb,

    pub current_state: EntityState,
    /// Skipped by the per-frame hooks, but stays in the tree
    pub ignore_update: bool,
    pub paused: bool,
    pub visible: bool,

    pub check_screen_bounds: bool,
    pub screen_bounce_velocity: f32,

    pub motion: Motion,
    pub body: Option<Body>,
    /// Top-left of the debug rectangle, synced in post-update
    pub debug_box: Vec2,
}

impl Entity {
    /// New entity centered on `position`.
    pub fn new(entity_type: EntityType, position: Vec2, dimension: Vec2) -> Self {
        let offset = dimension * 0.5;
        Self {
            id: EntityId::NULL,
            entity_type,
            group_id: None,
            position,
            prev_position: position,
            initial_position: position,
            velocity: Vec2::ZERO,
            dimension,
            offset,
            body_offset: offset,
            radius: dimension.x * 0.5,
            aabb: Aabb::create(position, offset, dimension.x, dimension.y),
            current_state: EntityState::Normal,
            ignore_update: false,
            paused: false,
            visible: true,
            check_screen_bounds: false,
            screen_bounce_velocity: 0.0,
            motion: Motion::for_kind(entity_type),
            body: None,
            debug_box: Vec2::new(position.x - offset.x, position.y - offset.y),
        }
    }

    /// The sentinel entity held by the graph root.
    pub fn null() -> Self {
        let mut entity = Self::new(EntityType::Null, Vec2::ZERO, Vec2::ZERO);
        entity.visible = false;
        entity
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self.body_offset = offset;
        self.aabb = Aabb::create(self.position, offset, self.dimension.x, self.dimension.y);
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_collected_offset(mut self, offset: Vec2) -> Self {
        self.motion.collected_offset = offset;
        self
    }

    pub fn with_screen_bounce(mut self, bounce: f32) -> Self {
        self.check_screen_bounds = true;
        self.screen_bounce_velocity = bounce;
        self
    }

    pub fn is_null(&self) -> bool {
        self.entity_type == EntityType::Null
    }

    pub fn is_dead(&self) -> bool {
        self.current_state == EntityState::Dead
    }

    pub fn is_goal(&self) -> bool {
        self.current_state == EntityState::Goal
    }

    pub fn is_collected(&self) -> bool {
        self.current_state == EntityState::Collected
    }

    /// Move to `position`, optionally replacing the velocity.
    /// Records the previous position and keeps the bounds in sync.
    pub fn update_transform(&mut self, position: Vec2, velocity: Option<Vec2>) {
        self.prev_position = self.position;
        self.position = position;
        self.aabb.update(self.position);
        if let Some(v) = velocity {
            self.velocity = v;
        }
    }

    /// Integrate one step of `velocity`, bouncing off the room edges when
    /// screen bounds are enabled.
    pub fn integrate(&mut self, delta: f32, room: Vec2) {
        let mut pos = self.position + self.velocity * delta;

        if self.check_screen_bounds {
            if pos.x - self.offset.x <= 0.0 {
                pos.x = self.offset.x;
                self.velocity.x = self.screen_bounce_velocity;
            } else if pos.x + self.offset.x >= room.x {
                pos.x = room.x - self.offset.x;
                self.velocity.x = -self.screen_bounce_velocity;
            }
            if pos.y - self.offset.y <= 0.0 {
                pos.y = self.offset.y;
                self.velocity.y = self.screen_bounce_velocity;
            } else if pos.y + self.offset.y >= room.y {
                pos.y = room.y - self.offset.y;
                self.velocity.y = -self.screen_bounce_velocity;
            }
        }

        self.update_transform(pos, None);
    }

    /// Fully outside the room (by half the bounds on each axis)
    pub fn is_outside_room(&self, room: Vec2) -> bool {
        self.position.x + self.aabb.half_width < 0.0
            || self.position.x - self.aabb.half_width > room.x
            || self.position.y + self.aabb.half_height < 0.0
            || self.position.y - self.aabb.half_height > room.y
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            entity_type: self.entity_type,
            state: self.current_state,
            position: self.position,
            velocity: self.velocity,
            offset: self.offset,
            radius: self.radius,
            aabb: self.aabb,
        }
    }

    /// Transform handed down to this entity's children.
    ///
    /// Velocity is this entity's own plus its immediate parent's. Ancestors
    /// further up are not summed in.
    pub fn transform(&self, parent: Option<&EntitySnapshot>) -> Transform {
        Transform {
            entity: self.snapshot(),
            parent: parent.copied(),
            position: self.position,
            velocity: self.velocity + parent.map(|p| p.velocity).unwrap_or(Vec2::ZERO),
            offset: self.offset,
        }
    }
}
