//! Per-kind lifecycle hooks
//!
//! Each `EntityType` maps to one static `Behavior`: a table of plain
//! function pointers for the hooks the graph and manager call. Adding a
//! kind means adding a table; the `match` in `Behavior::for_kind` keeps
//! the set exhaustive.
//!
//! Hooks only get `&mut` to their own entity. Anything that touches
//! another entity or the tree goes through the command queue.

use macroquad::math::{Rect, Vec2};
use crate::system::input::{Action, InputState};
use crate::tile::{TileSource, collide::{TileQuery, get_tile_collisions}};
use crate::collision::circle_intersects_rect;
use super::command::{Command, CommandQueue, CommandType};
use super::entity::{Body, BodyKind, Entity, EntityState, EntityType};
use super::transform::{EntitySnapshot, Transform};

/// Downward acceleration of a dead player, px/s²
pub const DEAD_GRAVITY: f32 = 400.0;
/// Vertical kick when the player hits a wall tile
pub const DEAD_BOUNCE: f32 = -100.0;
/// Player thrust, px/s²
pub const PLAYER_THRUST: f32 = 220.0;
pub const PLAYER_SPEED_MAX: f32 = 80.0;
/// Distance at which a collected entity snaps onto its collector
pub const SNAP_DISTANCE: f32 = 5.0;

/// Shared, per-frame inputs of the graph traversal.
pub struct FrameContext<'a> {
    pub time: f32,
    pub delta: f32,
    /// Room size in pixels
    pub room: Vec2,
    pub collision_layer: &'a str,
    pub tiles: &'a dyn TileSource,
    pub input: &'a InputState,
    pub commands: &'a mut CommandQueue,
}

impl<'a> FrameContext<'a> {
    /// Hook context for one entity whose parent is `parent`.
    pub fn hook(&mut self, parent: Option<EntitySnapshot>) -> HookContext<'_> {
        HookContext {
            time: self.time,
            delta: self.delta,
            room: self.room,
            collision_layer: self.collision_layer,
            tiles: self.tiles,
            input: self.input,
            commands: &mut *self.commands,
            parent,
        }
    }
}

/// Everything a hook may read or raise besides its own entity.
pub struct HookContext<'a> {
    pub time: f32,
    pub delta: f32,
    pub room: Vec2,
    pub collision_layer: &'a str,
    pub tiles: &'a dyn TileSource,
    pub input: &'a InputState,
    /// Commands raised here are applied next frame
    pub commands: &'a mut CommandQueue,
    /// Parent as the graph sees it; the root shows up as a null snapshot
    pub parent: Option<EntitySnapshot>,
}

impl HookContext<'_> {
    /// Parent that is a real entity (not absent, not the root)
    pub fn entity_parent(&self) -> Option<&EntitySnapshot> {
        self.parent.as_ref().filter(|p| !p.is_null())
    }
}

pub type FrameHook = fn(&mut Entity, &mut HookContext<'_>);

/// Lifecycle hooks of one entity kind.
pub struct Behavior {
    /// Gather intent (input, AI) before anything integrates
    pub pre_update: FrameHook,
    pub update: FrameHook,
    /// Finalize after the whole tree has moved
    pub post_update: FrameHook,
    /// Apply the parent's transform before `update`
    pub apply_transform: fn(&mut Entity, &Transform, &mut HookContext<'_>),
    /// React to a drained command; gets the entity's current parent
    pub command: fn(&mut Entity, &Command, Option<&EntitySnapshot>),
    /// Size the physics body, once, when materialized
    pub setup: fn(&mut Entity, BodyKind),
    /// Sync the body to the logical position
    pub update_body: fn(&mut Entity),
    pub teardown: fn(&mut Entity),
    pub allow_pause: fn(&Entity) -> bool,
}

impl Behavior {
    pub fn for_kind(kind: EntityType) -> &'static Behavior {
        match kind {
            EntityType::Null => &NULL,
            EntityType::Player => &PLAYER,
            EntityType::Collectable | EntityType::Item => &COLLECTABLE,
            EntityType::Food => &FOOD,
            EntityType::Goal => &GOAL,
            EntityType::Asteroid => &ASTEROID,
            EntityType::None | EntityType::Obstacle | EntityType::Enemy => &BASE,
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

pub const BASE: Behavior = Behavior {
    pre_update: noop,
    update: base_update,
    post_update: base_post_update,
    apply_transform: noop_transform,
    command: base_command,
    setup: base_setup,
    update_body: base_update_body,
    teardown: base_teardown,
    allow_pause: always,
};

pub const NULL: Behavior = Behavior {
    pre_update: noop,
    update: noop,
    post_update: noop,
    apply_transform: noop_transform,
    command: noop_command,
    setup: noop_setup,
    update_body: noop_body,
    teardown: noop_body,
    allow_pause: never,
};

pub const PLAYER: Behavior = Behavior {
    pre_update: player_pre_update,
    update: player_update,
    post_update: player_post_update,
    allow_pause: player_allow_pause,
    ..BASE
};

pub const COLLECTABLE: Behavior = Behavior {
    update: collectable_update,
    apply_transform: collectable_apply_transform,
    command: collectable_command,
    post_update: item_post_update,
    ..BASE
};

pub const FOOD: Behavior = Behavior {
    post_update: food_post_update,
    ..COLLECTABLE
};

pub const GOAL: Behavior = Behavior {
    update: goal_update,
    ..BASE
};

pub const ASTEROID: Behavior = Behavior {
    update: asteroid_update,
    ..BASE
};

// =============================================================================
// Base
// =============================================================================

fn noop(_: &mut Entity, _: &mut HookContext<'_>) {}

fn noop_transform(_: &mut Entity, _: &Transform, _: &mut HookContext<'_>) {}

fn noop_command(_: &mut Entity, _: &Command, _: Option<&EntitySnapshot>) {}

fn noop_setup(_: &mut Entity, _: BodyKind) {}

fn noop_body(_: &mut Entity) {}

fn always(_: &Entity) -> bool {
    true
}

fn never(_: &Entity) -> bool {
    false
}

fn base_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    if entity.paused {
        return;
    }
    entity.integrate(ctx.delta, ctx.room);
    (Behavior::for_kind(entity.entity_type).update_body)(entity);
}

fn base_post_update(entity: &mut Entity, _ctx: &mut HookContext<'_>) {
    entity.debug_box = Vec2::new(entity.aabb.left, entity.aabb.top);
}

fn base_command(entity: &mut Entity, command: &Command, _parent: Option<&EntitySnapshot>) {
    match command.kind {
        CommandType::Pause => {
            if (Behavior::for_kind(entity.entity_type).allow_pause)(entity) {
                entity.paused = true;
            }
        }
        CommandType::Unpause => entity.paused = false,
        _ => {}
    }
}

fn base_setup(entity: &mut Entity, kind: BodyKind) {
    let mut body = Body::new(kind, entity.dimension);
    if entity.entity_type.has_circle_body() {
        body.radius = Some(entity.radius);
    }
    entity.body = Some(body);
    (Behavior::for_kind(entity.entity_type).update_body)(entity);
}

fn base_update_body(entity: &mut Entity) {
    let position = entity.position - entity.body_offset;
    if let Some(body) = entity.body.as_mut() {
        body.position = position;
    }
}

fn base_teardown(entity: &mut Entity) {
    entity.body = None;
    entity.visible = false;
}

// =============================================================================
// Player
// =============================================================================

fn player_allow_pause(entity: &Entity) -> bool {
    !entity.is_goal()
}

fn player_pre_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    match entity.current_state {
        EntityState::Goal => entity.velocity = Vec2::ZERO,
        EntityState::Dead => entity.velocity.y += DEAD_GRAVITY * ctx.delta,
        _ => {
            let input = ctx.input;
            let mut dir = Vec2::ZERO;
            if input.is_down(Action::Left) {
                dir.x -= 1.0;
            }
            if input.is_down(Action::Right) {
                dir.x += 1.0;
            }
            if input.is_down(Action::Up) {
                dir.y -= 1.0;
            }
            if input.is_down(Action::Down) {
                dir.y += 1.0;
            }

            if dir != Vec2::ZERO {
                entity.velocity += dir.normalize() * PLAYER_THRUST * ctx.delta;
            }
            if entity.velocity.length() > PLAYER_SPEED_MAX {
                entity.velocity = entity.velocity.normalize() * PLAYER_SPEED_MAX;
            }
        }
    }
}

fn player_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    if entity.is_outside_room(ctx.room) {
        return;
    }
    base_update(entity, ctx);
}

fn player_post_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_post_update(entity, ctx);
    if entity.is_dead() || entity.is_goal() {
        return;
    }

    if entity.is_outside_room(ctx.room) {
        entity.current_state = EntityState::Dead;
    }

    if !entity.is_dead() && touches_wall(entity, ctx) {
        entity.velocity.y = DEAD_BOUNCE;
        entity.current_state = EntityState::Dead;
    }

    if entity.is_dead() {
        ctx.commands.add_static(CommandType::PlayerDead);
    }
}

/// Player circle against the full cells of the collision layer tiles its
/// bounds touch. Slopes count as full cells here.
fn touches_wall(entity: &Entity, ctx: &HookContext<'_>) -> bool {
    let layers = [ctx.collision_layer];
    let query = TileQuery::new(&entity.aabb, ctx.room, &layers)
        .with_velocity(entity.velocity)
        .with_ignore_slope(true);
    let size = ctx.tiles.tile_size();
    get_tile_collisions(ctx.tiles, &query).iter().any(|hit| {
        let rect = Rect::new(hit.tile.pixel_x, hit.tile.pixel_y, size, size);
        circle_intersects_rect(entity.position, entity.radius, &rect)
    })
}

// =============================================================================
// Collectables
// =============================================================================

fn collectable_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_update(entity, ctx);
    if entity.paused {
        return;
    }

    if !entity.is_collected() {
        if ctx.entity_parent().is_none() {
            let rad = entity.motion.advance_float(ctx.delta);
            let pos = Vec2::new(
                entity.initial_position.x,
                entity.initial_position.y + rad.sin() * entity.motion.float_val,
            );
            entity.update_transform(pos, None);
        } else {
            entity.motion.advance_orbit(ctx.delta);
        }
    }
    base_update_body(entity);
}

fn collectable_apply_transform(entity: &mut Entity, transform: &Transform, ctx: &mut HookContext<'_>) {
    let mut pos = entity.position;
    if entity.is_collected() {
        let target = transform.position + Vec2::new(0.0, entity.motion.collected_offset.y);
        if entity.motion.in_pos {
            pos = target;
        } else {
            pos += ((target - pos) / entity.motion.lerp_spd) * ctx.delta;
            entity.motion.in_pos = pos.distance(target) <= SNAP_DISTANCE;
        }
    } else {
        let rad = entity.motion.orbit_dir.to_radians();
        pos = transform.position + Vec2::new(rad.cos(), rad.sin()) * transform.entity.radius * 2.0;
    }
    entity.update_transform(pos, None);
    base_update_body(entity);
}

fn collectable_command(entity: &mut Entity, command: &Command, parent: Option<&EntitySnapshot>) {
    base_command(entity, command, parent);
    if command.kind != CommandType::MoveChild {
        return;
    }
    if command.data.get_int("id") != Some(entity.id.raw() as i64) {
        return;
    }
    match parent {
        Some(p) if !p.is_null() => entity.current_state = EntityState::Collected,
        _ => {
            entity.current_state = EntityState::Normal;
            entity.motion.in_pos = false;
        }
    }
}

fn item_post_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_post_update(entity, ctx);
    if entity.entity_type == EntityType::Item && entity.motion.in_pos {
        entity.visible = false;
    }
}

/// Dropped when the carrier dies: back to the root, floating where it fell.
fn food_post_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_post_update(entity, ctx);
    let carrier_dead = ctx
        .entity_parent()
        .map(|p| p.entity_type == EntityType::Player && p.is_dead())
        .unwrap_or(false);
    if carrier_dead {
        ctx.commands.add(Command::move_child(entity.id, super::entity::EntityId::ROOT));
        entity.initial_position = entity.position;
        entity.current_state = EntityState::Normal;
    }
}

// =============================================================================
// Obstacles
// =============================================================================

fn goal_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_update(entity, ctx);
    if entity.paused {
        return;
    }
    let rad = entity.motion.advance_float(ctx.delta);
    let pos = Vec2::new(
        entity.initial_position.x,
        entity.initial_position.y + rad.sin() * entity.motion.float_val,
    );
    entity.update_transform(pos, None);
}

fn asteroid_update(entity: &mut Entity, ctx: &mut HookContext<'_>) {
    base_update(entity, ctx);
    if entity.paused {
        return;
    }
    let rad = entity.motion.advance_float(ctx.delta);
    let amp = entity.motion.float_val * 2.0;
    let pos = Vec2::new(
        entity.initial_position.x - (rad + 30f32.to_radians()).sin() * amp,
        entity.initial_position.y + rad.sin() * amp,
    );
    entity.update_transform(pos, None);
    base_update_body(entity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::EntityId;
    use crate::tile::{TileMap, layer};

    struct Fixture {
        tiles: TileMap,
        input: InputState,
        commands: CommandQueue,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tiles = TileMap::new(16.0);
            tiles.add_empty_layer(layer::COLLISION, 15, 10);
            let mut commands = CommandQueue::new();
            commands.set_static(CommandType::PlayerDead);
            Self { tiles, input: InputState::new(), commands }
        }

        fn frame(&mut self, delta: f32) -> FrameContext<'_> {
            FrameContext {
                time: 0.0,
                delta,
                room: Vec2::new(240.0, 160.0),
                collision_layer: layer::COLLISION,
                tiles: &self.tiles,
                input: &self.input,
                commands: &mut self.commands,
            }
        }
    }

    fn spawn(kind: EntityType, at: Vec2) -> Entity {
        let mut e = Entity::new(kind, at, Vec2::new(8.0, 8.0));
        e.id = EntityId(1);
        (Behavior::for_kind(kind).setup)(&mut e, BodyKind::Static);
        e
    }

    #[test]
    fn test_every_kind_has_a_table() {
        let kinds = [
            EntityType::None,
            EntityType::Player,
            EntityType::Collectable,
            EntityType::Item,
            EntityType::Food,
            EntityType::Obstacle,
            EntityType::Goal,
            EntityType::Asteroid,
            EntityType::Enemy,
            EntityType::Null,
        ];
        for kind in kinds {
            let behavior = Behavior::for_kind(kind);
            assert_eq!((behavior.allow_pause)(&Entity::null()), kind != EntityType::Null);
        }
    }

    #[test]
    fn test_setup_sizes_body() {
        let e = spawn(EntityType::Asteroid, Vec2::new(40.0, 40.0));
        let body = e.body.unwrap();
        assert_eq!(body.size, Vec2::new(8.0, 8.0));
        assert_eq!(body.radius, Some(4.0));
        assert_eq!(body.position, Vec2::new(36.0, 36.0));

        let enemy = spawn(EntityType::Enemy, Vec2::new(40.0, 40.0));
        assert_eq!(enemy.body.unwrap().radius, None);
    }

    #[test]
    fn test_pause_respects_kind() {
        let mut player = spawn(EntityType::Player, Vec2::new(40.0, 40.0));
        let pause = Command::new(CommandType::Pause);
        (PLAYER.command)(&mut player, &pause, None);
        assert!(player.paused);
        (PLAYER.command)(&mut player, &Command::new(CommandType::Unpause), None);
        assert!(!player.paused);

        player.current_state = EntityState::Goal;
        (PLAYER.command)(&mut player, &pause, None);
        assert!(!player.paused);
    }

    #[test]
    fn test_paused_entity_does_not_move() {
        let mut fx = Fixture::new();
        let mut e = spawn(EntityType::None, Vec2::new(40.0, 40.0)).with_velocity(Vec2::new(10.0, 0.0));
        e.paused = true;
        (BASE.update)(&mut e, &mut fx.frame(1.0).hook(None));
        assert_eq!(e.position.x, 40.0);
        e.paused = false;
        (BASE.update)(&mut e, &mut fx.frame(1.0).hook(None));
        assert_eq!(e.position.x, 50.0);
        assert_eq!(e.body.unwrap().position, Vec2::new(46.0, 36.0));
    }

    #[test]
    fn test_player_dies_leaving_room() {
        let mut fx = Fixture::new();
        let mut player = spawn(EntityType::Player, Vec2::new(-20.0, 40.0));
        (PLAYER.post_update)(&mut player, &mut fx.frame(0.016).hook(None));
        assert!(player.is_dead());
        assert_eq!(fx.commands.next().map(|c| c.kind), Some(CommandType::PlayerDead));

        // already dead: nothing raised again
        (PLAYER.post_update)(&mut player, &mut fx.frame(0.016).hook(None));
        assert!(fx.commands.is_empty());
    }

    #[test]
    fn test_player_dies_on_wall_tile() {
        let mut fx = Fixture::new();
        fx.tiles.set_tile(layer::COLLISION, 3, 3, 1);
        let mut player = spawn(EntityType::Player, Vec2::new(46.0, 52.0));
        (PLAYER.post_update)(&mut player, &mut fx.frame(0.016).hook(None));
        assert!(player.is_dead());
        assert_eq!(player.velocity.y, DEAD_BOUNCE);

        let mut clear = spawn(EntityType::Player, Vec2::new(120.0, 120.0));
        (PLAYER.post_update)(&mut clear, &mut fx.frame(0.016).hook(None));
        assert!(!clear.is_dead());
    }

    #[test]
    fn test_dead_player_falls_and_goal_player_stops() {
        let mut fx = Fixture::new();
        let mut player = spawn(EntityType::Player, Vec2::new(40.0, 40.0));
        player.current_state = EntityState::Dead;
        (PLAYER.pre_update)(&mut player, &mut fx.frame(0.5).hook(None));
        assert_eq!(player.velocity.y, 200.0);

        player.current_state = EntityState::Goal;
        (PLAYER.pre_update)(&mut player, &mut fx.frame(0.5).hook(None));
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_player_thrust_is_capped() {
        let mut fx = Fixture::new();
        fx.input.press(Action::Right);
        let mut player = spawn(EntityType::Player, Vec2::new(40.0, 40.0));
        for _ in 0..10 {
            (PLAYER.pre_update)(&mut player, &mut fx.frame(0.5).hook(None));
        }
        assert!((player.velocity.x - PLAYER_SPEED_MAX).abs() < 1e-3);
    }

    #[test]
    fn test_player_thrust_follows_held_directions() {
        let mut fx = Fixture::new();
        fx.input.press(Action::Left);
        fx.input.press(Action::Up);
        let mut player = spawn(EntityType::Player, Vec2::new(40.0, 40.0));
        (PLAYER.pre_update)(&mut player, &mut fx.frame(0.016).hook(None));
        assert!(player.velocity.x < 0.0);
        assert!((player.velocity.x - player.velocity.y).abs() < 1e-4);

        // opposite keys cancel
        fx.input.press(Action::Right);
        fx.input.press(Action::Down);
        let mut still = spawn(EntityType::Player, Vec2::new(40.0, 40.0));
        (PLAYER.pre_update)(&mut still, &mut fx.frame(0.016).hook(None));
        assert_eq!(still.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_collectable_orbits_parent() {
        let mut fx = Fixture::new();
        let asteroid = spawn(EntityType::Asteroid, Vec2::new(100.0, 100.0));
        let mut food = spawn(EntityType::Food, Vec2::new(0.0, 0.0));
        let t = asteroid.transform(None);
        (FOOD.apply_transform)(&mut food, &t, &mut fx.frame(0.016).hook(Some(asteroid.snapshot())));
        // orbit_dir 0 → directly right of the parent at twice its radius
        assert_eq!(food.position, Vec2::new(108.0, 100.0));
    }

    #[test]
    fn test_collected_entity_lerps_then_snaps() {
        let mut fx = Fixture::new();
        let player = spawn(EntityType::Player, Vec2::new(100.0, 100.0));
        let mut food = spawn(EntityType::Food, Vec2::new(90.0, 100.0));
        food.current_state = EntityState::Collected;
        let t = player.transform(None);

        (FOOD.apply_transform)(&mut food, &t, &mut fx.frame(0.09).hook(Some(player.snapshot())));
        assert!(food.position.x > 90.0 && food.position.x < 100.0);
        assert!(food.motion.in_pos);

        (FOOD.apply_transform)(&mut food, &t, &mut fx.frame(0.03).hook(Some(player.snapshot())));
        assert_eq!(food.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_collectable_floats_without_parent() {
        let mut fx = Fixture::new();
        let root = Entity::null().snapshot();
        let mut item = spawn(EntityType::Item, Vec2::new(50.0, 50.0));
        (COLLECTABLE.update)(&mut item, &mut fx.frame(0.9).hook(Some(root)));
        // 90 degrees of float: peak of the bob
        assert_eq!(item.position.x, 50.0);
        assert!((item.position.y - 55.0).abs() < 1e-3);
    }

    #[test]
    fn test_move_child_command_sets_collected_state() {
        let mut food = spawn(EntityType::Food, Vec2::new(50.0, 50.0));
        let player = spawn(EntityType::Player, Vec2::new(60.0, 50.0)).snapshot();
        let root = Entity::null().snapshot();

        let other = Command::move_child(EntityId(7), EntityId(2));
        (FOOD.command)(&mut food, &other, Some(&player));
        assert_eq!(food.current_state, EntityState::Normal);

        let mine = Command::move_child(EntityId(1), EntityId(2));
        (FOOD.command)(&mut food, &mine, Some(&player));
        assert!(food.is_collected());

        let drop = Command::move_child(EntityId(1), EntityId::ROOT);
        (FOOD.command)(&mut food, &drop, Some(&root));
        assert_eq!(food.current_state, EntityState::Normal);
    }

    #[test]
    fn test_food_dropped_by_dead_carrier() {
        let mut fx = Fixture::new();
        let mut player = spawn(EntityType::Player, Vec2::new(60.0, 50.0));
        player.current_state = EntityState::Dead;
        let mut food = spawn(EntityType::Food, Vec2::new(62.0, 40.0));
        food.current_state = EntityState::Collected;

        (FOOD.post_update)(&mut food, &mut fx.frame(0.016).hook(Some(player.snapshot())));
        assert_eq!(food.current_state, EntityState::Normal);
        assert_eq!(food.initial_position, Vec2::new(62.0, 40.0));
        let cmd = fx.commands.next().unwrap();
        assert_eq!(cmd, Command::move_child(EntityId(1), EntityId::ROOT));
    }

    #[test]
    fn test_teardown_drops_body() {
        let mut e = spawn(EntityType::Goal, Vec2::new(10.0, 10.0));
        (GOAL.teardown)(&mut e);
        assert!(e.body.is_none());
        assert!(!e.visible);
    }
}
