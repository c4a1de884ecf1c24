//! Entity Manager
//!
//! Owns the graph, the flat id list, the pending add/remove queues and the
//! collision groups, and runs the frame:
//!
//! 1. add: materialize queued entities (id, body, tree, group)
//! 2. commands: drain the queue through systems, the graph, every entity
//! 3. simulate: input latch, system update, graph passes, system post-update
//! 4. remove: destroy marked entities and compact the flat list
//! 5. late: system late-update
//!
//! Entities queued or marked while a frame runs take effect on the next
//! add or remove phase, never in the middle of a traversal.

use std::collections::{HashMap, HashSet};
use macroquad::math::Vec2;
use tracing::{debug, trace, warn};
use crate::collision::circles_overlap;
use crate::system::{FrameSystem, InputState, SystemContext};
use crate::tile::TileSource;
use super::behavior::{Behavior, FrameContext};
use super::command::CommandQueue;
use super::entity::{BodyKind, Entity, EntityId};
use super::graph::{EntityGraph, GraphError};

/// Handle for an entity that is queued but has no id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueTicket(u64);

/// Parent of a queued entity: one that exists, or one queued ahead of it
/// in the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Entity(EntityId),
    Queued(QueueTicket),
}

/// A pending insertion.
#[derive(Debug)]
pub struct EntityToAdd {
    pub ticket: QueueTicket,
    pub entity: Entity,
    pub body: BodyKind,
    pub group_id: Option<String>,
    pub parent: Option<ParentRef>,
}

/// Unordered set of entity ids sharing a body kind.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    pub body: BodyKind,
    members: HashSet<EntityId>,
}

impl Group {
    pub fn new(id: &str, body: BodyKind) -> Self {
        Self { id: id.to_string(), body, members: HashSet::new() }
    }

    pub fn add(&mut self, id: EntityId) {
        self.members.insert(id);
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        self.members.remove(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member ids in ascending order
    pub fn members(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.members.iter().copied().collect();
        ids.sort();
        ids
    }

    /// Members overlapping `id`, ascending. Bounds must overlap; when both
    /// entities have a radius the circles must overlap too.
    pub fn overlapping(&self, graph: &EntityGraph, id: EntityId) -> Vec<EntityId> {
        let Some(entity) = graph.get_entity(id) else {
            return Vec::new();
        };
        self.members()
            .into_iter()
            .filter(|&m| m != id)
            .filter(|&m| {
                let Some(other) = graph.get_entity(m) else { return false };
                if !entity.aabb.is_collide(&other.aabb) {
                    return false;
                }
                if entity.radius > 0.0 && other.radius > 0.0 {
                    return circles_overlap(entity.position, entity.radius, other.position, other.radius);
                }
                true
            })
            .collect()
    }
}

/// Per-frame borrows the manager needs from its owner.
pub struct FrameState<'a> {
    pub commands: &'a mut CommandQueue,
    pub input: &'a mut InputState,
    pub tiles: &'a dyn TileSource,
    pub room: Vec2,
    pub collision_layer: &'a str,
}

#[derive(Clone, Copy)]
enum Phase {
    Update,
    PostUpdate,
    Late,
}

#[derive(Debug, Default)]
pub struct EntityManager {
    graph: EntityGraph,
    /// Live ids in insertion order; `EntityId::NULL` marks a hole
    entities: Vec<EntityId>,
    to_add: Vec<EntityToAdd>,
    to_remove: HashSet<EntityId>,
    groups: HashMap<String, Group>,
    /// Ticket → id for every entity materialized since the last destroy
    tickets: HashMap<QueueTicket, EntityId>,
    id_count: i32,
    ticket_count: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut EntityGraph {
        &mut self.graph
    }

    /// Flat list, holes included
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn pending_adds(&self) -> usize {
        self.to_add.len()
    }

    pub fn is_marked(&self, id: EntityId) -> bool {
        self.to_remove.contains(&id)
    }

    /// Id of an entity queued with `ticket`, while it is in the graph.
    /// Tickets are forgotten when their entity is removed or the manager is
    /// destroyed.
    pub fn resolve(&self, ticket: QueueTicket) -> Option<EntityId> {
        self.tickets.get(&ticket).copied()
    }

    /// Next id. Pre-increment: the first id handed out is 1.
    pub fn generate_id(&mut self) -> EntityId {
        self.id_count += 1;
        EntityId(self.id_count)
    }

    pub fn reset_id(&mut self) {
        self.id_count = 0;
    }

    // =========================================================================
    // Queues
    // =========================================================================

    /// Queue an entity for the next add phase.
    pub fn add_entity_to_add(
        &mut self,
        entity: Entity,
        body: BodyKind,
        group_id: Option<&str>,
        parent: Option<ParentRef>,
    ) -> QueueTicket {
        self.ticket_count += 1;
        let ticket = QueueTicket(self.ticket_count);
        self.to_add.push(EntityToAdd {
            ticket,
            entity,
            body,
            group_id: group_id.map(str::to_string),
            parent,
        });
        ticket
    }

    /// Mark an entity for the next removal phase.
    pub fn add_entity_to_remove(&mut self, id: EntityId) {
        self.to_remove.insert(id);
    }

    pub fn create_group(&mut self, id: &str, body: BodyKind) {
        self.groups.entry(id.to_string()).or_insert_with(|| Group::new(id, body));
    }

    pub fn get_group(&self, id: &str) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn groups(&self) -> &HashMap<String, Group> {
        &self.groups
    }

    /// Members of `group_id` overlapping entity `id`
    pub fn overlapping(&self, id: EntityId, group_id: &str) -> Vec<EntityId> {
        self.groups
            .get(group_id)
            .map(|g| g.overlapping(&self.graph, id))
            .unwrap_or_default()
    }

    // =========================================================================
    // Frame
    // =========================================================================

    pub fn update(
        &mut self,
        time: f32,
        delta: f32,
        state: FrameState<'_>,
        systems: &mut [&mut dyn FrameSystem],
    ) -> Result<(), GraphError> {
        let FrameState { commands, input, tiles, room, collision_layer } = state;

        self.add_entities();

        // Commands raised while draining are drained in the same loop
        while let Some(command) = commands.next() {
            trace!(%command, "dispatch");
            for system in systems.iter_mut() {
                system.command(&command, commands);
            }
            self.graph.command(&command)?;
            self.graph.send_command(&command);
        }

        input.update();

        self.run_systems(Phase::Update, time, delta, room, commands, input, systems);

        let mut frame = FrameContext {
            time,
            delta,
            room,
            collision_layer,
            tiles,
            input,
            commands: &mut *commands,
        };
        self.graph.update(&mut frame);

        self.run_systems(Phase::PostUpdate, time, delta, room, commands, input, systems);

        self.remove_entities();

        self.run_systems(Phase::Late, time, delta, room, commands, input, systems);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_systems(
        &mut self,
        phase: Phase,
        time: f32,
        delta: f32,
        room: Vec2,
        commands: &mut CommandQueue,
        input: &InputState,
        systems: &mut [&mut dyn FrameSystem],
    ) {
        let mut ctx = SystemContext {
            time,
            delta,
            room,
            graph: &mut self.graph,
            groups: &self.groups,
            commands,
            input,
        };
        for system in systems.iter_mut() {
            match phase {
                Phase::Update => system.update(&mut ctx),
                Phase::PostUpdate => system.post_update(&mut ctx),
                Phase::Late => system.late_update(&mut ctx),
            }
        }
    }

    /// Materialize everything queued before this call. Entities queued
    /// from inside the loop wait for the next frame.
    fn add_entities(&mut self) {
        let batch = std::mem::take(&mut self.to_add);
        for add in batch {
            let EntityToAdd { ticket, mut entity, body, group_id, parent } = add;
            if entity.is_null() {
                warn!("null entity queued for add, skipped");
                continue;
            }

            let id = self.generate_id();
            entity.id = id;
            entity.group_id = group_id.clone();
            (Behavior::for_kind(entity.entity_type).setup)(&mut entity, body);

            let parent_id = match parent {
                Some(ParentRef::Entity(p)) => Some(p),
                Some(ParentRef::Queued(t)) => match self.tickets.get(&t) {
                    Some(&p) => Some(p),
                    None => {
                        warn!(entity = %id, "queued parent not materialized, attaching to root");
                        None
                    }
                },
                None => None,
            };

            debug!(entity = %id, kind = ?entity.entity_type, "added");
            self.graph.add_entity(entity, parent_id);
            self.entities.push(id);
            self.tickets.insert(ticket, id);

            if let Some(group_id) = group_id {
                match self.groups.get_mut(&group_id) {
                    Some(group) => group.add(id),
                    None => warn!(entity = %id, group = %group_id, "group not found"),
                }
            }
        }
    }

    /// Destroy marked entities and slide survivors one slot left over any
    /// hole, then trim trailing holes. Marks for ids not in the list stay.
    fn remove_entities(&mut self) {
        for i in 0..self.entities.len() {
            let id = self.entities[i];
            if !id.is_null() && self.to_remove.remove(&id) {
                let group_id = self.graph.get_entity(id).and_then(|e| e.group_id.clone());
                if let Some(group) = group_id.and_then(|g| self.groups.get_mut(&g)) {
                    group.remove(id);
                }
                self.destroy_entity(id);
                self.tickets.retain(|_, added| *added != id);
                self.entities[i] = EntityId::NULL;
            } else if i > 0 && self.entities[i - 1].is_null() {
                self.entities[i - 1] = id;
                self.entities[i] = EntityId::NULL;
            }
        }

        while self.entities.last().map(|id| id.is_null()).unwrap_or(false) {
            self.entities.pop();
        }
    }

    /// Detach from the parent, hand the children to the root, drop the node.
    fn destroy_entity(&mut self, id: EntityId) {
        for child in self.graph.children_of(id) {
            self.graph.move_child(child, EntityId::ROOT);
        }
        self.graph.detach(id);
        self.graph.remove_entity(id);
    }

    /// Drop every entity, queue and group.
    pub fn destroy(&mut self) {
        self.graph.destroy();
        self.entities.clear();
        self.to_add.clear();
        self.to_remove.clear();
        self.groups.clear();
        self.tickets.clear();
        debug!("entity manager destroyed");
    }
}
