//! Entity Graph
//!
//! Arena of nodes keyed by `EntityId`. Parent/child links are plain ids, so
//! there are no reference cycles to manage; the arena owns every entity.
//!
//! Each frame the graph makes three depth-first passes from the sentinel
//! root:
//! - pre-update: gather intent, no transform
//! - update: apply the parent transform, integrate, cascade down
//! - post-update: finalize
//!
//! Structure (insert, reparent, remove) only changes outside those passes.
//! The passes iterate a copy of each child list and hooks only ever see
//! their own entity, so a walk cannot observe a half-applied change.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};
use super::behavior::{Behavior, FrameContext};
use super::command::{Command, CommandType};
use super::entity::{Entity, EntityId};
use super::transform::{EntitySnapshot, Transform};

/// Errors raised by graph commands. These are caller bugs, not data
/// conditions.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("{kind:?} command is missing integer field '{field}'")]
    MalformedCommand { kind: CommandType, field: &'static str },
    #[error("{kind:?} command field '{field}' holds {value}, which is not an entity id")]
    IdOutOfRange { kind: CommandType, field: &'static str, value: i64 },
}

/// One entity in the tree.
#[derive(Debug, Clone)]
pub struct EntityNode {
    pub entity: Entity,
    pub id: EntityId,
    pub parent_id: EntityId,
    /// Child ids in insertion order
    pub children: Vec<EntityId>,
    /// Only the root is null
    pub is_null: bool,
}

impl EntityNode {
    pub fn new(entity: Entity, parent_id: EntityId) -> Self {
        Self {
            id: entity.id,
            entity,
            parent_id,
            children: Vec::new(),
            is_null: false,
        }
    }

    fn add_child(&mut self, id: EntityId) {
        if !self.children.contains(&id) {
            self.children.push(id);
        }
    }

    fn remove_child(&mut self, id: EntityId) {
        if let Some(i) = self.children.iter().position(|&c| c == id) {
            self.children.remove(i);
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// The entity tree.
#[derive(Debug)]
pub struct EntityGraph {
    root: EntityNode,
    nodes: HashMap<EntityId, EntityNode>,
}

impl EntityGraph {
    pub fn new() -> Self {
        let mut root = EntityNode::new(Entity::null(), EntityId::ROOT);
        root.is_null = true;
        Self {
            root,
            nodes: HashMap::new(),
        }
    }

    pub fn root(&self) -> &EntityNode {
        &self.root
    }

    /// Node by id. `EntityId::ROOT` resolves to the root.
    pub fn get_node(&self, id: EntityId) -> Option<&EntityNode> {
        if id == EntityId::ROOT {
            return Some(&self.root);
        }
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: EntityId) -> Option<&mut EntityNode> {
        if id == EntityId::ROOT {
            return Some(&mut self.root);
        }
        self.nodes.get_mut(&id)
    }

    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.get_node(id).map(|n| &n.entity)
    }

    pub fn get_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.get_node_mut(id).map(|n| &mut n.entity)
    }

    /// Parent entity. For direct children of the root this is the null entity.
    pub fn get_parent(&self, id: EntityId) -> Option<&Entity> {
        let node = self.get_node(id)?;
        if node.is_null {
            return None;
        }
        self.get_entity(node.parent_id)
    }

    /// First direct child of `id` matching `predicate`
    pub fn find_child<F>(&self, id: EntityId, predicate: F) -> Option<&Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        let node = self.get_node(id)?;
        node.children
            .iter()
            .filter_map(|c| self.get_entity(*c))
            .find(|e| predicate(e))
    }

    /// Any non-root entity matching `predicate`, lowest id first
    pub fn find<F>(&self, predicate: F) -> Option<&Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        self.nodes
            .values()
            .map(|n| &n.entity)
            .filter(|e| predicate(e))
            .min_by_key(|e| e.id)
    }

    pub fn has_children(&self, id: EntityId) -> bool {
        self.get_node(id).map(|n| n.has_children()).unwrap_or(false)
    }

    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.get_node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, root excluded
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All non-root entities, in no particular order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.nodes.values().map(|n| &n.entity)
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Insert under the root, then reparent under `parent` if given.
    pub fn add_entity(&mut self, entity: Entity, parent: Option<EntityId>) {
        let id = entity.id;
        self.nodes.insert(id, EntityNode::new(entity, EntityId::ROOT));
        self.root.add_child(id);
        if let Some(parent) = parent {
            self.move_child(id, parent);
        }
    }

    /// Detach `id` from its parent, then attach it under `parent_id`.
    /// Unknown targets fall back to the root; unknown children are ignored.
    ///
    /// Cycles are not checked: moving an ancestor under its own descendant
    /// cuts both off from the root.
    pub fn move_child(&mut self, id: EntityId, parent_id: EntityId) {
        if id == EntityId::ROOT {
            return;
        }
        let Some(old_parent) = self.nodes.get(&id).map(|n| n.parent_id) else {
            return;
        };

        self.detach_from(old_parent, id);

        let target = if self.get_node(parent_id).is_some() {
            parent_id
        } else {
            warn!(child = %id, parent = %parent_id, "reparent target not found, attaching to root");
            EntityId::ROOT
        };

        if let Some(parent) = self.get_node_mut(target) {
            parent.add_child(id);
        }
        if let Some(child) = self.nodes.get_mut(&id) {
            child.parent_id = target;
        }
        debug!(child = %id, parent = %target, "reparented");
    }

    /// Remove `id` from its parent's child list. The node stays in the map.
    pub fn detach(&mut self, id: EntityId) {
        if let Some(parent) = self.nodes.get(&id).map(|n| n.parent_id) {
            self.detach_from(parent, id);
        }
    }

    fn detach_from(&mut self, parent: EntityId, id: EntityId) {
        if let Some(node) = self.get_node_mut(parent) {
            node.remove_child(id);
        }
    }

    /// Clear the node's children, run its teardown and drop it from the map.
    ///
    /// The caller detaches it from its parent first. Children are not
    /// reattached anywhere; callers that keep them must move them first.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let mut node = self.nodes.remove(&id)?;
        node.children.clear();
        (Behavior::for_kind(node.entity.entity_type).teardown)(&mut node.entity);
        debug!(entity = %id, "removed from graph");
        Some(node.entity)
    }

    /// Remove every node and empty the root.
    pub fn destroy(&mut self) {
        let ids: Vec<EntityId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.remove_entity(id);
        }
        self.root.children.clear();
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Graph-level meaning of a command: `MoveChild` reparents.
    pub fn command(&mut self, command: &Command) -> Result<(), GraphError> {
        if command.kind == CommandType::MoveChild {
            let field = |name: &'static str| -> Result<EntityId, GraphError> {
                let value = command
                    .data
                    .get_int(name)
                    .ok_or(GraphError::MalformedCommand { kind: command.kind, field: name })?;
                i32::try_from(value)
                    .map(EntityId)
                    .map_err(|_| GraphError::IdOutOfRange { kind: command.kind, field: name, value })
            };
            let id = field("id")?;
            let parent_id = field("parentId")?;
            self.move_child(id, parent_id);
        }
        Ok(())
    }

    /// Fan a command out to every entity, depth-first, each entity before
    /// its subtree.
    pub fn send_command(&mut self, command: &Command) {
        trace!(%command, "fan out");
        self.send_command_from(EntityId::ROOT, command);
    }

    fn send_command_from(&mut self, id: EntityId, command: &Command) {
        let parent = self.snapshot_of(id);
        for child in self.children_of(id) {
            if let Some(node) = self.nodes.get_mut(&child) {
                let behavior = Behavior::for_kind(node.entity.entity_type);
                (behavior.command)(&mut node.entity, command, parent.as_ref());
            }
            self.send_command_from(child, command);
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Run the three passes: pre-update, update, post-update.
    pub fn update(&mut self, frame: &mut FrameContext<'_>) {
        self.pre_update_from(EntityId::ROOT, frame);
        self.update_from(EntityId::ROOT, None, frame);
        self.post_update_from(EntityId::ROOT, frame);
    }

    fn snapshot_of(&self, id: EntityId) -> Option<EntitySnapshot> {
        self.get_entity(id).map(|e| e.snapshot())
    }

    fn pre_update_from(&mut self, id: EntityId, frame: &mut FrameContext<'_>) {
        let parent = self.snapshot_of(id);
        for child in self.children_of(id) {
            if let Some(node) = self.nodes.get_mut(&child) {
                if !node.entity.ignore_update && !node.is_null {
                    let behavior = Behavior::for_kind(node.entity.entity_type);
                    (behavior.pre_update)(&mut node.entity, &mut frame.hook(parent));
                }
            }
            self.pre_update_from(child, frame);
        }
    }

    /// `transform` is the transform of node `id`, `None` at the root.
    fn update_from(&mut self, id: EntityId, transform: Option<&Transform>, frame: &mut FrameContext<'_>) {
        let parent = self.snapshot_of(id);
        let is_root = id == EntityId::ROOT;

        for child in self.children_of(id) {
            let next = {
                let Some(node) = self.nodes.get_mut(&child) else { continue };
                let behavior = Behavior::for_kind(node.entity.entity_type);

                if !is_root {
                    if let Some(t) = transform {
                        (behavior.apply_transform)(&mut node.entity, t, &mut frame.hook(parent));
                    }
                }
                if !node.entity.ignore_update && !node.is_null {
                    (behavior.update)(&mut node.entity, &mut frame.hook(parent));
                }
                let grand = if is_root { None } else { parent.as_ref() };
                node.entity.transform(grand)
            };
            self.update_from(child, Some(&next), frame);
        }
    }

    fn post_update_from(&mut self, id: EntityId, frame: &mut FrameContext<'_>) {
        let parent = self.snapshot_of(id);
        for child in self.children_of(id) {
            if let Some(node) = self.nodes.get_mut(&child) {
                if !node.entity.ignore_update && !node.is_null {
                    let behavior = Behavior::for_kind(node.entity.entity_type);
                    (behavior.post_update)(&mut node.entity, &mut frame.hook(parent));
                }
            }
            self.post_update_from(child, frame);
        }
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}
