//! Entity core
//!
//! A scene is a tree of entities under a null sentinel root. Each frame the
//! manager materializes queued entities, drains commands, walks the tree
//! three times (pre-update, update, post-update) and then removes whatever
//! was marked.
//!
//! Key pieces:
//! - Entity: plain state plus a kind tag
//! - Behavior: per-kind hook table, dispatched on the tag
//! - EntityGraph: id-addressed arena holding the tree
//! - Command: deferred structural changes and cross-system signals
//! - EntityManager: frame orchestration, groups, id allocation
//! - GameContext: owns all of the above plus the systems

pub mod entity;
pub mod transform;
pub mod behavior;
pub mod command;
pub mod graph;
pub mod manager;
pub mod context;

pub use entity::{Body, BodyKind, Entity, EntityId, EntityState, EntityType};
pub use transform::{EntitySnapshot, Transform};
pub use behavior::{Behavior, FrameContext, HookContext};
pub use command::{Command, CommandData, CommandQueue, CommandType, CommandValue};
pub use graph::{EntityGraph, EntityNode, GraphError};
pub use manager::{EntityManager, EntityToAdd, FrameState, Group, ParentRef, QueueTicket};
pub use context::GameContext;
