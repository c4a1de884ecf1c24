//! Command System
//!
//! Commands carry structural changes (reparenting) and cross-system signals
//! (player died, next level) between frames. Anything raised while the
//! graph is being walked waits in the queue until the next command phase,
//! so the tree is never mutated mid-traversal.
//!
//! Example flow:
//! 1. Food notices its carrier died → queues `MoveChild { id, parentId: -1 }`
//! 2. Next frame's command phase: systems see it, the graph reparents,
//!    then every entity's command hook sees it

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::warn;
use super::entity::EntityId;

/// Command tags, grouped by subsystem. Values are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum CommandType {
    // Entity
    Pause = 0,
    Unpause = 1,
    /// Reparent `id` under `parentId`
    MoveChild = 2,
    // Player
    PlayerNormal = 40,
    PlayerDead = 41,
    // Level
    NextLevel = 50,
    ClearedLevel = 51,
    Restart = 52,
}

impl CommandType {
    pub const ALL: [CommandType; 8] = [
        CommandType::Pause,
        CommandType::Unpause,
        CommandType::MoveChild,
        CommandType::PlayerNormal,
        CommandType::PlayerDead,
        CommandType::NextLevel,
        CommandType::ClearedLevel,
        CommandType::Restart,
    ];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

/// One payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<i64> for CommandValue {
    fn from(v: i64) -> Self {
        CommandValue::Int(v)
    }
}

impl From<i32> for CommandValue {
    fn from(v: i32) -> Self {
        CommandValue::Int(v as i64)
    }
}

impl From<EntityId> for CommandValue {
    fn from(id: EntityId) -> Self {
        CommandValue::Int(id.raw() as i64)
    }
}

impl From<f64> for CommandValue {
    fn from(v: f64) -> Self {
        CommandValue::Float(v)
    }
}

impl From<bool> for CommandValue {
    fn from(v: bool) -> Self {
        CommandValue::Bool(v)
    }
}

impl From<&str> for CommandValue {
    fn from(v: &str) -> Self {
        CommandValue::Text(v.to_string())
    }
}

/// String-keyed payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandData(BTreeMap<String, CommandValue>);

impl CommandData {
    pub fn insert(&mut self, key: &str, value: impl Into<CommandValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&CommandValue> {
        self.0.get(key)
    }

    /// Integer value, `None` if missing or not an integer
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(CommandValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A typed command with an optional payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandType,
    pub data: CommandData,
}

impl Command {
    pub fn new(kind: CommandType) -> Self {
        Self { kind, data: CommandData::default() }
    }

    /// Builder-style payload entry
    pub fn with(mut self, key: &str, value: impl Into<CommandValue>) -> Self {
        self.data.insert(key, value);
        self
    }

    /// Reparent `id` under `parent` (root when `parent` is `EntityId::ROOT`)
    pub fn move_child(id: EntityId, parent: EntityId) -> Self {
        Self::new(CommandType::MoveChild).with("id", id).with("parentId", parent)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.kind.tag())
    }
}

/// FIFO of pending commands plus the set of static (recurring) types.
///
/// Static types may be raised with `add_static` any number of times.
/// Duplicates are not suppressed: two `add_static(T)` calls drain twice.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
    statics: HashSet<CommandType>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Queue a payload-free command of a registered static type.
    /// Unregistered types are dropped with a warning.
    pub fn add_static(&mut self, kind: CommandType) {
        if self.statics.contains(&kind) {
            self.pending.push_back(Command::new(kind));
        } else {
            warn!(?kind, "add_static for a type that is not registered static");
        }
    }

    pub fn set_static(&mut self, kind: CommandType) {
        self.statics.insert(kind);
    }

    pub fn is_static(&self, kind: CommandType) -> bool {
        self.statics.contains(&kind)
    }

    /// Oldest pending command
    pub fn next(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    pub fn size(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Iterate pending commands without draining
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }

    /// End-of-frame hook. Nothing to do yet.
    pub fn late_update(&mut self) {}

    /// Discard all pending commands. Static registrations stay.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
