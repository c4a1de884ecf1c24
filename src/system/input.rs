//! Input state
//!
//! Action-based latch. The demo feeds it from the keyboard with `poll`;
//! tests and scripted drivers call `press`/`release` directly. `update`
//! runs once per frame, before the simulation, and computes the
//! just-pressed edges.

use std::collections::HashSet;
use macroquad::prelude::{is_key_down, KeyCode};

/// Game actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    /// Start / restart
    Confirm,
}

impl Action {
    pub const ALL: [Action; 5] = [Action::Left, Action::Right, Action::Up, Action::Down, Action::Confirm];

    fn keys(self) -> &'static [KeyCode] {
        match self {
            Action::Left => &[KeyCode::A, KeyCode::Left],
            Action::Right => &[KeyCode::D, KeyCode::Right],
            Action::Up => &[KeyCode::W, KeyCode::Up],
            Action::Down => &[KeyCode::S, KeyCode::Down],
            Action::Confirm => &[KeyCode::Space, KeyCode::Enter],
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct InputState {
    down: HashSet<Action>,
    held_last: HashSet<Action>,
    pressed: HashSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the keyboard. Needs a live macroquad window.
    pub fn poll(&mut self) {
        for action in Action::ALL {
            if action.keys().iter().any(|&k| is_key_down(k)) {
                self.down.insert(action);
            } else {
                self.down.remove(&action);
            }
        }
    }

    pub fn press(&mut self, action: Action) {
        self.down.insert(action);
    }

    pub fn release(&mut self, action: Action) {
        self.down.remove(&action);
    }

    /// Latch edges: pressed = down now but not at the previous update
    pub fn update(&mut self) {
        self.pressed = self.down.difference(&self.held_last).copied().collect();
        self.held_last = self.down.clone();
    }

    pub fn is_down(&self, action: Action) -> bool {
        self.down.contains(&action)
    }

    /// Went down since the previous `update`
    pub fn is_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn clear(&mut self) {
        self.down.clear();
        self.held_last.clear();
        self.pressed.clear();
    }
}
