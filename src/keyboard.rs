//! Keyboard override state.
//!
//! Key-down/key-up events update an explicitly owned [`KeyboardState`]; the
//! normalizer and the simulator read a snapshot of it once per frame.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Keys that influence steering or throttle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Space,
    A,
    D,
}

impl Key {
    /// DOM-style key name
    pub const fn name(self) -> &'static str {
        match self {
            Self::ArrowLeft => "ArrowLeft",
            Self::ArrowRight => "ArrowRight",
            Self::ArrowUp => "ArrowUp",
            Self::ArrowDown => "ArrowDown",
            Self::Space => "Space",
            Self::A => "a",
            Self::D => "d",
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ArrowLeft" => Ok(Self::ArrowLeft),
            "ArrowRight" => Ok(Self::ArrowRight),
            "ArrowUp" => Ok(Self::ArrowUp),
            "ArrowDown" => Ok(Self::ArrowDown),
            " " | "Space" | "space" => Ok(Self::Space),
            "a" | "A" => Ok(Self::A),
            "d" | "D" => Ok(Self::D),
            other => Err(Error::InvalidInput(format!("Unknown key: {other:?}"))),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}

/// Set of currently held keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyboardState {
    held: HashSet<Key>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Down(key) => self.press(key),
            KeyEvent::Up(key) => self.release(key),
        }
    }

    pub fn press(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
    }

    /// Release every key
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn arrow_left(&self) -> bool {
        self.is_held(Key::ArrowLeft)
    }

    pub fn arrow_right(&self) -> bool {
        self.is_held(Key::ArrowRight)
    }

    pub fn arrow_up(&self) -> bool {
        self.is_held(Key::ArrowUp)
    }

    pub fn arrow_down(&self) -> bool {
        self.is_held(Key::ArrowDown)
    }

    /// Direct throttle key of the driving scene
    pub fn accelerate_key(&self) -> bool {
        self.is_held(Key::Space)
    }

    pub fn steer_left_key(&self) -> bool {
        self.is_held(Key::A)
    }

    pub fn steer_right_key(&self) -> bool {
        self.is_held(Key::D)
    }
}
