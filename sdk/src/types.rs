//! Dialogue types shared between the scenario source and the playback engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two speakers in a dialogue
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    A,
    B,
}

impl Role {
    /// The speaker who answers this one
    pub fn other(self) -> Self {
        match self {
            Role::A => Role::B,
            Role::B => Role::A,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::A => write!(f, "A"),
            Role::B => write!(f, "B"),
        }
    }
}

/// One speaker's utterance plus its translation
///
/// `text` and `translation` may contain clause delimiters (`|`); the engine
/// splits both with the same rule so segment *i* of one lines up with
/// segment *i* of the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub translation: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            translation: translation.into(),
        }
    }
}

/// A value held once per speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerRole<T> {
    pub a: T,
    pub b: T,
}

impl<T> PerRole<T> {
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::A => &self.a,
            Role::B => &self.b,
        }
    }
}

/// A generated dialogue: the scene, who speaks, with which voice, and what they say
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub scene: String,
    pub roles: PerRole<String>,
    pub voices: PerRole<String>,
    pub script: Vec<Turn>,
}

impl Scenario {
    /// Voice identifier used for a speaker's turns
    pub fn voice_for(&self, role: Role) -> &str {
        self.voices.get(role)
    }
}
