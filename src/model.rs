use serde::{Deserialize, Serialize};

use crate::config::TypingConfig;

/// A dry-run record of one session's output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub version: u32,
    pub config: TypingConfig,
    pub events: Vec<KeyEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyEvent {
    Wait { ms: u64 },
    Char { c: char },
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

/// Externally visible lifecycle of a [`crate::driver::Typist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Starting,
    Typing,
    Paused,
    Completed,
    Stopped,
}

impl Phase {
    /// Whether a new `start` is accepted from this phase.
    pub fn accepts_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed | Phase::Stopped)
    }
}
