use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    pub min_wpm: u32,
    pub max_wpm: u32,
    pub typo_min_words: u32,
    pub typo_max_words: u32,
    pub countdown_secs: u64,
    pub speed_change_chance: f64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_wpm: 60,
            max_wpm: 80,
            typo_min_words: 10,
            typo_max_words: 25,
            countdown_secs: 3,
            speed_change_chance: 0.15,
        }
    }
}

impl TypingConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Strict check for user-supplied settings. The engine still sanitizes
    /// bounds on every read.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_wpm > 0 && self.max_wpm > 0,
            "min_wpm and max_wpm must be > 0"
        );
        ensure!(self.min_wpm <= self.max_wpm, "min_wpm must be <= max_wpm");
        ensure!(
            self.typo_min_words > 0 && self.typo_max_words > 0,
            "typo_min_words and typo_max_words must be > 0"
        );
        ensure!(
            self.typo_min_words <= self.typo_max_words,
            "typo_min_words must be <= typo_max_words"
        );
        ensure!(
            (0.0..=1.0).contains(&self.speed_change_chance),
            "speed_change_chance must be between 0.0 and 1.0"
        );
        Ok(())
    }
}

/// Words-per-minute bounds, already sanitized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBounds {
    pub min: f64,
    pub max: f64,
}

impl RateBounds {
    pub fn new(min: u32, max: u32) -> Self {
        let (lo, hi) = ordered_positive(min, max);
        Self {
            min: lo as f64,
            max: hi as f64,
        }
    }

    pub fn clamp(&self, wpm: f64) -> f64 {
        if wpm.is_finite() {
            wpm.clamp(self.min, self.max)
        } else {
            self.min
        }
    }
}

/// Inclusive range of words between injected mistakes, already sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypoBounds {
    pub min_words: u32,
    pub max_words: u32,
}

impl TypoBounds {
    pub fn new(min: u32, max: u32) -> Self {
        let (min_words, max_words) = ordered_positive(min, max);
        Self {
            min_words,
            max_words,
        }
    }
}

fn ordered_positive(a: u32, b: u32) -> (u32, u32) {
    let a = a.max(1);
    let b = b.max(1);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Bounds the control surface may change while a session is typing.
///
/// Every field is an independent atomic scalar; readers never see a torn value
/// but may observe `min` and `max` from different writes, which the sanitizing
/// constructors above absorb.
#[derive(Debug)]
pub struct SharedConfig {
    min_wpm: AtomicU32,
    max_wpm: AtomicU32,
    typo_min_words: AtomicU32,
    typo_max_words: AtomicU32,
}

impl SharedConfig {
    pub fn new(cfg: &TypingConfig) -> Self {
        Self {
            min_wpm: AtomicU32::new(cfg.min_wpm),
            max_wpm: AtomicU32::new(cfg.max_wpm),
            typo_min_words: AtomicU32::new(cfg.typo_min_words),
            typo_max_words: AtomicU32::new(cfg.typo_max_words),
        }
    }

    pub fn set_wpm(&self, min: u32, max: u32) {
        self.min_wpm.store(min, Ordering::Relaxed);
        self.max_wpm.store(max, Ordering::Relaxed);
    }

    pub fn set_typo_words(&self, min: u32, max: u32) {
        self.typo_min_words.store(min, Ordering::Relaxed);
        self.typo_max_words.store(max, Ordering::Relaxed);
    }

    pub fn rate_bounds(&self) -> RateBounds {
        RateBounds::new(
            self.min_wpm.load(Ordering::Relaxed),
            self.max_wpm.load(Ordering::Relaxed),
        )
    }

    pub fn typo_bounds(&self) -> TypoBounds {
        TypoBounds::new(
            self.typo_min_words.load(Ordering::Relaxed),
            self.typo_max_words.load(Ordering::Relaxed),
        )
    }
}
