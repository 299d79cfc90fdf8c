use rand::Rng;
use tracing::debug;

use crate::config::RateBounds;

/// Per-call step used while sprinting toward the maximum rate.
pub const BURST_ACCELERATION: f64 = 10.0;

const BURST_CHANCE: f64 = 0.30;
const ARRIVAL_EPSILON: f64 = 0.1;
const ARRIVED_RETARGET_CHANCE: f64 = 0.20;
const MICRO_HESITATION_CHANCE: f64 = 0.05;
// 5 characters per word.
const MIN_CHARS_PER_MINUTE: f64 = 5.0;

/// Evolving typing rate for one session.
///
/// `current_rate` is kept inside the bounds passed to every call, so the
/// control surface may move the bounds mid-session.
#[derive(Debug, Clone)]
pub struct SpeedModel {
    current_rate: f64,
    target_rate: f64,
    acceleration: f64,
    burst_active: bool,
    change_chance: f64,
}

impl SpeedModel {
    pub fn new(bounds: RateBounds, change_chance: f64, rng: &mut impl Rng) -> Self {
        let start = rng.gen_range(bounds.min..=bounds.max);
        Self {
            current_rate: start,
            target_rate: start,
            acceleration: 0.0,
            burst_active: false,
            change_chance: if change_chance.is_finite() {
                change_chance.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn burst_active(&self) -> bool {
        self.burst_active
    }

    fn retarget(&mut self, bounds: RateBounds, rng: &mut impl Rng) {
        self.target_rate = rng.gen_range(bounds.min..=bounds.max);
        self.acceleration = rng.gen_range(-2.0..=2.0);
    }

    fn resolve_behavior_change(&mut self, bounds: RateBounds, rng: &mut impl Rng) {
        if !rng.gen_bool(self.change_chance) {
            return;
        }

        if rng.gen_bool(BURST_CHANCE) {
            if !self.burst_active {
                debug!(from = self.current_rate, "speed burst started");
            }
            self.burst_active = true;
            self.target_rate = bounds.max;
            self.acceleration = BURST_ACCELERATION;
        } else {
            self.burst_active = false;
            self.retarget(bounds, rng);
        }
    }

    fn step_toward_target(&mut self, bounds: RateBounds) {
        self.target_rate = bounds.clamp(self.target_rate);
        let step = self.acceleration.abs();
        let gap = self.target_rate - self.current_rate;
        let moved = if gap.abs() <= step {
            self.target_rate
        } else {
            self.current_rate + step.copysign(gap)
        };
        self.current_rate = bounds.clamp(moved);
    }

    fn arrived(&self) -> bool {
        (self.current_rate - self.target_rate).abs() <= ARRIVAL_EPSILON
    }

    /// Advance the rate by one keystroke without producing a delay.
    pub fn advance(&mut self, bounds: RateBounds, rng: &mut impl Rng) {
        self.resolve_behavior_change(bounds, rng);
        self.step_toward_target(bounds);

        if self.burst_active {
            if self.arrived() {
                // Sprints always settle toward the slow end.
                self.burst_active = false;
                self.target_rate = bounds.min;
                self.acceleration = -rng.gen_range(0.5..=2.0);
                debug!(rate = self.current_rate, "speed burst ended");
            }
        } else if self.arrived() && rng.gen_bool(ARRIVED_RETARGET_CHANCE) {
            self.retarget(bounds, rng);
        }
    }

    /// Milliseconds to wait after the next keystroke.
    pub fn next_delay_ms(&mut self, bounds: RateBounds, rng: &mut impl Rng) -> f64 {
        self.advance(bounds, rng);

        let chars_per_minute = (self.current_rate * 5.0).max(MIN_CHARS_PER_MINUTE);
        let base = 60_000.0 / chars_per_minute;
        let mut delay = base * rng.gen_range(0.9..=1.1);

        if !self.burst_active && rng.gen_bool(MICRO_HESITATION_CHANCE) {
            delay += rng.gen_range(100.0..=300.0);
        }

        delay
    }
}

const COMMON_BIGRAMS: [&str; 15] = [
    "th", "he", "an", "in", "er", "on", "at", "nd", "st", "es", "en", "of", "te", "ed", "ti",
];

/// Multiplier applied to a forward keystroke's delay based on its neighbors.
pub fn context_factor(prev: Option<char>, c: char, rng: &mut impl Rng) -> f64 {
    if let Some(p) = prev {
        let pair: String = [p, c].iter().flat_map(|ch| ch.to_lowercase()).collect();
        if COMMON_BIGRAMS.contains(&pair.as_str()) {
            return 0.85;
        }
    }

    if c.is_ascii_digit() || c.is_ascii_punctuation() {
        return rng.gen_range(1.2..=1.5);
    }

    match prev {
        Some('.' | '!' | '?') => rng.gen_range(1.5..=2.0),
        Some('d' | 't' | 's' | 'n') if c == ' ' => 0.8,
        _ => 1.0,
    }
}
