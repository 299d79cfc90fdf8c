use rand::Rng;
use tracing::debug;

const THRESHOLD_MIN_WORDS: u32 = 1;
const THRESHOLD_MAX_WORDS: u32 = 8;
const PAUSE_SECS_MIN: f64 = 0.5;
const PAUSE_SECS_MAX: f64 = 3.0;

/// Inserts a multi-second "thinking" pause every few words.
#[derive(Debug, Clone)]
pub struct PauseScheduler {
    words_since_pause: u32,
    next_pause_threshold: u32,
}

impl PauseScheduler {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            words_since_pause: 0,
            next_pause_threshold: draw_threshold(rng),
        }
    }

    pub fn words_since_pause(&self) -> u32 {
        self.words_since_pause
    }

    pub fn next_pause_threshold(&self) -> u32 {
        self.next_pause_threshold
    }

    /// Count a completed word. Returns the pause length in seconds when one is
    /// due, after re-arming with a fresh threshold.
    pub fn on_word_boundary(&mut self, rng: &mut impl Rng) -> Option<f64> {
        self.words_since_pause += 1;
        if self.words_since_pause < self.next_pause_threshold {
            return None;
        }

        let secs = rng.gen_range(PAUSE_SECS_MIN..=PAUSE_SECS_MAX);
        self.words_since_pause = 0;
        self.next_pause_threshold = draw_threshold(rng);
        debug!(secs, next = self.next_pause_threshold, "thinking pause");
        Some(secs)
    }
}

fn draw_threshold(rng: &mut impl Rng) -> u32 {
    rng.gen_range(THRESHOLD_MIN_WORDS..=THRESHOLD_MAX_WORDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn fires_exactly_at_threshold_and_resets() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pauses = PauseScheduler::new(&mut rng);

        for _ in 0..200 {
            let threshold = pauses.next_pause_threshold();
            assert!((1..=8).contains(&threshold));

            for word in 1..threshold {
                assert_eq!(pauses.on_word_boundary(&mut rng), None);
                assert_eq!(pauses.words_since_pause(), word);
            }

            let secs = pauses.on_word_boundary(&mut rng).expect("pause due");
            assert!((0.5..=3.0).contains(&secs));
            assert_eq!(pauses.words_since_pause(), 0);
        }
    }
}
