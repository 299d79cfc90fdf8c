use rand::Rng;
use tracing::debug;

use crate::config::TypoBounds;
use crate::keyboard::qwerty_adjacent_char;

const NOTICE_MS_MIN: u64 = 80;
const NOTICE_MS_MAX: u64 = 200;

/// One keystroke-level step of a backspace-and-retype correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStep {
    /// Type the character that ended the word.
    Boundary(char),
    /// Hold still while the typist notices the error.
    Notice { ms: u64 },
    Backspace,
    Retype(char),
}

/// Decides which words get a mistyped key and how the word is repaired.
///
/// At most one substitution happens per word, and the word buffer always holds
/// the correct characters so a correction restores the source exactly.
#[derive(Debug, Clone)]
pub struct MistakeInjector {
    words_since_mistake: u32,
    next_mistake_threshold: u32,
    word_buffer: Vec<char>,
    typed_length: usize,
    mistake_planned: bool,
    mistake_emitted: bool,
}

impl MistakeInjector {
    pub fn new(bounds: TypoBounds, rng: &mut impl Rng) -> Self {
        Self {
            words_since_mistake: 0,
            next_mistake_threshold: draw_threshold(bounds, rng),
            word_buffer: Vec::new(),
            typed_length: 0,
            mistake_planned: false,
            mistake_emitted: false,
        }
    }

    pub fn words_since_mistake(&self) -> u32 {
        self.words_since_mistake
    }

    pub fn next_mistake_threshold(&self) -> u32 {
        self.next_mistake_threshold
    }

    pub fn word_buffer(&self) -> &[char] {
        &self.word_buffer
    }

    pub fn typed_length(&self) -> usize {
        self.typed_length
    }

    pub fn mistake_planned(&self) -> bool {
        self.mistake_planned
    }

    pub fn in_word(&self) -> bool {
        !self.word_buffer.is_empty()
    }

    /// Make the next word that starts receive a mistake, regardless of the
    /// current interval.
    pub fn schedule_now(&mut self) {
        self.next_mistake_threshold = 0;
    }

    pub fn should_plan_mistake(&self) -> bool {
        self.words_since_mistake >= self.next_mistake_threshold
    }

    /// Called at the first character of a new word.
    pub fn begin_word(&mut self) {
        self.mistake_planned = self.should_plan_mistake();
        self.mistake_emitted = false;
        if self.mistake_planned {
            debug!(
                words_since_mistake = self.words_since_mistake,
                "mistake planned for this word"
            );
        }
    }

    /// The character to actually emit for `correct_char`.
    pub fn maybe_substitute(&mut self, correct_char: char, rng: &mut impl Rng) -> char {
        if !self.mistake_planned || self.mistake_emitted {
            return correct_char;
        }
        match qwerty_adjacent_char(correct_char, rng) {
            Some(wrong) => {
                self.mistake_emitted = true;
                wrong
            }
            None => correct_char,
        }
    }

    /// Track the correct character for a keystroke that was just emitted.
    pub fn record(&mut self, correct_char: char) {
        self.word_buffer.push(correct_char);
        self.typed_length += 1;
    }

    /// Whether the current word contains an uncorrected substitution.
    pub fn owes_correction(&self) -> bool {
        self.mistake_emitted
    }

    /// Keystrokes that repair the current word and then finish it with
    /// `boundary`. `None` means the text ended mid-word.
    pub fn correction_steps(
        &self,
        boundary: Option<char>,
        rng: &mut impl Rng,
    ) -> Vec<CorrectionStep> {
        let mut steps = Vec::with_capacity(self.typed_length * 2 + 4);
        let retype = self.word_buffer.iter().map(|&c| CorrectionStep::Retype(c));

        match boundary {
            Some(ws) if ws.is_whitespace() => {
                // The space goes out before the typist notices, so it is
                // deleted along with the word.
                steps.push(CorrectionStep::Boundary(ws));
                steps.push(CorrectionStep::Notice {
                    ms: rng.gen_range(NOTICE_MS_MIN..=NOTICE_MS_MAX),
                });
                steps.extend((0..=self.typed_length).map(|_| CorrectionStep::Backspace));
                steps.extend(retype);
                steps.push(CorrectionStep::Boundary(ws));
            }
            Some(other) => {
                steps.extend((0..self.typed_length).map(|_| CorrectionStep::Backspace));
                steps.extend(retype);
                steps.push(CorrectionStep::Boundary(other));
            }
            None => {
                steps.extend((0..self.typed_length).map(|_| CorrectionStep::Backspace));
                steps.extend(retype);
            }
        }

        steps
    }

    /// Commit the current word. Resets the interval if it was corrected.
    ///
    /// The corrected word itself opens the next interval: the counter is
    /// zeroed and then counts that word, so it reads 1 (never 0) right after
    /// a correction. With thresholds of N a mistake lands every N words.
    pub fn complete_word(&mut self, bounds: TypoBounds, rng: &mut impl Rng) {
        if self.mistake_emitted {
            self.words_since_mistake = 0;
            self.next_mistake_threshold = draw_threshold(bounds, rng);
            debug!(
                next = self.next_mistake_threshold,
                "mistake corrected, interval re-armed"
            );
        }
        self.words_since_mistake = self.words_since_mistake.saturating_add(1);
        self.clear_word();
    }

    /// Drop the in-flight word without touching the interval counters.
    pub fn clear_word(&mut self) {
        self.word_buffer.clear();
        self.typed_length = 0;
        self.mistake_planned = false;
        self.mistake_emitted = false;
    }
}

fn draw_threshold(bounds: TypoBounds, rng: &mut impl Rng) -> u32 {
    let bounds = TypoBounds::new(bounds.min_words, bounds.max_words);
    rng.gen_range(bounds.min_words..=bounds.max_words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn type_word(injector: &mut MistakeInjector, word: &str, rng: &mut impl Rng) -> String {
        injector.begin_word();
        word.chars()
            .map(|c| {
                let out = injector.maybe_substitute(c, rng);
                injector.record(c);
                out
            })
            .collect()
    }

    #[test]
    fn substitutes_once_per_planned_word() {
        let mut rng = StepRng::new(0, 0);
        let mut injector = MistakeInjector::new(TypoBounds::new(1, 1), &mut rng);
        injector.schedule_now();

        let typed = type_word(&mut injector, "cat", &mut rng);
        assert_eq!(typed, "xat");
        assert!(injector.owes_correction());
        assert_eq!(injector.typed_length(), injector.word_buffer().len());
    }

    #[test]
    fn corrected_word_leaves_counter_at_one() {
        let bounds = TypoBounds::new(4, 4);
        let mut rng = StepRng::new(0, 0);
        let mut injector = MistakeInjector::new(bounds, &mut rng);
        for _ in 0..6 {
            type_word(&mut injector, "word", &mut rng);
            injector.complete_word(bounds, &mut rng);
        }
        injector.schedule_now();

        type_word(&mut injector, "cat", &mut rng);
        assert!(injector.owes_correction());
        injector.complete_word(bounds, &mut rng);

        assert_eq!(injector.words_since_mistake(), 1);
        assert_eq!(injector.next_mistake_threshold(), 4);
        assert!(!injector.in_word());
    }

    #[test]
    fn unmapped_characters_leave_planned_word_clean() {
        let mut rng = StepRng::new(0, 0);
        let mut injector = MistakeInjector::new(TypoBounds::new(1, 1), &mut rng);
        injector.schedule_now();

        let typed = type_word(&mut injector, "né", &mut rng);
        assert_eq!(typed, "bé");

        injector.complete_word(TypoBounds::new(1, 1), &mut rng);
        injector.schedule_now();
        let typed = type_word(&mut injector, "'é'", &mut rng);
        assert_eq!(typed, "'é'");
        assert!(injector.mistake_planned());
        assert!(!injector.owes_correction());

        // No reset: the next word is planned again.
        let before = injector.words_since_mistake();
        injector.complete_word(TypoBounds::new(5, 5), &mut rng);
        assert_eq!(injector.words_since_mistake(), before + 1);
        assert!(injector.should_plan_mistake());
    }

    #[test]
    fn whitespace_boundary_deletes_the_space_too() {
        let mut rng = StepRng::new(0, 0);
        let mut injector = MistakeInjector::new(TypoBounds::new(1, 1), &mut rng);
        injector.schedule_now();
        type_word(&mut injector, "cat", &mut rng);

        let steps = injector.correction_steps(Some(' '), &mut rng);
        let backspaces = steps
            .iter()
            .filter(|s| **s == CorrectionStep::Backspace)
            .count();
        assert_eq!(backspaces, 4);
        assert_eq!(steps[0], CorrectionStep::Boundary(' '));
        assert_eq!(steps[1], CorrectionStep::Notice { ms: 80 });
        assert_eq!(steps.last(), Some(&CorrectionStep::Boundary(' ')));
    }

    #[test]
    fn punctuation_and_end_of_text_corrections() {
        let mut rng = StepRng::new(0, 0);
        let mut injector = MistakeInjector::new(TypoBounds::new(1, 1), &mut rng);
        injector.schedule_now();
        type_word(&mut injector, "ok", &mut rng);

        assert_eq!(
            injector.correction_steps(Some(','), &mut rng),
            vec![
                CorrectionStep::Backspace,
                CorrectionStep::Backspace,
                CorrectionStep::Retype('o'),
                CorrectionStep::Retype('k'),
                CorrectionStep::Boundary(','),
            ]
        );
        assert_eq!(
            injector.correction_steps(None, &mut rng),
            vec![
                CorrectionStep::Backspace,
                CorrectionStep::Backspace,
                CorrectionStep::Retype('o'),
                CorrectionStep::Retype('k'),
            ]
        );
    }

    #[test]
    fn interval_counts_words_and_resets_on_correction() {
        let bounds = TypoBounds::new(3, 3);
        let mut rng = StdRng::seed_from_u64(5);
        let mut injector = MistakeInjector::new(bounds, &mut rng);

        let mut corrected_at = Vec::new();
        for word_no in 1..=10 {
            type_word(&mut injector, "word", &mut rng);
            if injector.owes_correction() {
                corrected_at.push(word_no);
            }
            injector.complete_word(bounds, &mut rng);
            assert!(injector.words_since_mistake() >= 1);
        }

        assert_eq!(corrected_at, vec![4, 7, 10]);
    }
}
