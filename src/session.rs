use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::config::SharedConfig;
use crate::driver::Control;
use crate::emit::{KeyEmitter, Pacer, StatusReporter};
use crate::keyboard::is_word_char;
use crate::mistake::{CorrectionStep, MistakeInjector};
use crate::model::Severity;
use crate::pause::PauseScheduler;
use crate::speed::{context_factor, SpeedModel};

/// Poll interval while paused.
pub const PAUSE_POLL_MS: u64 = 100;

const BACKSPACE_DELAY_SCALE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Stopped,
}

/// All state for one playback, owned by the worker that types it.
#[derive(Debug)]
pub struct Session<R> {
    source: Vec<char>,
    cursor: usize,
    speed: SpeedModel,
    pauses: PauseScheduler,
    mistakes: MistakeInjector,
    config: Arc<SharedConfig>,
    rng: R,
}

impl<R: Rng> Session<R> {
    pub fn new(text: &str, speed_change_chance: f64, config: Arc<SharedConfig>, mut rng: R) -> Self {
        let speed = SpeedModel::new(config.rate_bounds(), speed_change_chance, &mut rng);
        let pauses = PauseScheduler::new(&mut rng);
        let mistakes = MistakeInjector::new(config.typo_bounds(), &mut rng);
        Self {
            source: text.chars().collect(),
            cursor: 0,
            speed,
            pauses,
            mistakes,
            config,
            rng,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn speed(&self) -> &SpeedModel {
        &self.speed
    }

    pub fn pauses(&self) -> &PauseScheduler {
        &self.pauses
    }

    pub fn mistakes(&self) -> &MistakeInjector {
        &self.mistakes
    }

    pub fn mistakes_mut(&mut self) -> &mut MistakeInjector {
        &mut self.mistakes
    }

    /// Type the whole source, returning early if `control` is stopped.
    pub fn run<O>(&mut self, out: &mut O, reporter: &dyn StatusReporter, control: &Control) -> Outcome
    where
        O: KeyEmitter + Pacer,
    {
        reporter.report("Typing...", Severity::Info);

        while self.cursor < self.source.len() {
            if !gate(out, control) {
                return self.abort();
            }

            let c = self.source[self.cursor];
            let prev = self.prev_char();
            self.cursor += 1;

            if is_word_char(c) {
                self.type_word_char(prev, c, out, control);
            } else if !self.finish_word(Some(c), prev, out, reporter, control) {
                return self.abort();
            }
        }

        // Text ended mid-word; repair without a trailing boundary.
        if self.mistakes.in_word() && !self.finish_word(None, None, out, reporter, control) {
            return self.abort();
        }

        Outcome::Completed
    }

    fn prev_char(&self) -> Option<char> {
        self.cursor.checked_sub(1).map(|i| self.source[i])
    }

    fn abort(&mut self) -> Outcome {
        debug!(cursor = self.cursor, "session stopped");
        self.mistakes.clear_word();
        Outcome::Stopped
    }

    fn type_word_char<O>(&mut self, prev: Option<char>, c: char, out: &mut O, control: &Control)
    where
        O: KeyEmitter + Pacer,
    {
        if !self.mistakes.in_word() {
            self.mistakes.begin_word();
        }

        let emitted = self.mistakes.maybe_substitute(c, &mut self.rng);
        if c.is_uppercase() {
            // Reaching for shift.
            let hesitation = self.rng.gen_range(50..=100);
            out.wait(hesitation, control);
        }

        out.emit_char(emitted);
        self.mistakes.record(c);

        let delay = self.forward_delay_ms(prev, c);
        out.wait(delay, control);
    }

    fn forward_delay_ms(&mut self, prev: Option<char>, c: char) -> u64 {
        let base = self
            .speed
            .next_delay_ms(self.config.rate_bounds(), &mut self.rng);
        let mut delay = to_ms(base * context_factor(prev, c, &mut self.rng));
        if c == '\n' {
            delay += self.rng.gen_range(500..=1000);
        }
        delay
    }

    fn retype_delay_ms(&mut self, scale: f64) -> u64 {
        let base = self
            .speed
            .next_delay_ms(self.config.rate_bounds(), &mut self.rng);
        to_ms(base * scale)
    }

    /// Close the current word at `boundary`. Returns false if stopped midway.
    fn finish_word<O>(
        &mut self,
        boundary: Option<char>,
        prev: Option<char>,
        out: &mut O,
        reporter: &dyn StatusReporter,
        control: &Control,
    ) -> bool
    where
        O: KeyEmitter + Pacer,
    {
        let closed_word = self.mistakes.in_word();

        if self.mistakes.owes_correction() {
            let steps = self.mistakes.correction_steps(boundary, &mut self.rng);
            debug!(
                word = %self.mistakes.word_buffer().iter().collect::<String>(),
                steps = steps.len(),
                "correcting mistyped word"
            );
            if !self.run_correction(&steps, out, control) {
                return false;
            }
        } else if let Some(b) = boundary {
            out.emit_char(b);
            let delay = self.forward_delay_ms(prev, b);
            out.wait(delay, control);
        }

        if !closed_word {
            return true;
        }

        self.mistakes
            .complete_word(self.config.typo_bounds(), &mut self.rng);

        if boundary.is_some() {
            if let Some(secs) = self.pauses.on_word_boundary(&mut self.rng) {
                reporter.report(&format!("Thinking pause ({secs:.1}s)"), Severity::Info);
                out.wait(to_ms(secs * 1000.0), control);
                if !control.is_running() {
                    return false;
                }
                reporter.report("Typing...", Severity::Info);
            }
        }

        true
    }

    fn run_correction<O>(&mut self, steps: &[CorrectionStep], out: &mut O, control: &Control) -> bool
    where
        O: KeyEmitter + Pacer,
    {
        for (i, step) in steps.iter().enumerate() {
            if !gate(out, control) {
                return false;
            }

            match *step {
                CorrectionStep::Boundary(b) => {
                    out.emit_char(b);
                    // Only the closing boundary gets a cadence delay; the
                    // first one is followed by the notice hold.
                    if i + 1 == steps.len() {
                        let prev = self.mistakes.word_buffer().last().copied();
                        let delay = self.forward_delay_ms(prev, b);
                        out.wait(delay, control);
                    }
                }
                CorrectionStep::Notice { ms } => out.wait(ms, control),
                CorrectionStep::Backspace => {
                    out.emit_backspace();
                    let delay = self.retype_delay_ms(BACKSPACE_DELAY_SCALE);
                    out.wait(delay, control);
                }
                CorrectionStep::Retype(c) => {
                    out.emit_char(c);
                    let delay = self.retype_delay_ms(1.0);
                    out.wait(delay, control);
                }
            }
        }
        true
    }
}

/// Block while paused. Returns false once stopped.
fn gate<O: Pacer>(out: &mut O, control: &Control) -> bool {
    loop {
        if !control.is_running() {
            return false;
        }
        if !control.is_paused() {
            return true;
        }
        out.wait(PAUSE_POLL_MS, control);
    }
}

/// Wait through a start countdown, reporting each second.
pub fn countdown<O: Pacer>(
    secs: u64,
    out: &mut O,
    reporter: &dyn StatusReporter,
    control: &Control,
) -> bool {
    for remaining in (1..=secs).rev() {
        if !gate(out, control) {
            return false;
        }
        reporter.report(&format!("Starting in {remaining}..."), Severity::Info);
        out.wait(1000, control);
    }
    control.is_running()
}

fn to_ms(ms: f64) -> u64 {
    if ms.is_finite() {
        ms.round().max(1.0) as u64
    } else {
        1
    }
}
