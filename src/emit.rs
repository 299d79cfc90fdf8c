//! Collaborator interfaces the engine talks to, plus in-memory and console
//! implementations.

use std::sync::Mutex;
use std::time::Duration;

use crate::driver::Control;
use crate::model::{KeyEvent, Severity};

/// Emits keystrokes to whatever has input focus.
///
/// Emission is fire-and-forget: implementations own their error handling and
/// the engine never retries.
pub trait KeyEmitter {
    fn emit_char(&mut self, c: char);
    fn emit_backspace(&mut self);
}

/// Suspends the worker between keystrokes.
///
/// Implementations must return early once `control` reports a stop, so every
/// wait is bounded by both `ms` and the stop latency.
pub trait Pacer {
    fn wait(&mut self, ms: u64, control: &Control);
}

/// Receives status updates. Must not block the worker.
pub trait StatusReporter: Send + Sync {
    fn report(&self, text: &str, severity: Severity);
}

impl<T: KeyEmitter + ?Sized> KeyEmitter for Box<T> {
    fn emit_char(&mut self, c: char) {
        (**self).emit_char(c)
    }

    fn emit_backspace(&mut self) {
        (**self).emit_backspace()
    }
}

/// Records every event instead of touching a keyboard or a clock.
///
/// Waits are instant except while `control` is paused: pause polls then take
/// real time, so a paused [`crate::driver::Typist`] idles instead of spinning
/// and the recorded waits track how long the pause lasted.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Vec<KeyEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_events(self) -> Vec<KeyEvent> {
        self.events
    }

    /// Only the keystrokes, with waits dropped.
    pub fn keystrokes(&self) -> Vec<KeyEvent> {
        self.events
            .iter()
            .copied()
            .filter(|e| !matches!(e, KeyEvent::Wait { .. }))
            .collect()
    }
}

impl KeyEmitter for Recorder {
    fn emit_char(&mut self, c: char) {
        self.events.push(KeyEvent::Char { c });
    }

    fn emit_backspace(&mut self) {
        self.events.push(KeyEvent::Backspace);
    }
}

impl Pacer for Recorder {
    fn wait(&mut self, ms: u64, control: &Control) {
        if control.is_paused() {
            std::thread::sleep(Duration::from_millis(ms));
        }
        if ms > 0 {
            self.events.push(KeyEvent::Wait { ms });
        }
    }
}

/// Keeps every report, for tests and for callers that poll status.
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: Mutex<Vec<(String, Severity)>>,
}

impl StatusLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Severity)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<(String, Severity)> {
        self.entries().pop()
    }
}

impl StatusReporter for StatusLog {
    fn report(&self, text: &str, severity: Severity) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((text.to_string(), severity));
        }
    }
}

/// Writes colored status lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl StatusReporter for ConsoleReporter {
    fn report(&self, text: &str, severity: Severity) {
        const RESET: &str = "\x1b[0m";
        const INFO: &str = "\x1b[34m";
        const SUCCESS: &str = "\x1b[32m";
        const WARNING: &str = "\x1b[33m";

        let color = match severity {
            Severity::Info => INFO,
            Severity::Success => SUCCESS,
            Severity::Warning => WARNING,
        };
        eprintln!("{color}Status:{RESET} {text}");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn recorder_waits_are_instant_unless_paused() {
        let control = Control::started();
        let mut rec = Recorder::new();

        let started = Instant::now();
        rec.wait(10_000, &control);
        assert!(started.elapsed() < Duration::from_millis(500));

        control.toggle_pause();
        let started = Instant::now();
        rec.wait(60, &control);
        assert!(started.elapsed() >= Duration::from_millis(60));

        assert_eq!(
            rec.into_events(),
            vec![KeyEvent::Wait { ms: 10_000 }, KeyEvent::Wait { ms: 60 }]
        );
    }
}
