use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::config::{SharedConfig, TypingConfig};
use crate::emit::{KeyEmitter, Pacer, StatusReporter};
use crate::keyboard::prepare_text;
use crate::model::{Phase, Severity};
use crate::session::{countdown, Outcome, Session};

const IDLE: u8 = 0;
const STARTING: u8 = 1;
const TYPING: u8 = 2;
const COMPLETED: u8 = 3;
const STOPPED: u8 = 4;

/// Signal flags shared between the control surface and the worker.
///
/// The control surface only writes `running`/`paused`; the worker only reads
/// them. Lifecycle moves through compare-and-swap so a late worker cannot
/// clobber a newer session's phase.
#[derive(Debug)]
pub struct Control {
    running: AtomicBool,
    paused: AtomicBool,
    lifecycle: AtomicU8,
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl Control {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            lifecycle: AtomicU8::new(IDLE),
        }
    }

    /// A control already in the typing state, for driving a [`Session`]
    /// directly.
    pub fn started() -> Self {
        let control = Self::new();
        control.running.store(true, Ordering::SeqCst);
        control.lifecycle.store(TYPING, Ordering::SeqCst);
        control
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle.load(Ordering::SeqCst) {
            STARTING | TYPING if self.is_paused() => Phase::Paused,
            STARTING => Phase::Starting,
            TYPING => Phase::Typing,
            COMPLETED => Phase::Completed,
            STOPPED => Phase::Stopped,
            _ => Phase::Idle,
        }
    }

    fn is_active(&self) -> bool {
        matches!(self.lifecycle.load(Ordering::SeqCst), STARTING | TYPING)
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.lifecycle
            .compare_exchange(from, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn claim_start(&self) -> bool {
        [IDLE, COMPLETED, STOPPED]
            .into_iter()
            .any(|from| self.transition(from, STARTING))
    }

    fn arm(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
    }

    /// Flip the paused flag. Returns the new value. No-op unless a session is
    /// starting or typing.
    pub fn toggle_pause(&self) -> Option<bool> {
        if !self.is_active() {
            return None;
        }
        Some(!self.paused.fetch_xor(true, Ordering::SeqCst))
    }

    /// Halt the worker. Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        let stopped =
            self.transition(STARTING, STOPPED) || self.transition(TYPING, STOPPED);
        self.running.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        stopped
    }

    fn begin_typing(&self) -> bool {
        self.transition(STARTING, TYPING)
    }

    fn complete(&self) -> bool {
        let completed = self.transition(TYPING, COMPLETED);
        if completed {
            self.running.store(false, Ordering::SeqCst);
            self.paused.store(false, Ordering::SeqCst);
        }
        completed
    }
}

/// The control surface's handle on the typing engine.
///
/// Each `start` builds a fresh [`Session`] and types it on one background
/// thread; `pause_toggle` and `stop` only flip flags the worker polls.
pub struct Typist<O> {
    control: Arc<Control>,
    config: Arc<SharedConfig>,
    settings: TypingConfig,
    output: Arc<Mutex<O>>,
    reporter: Arc<dyn StatusReporter>,
    seed: Option<u64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<O> Typist<O>
where
    O: KeyEmitter + Pacer + Send + 'static,
{
    pub fn new(settings: TypingConfig, output: O, reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            control: Arc::new(Control::new()),
            config: Arc::new(SharedConfig::new(&settings)),
            settings,
            output: Arc::new(Mutex::new(output)),
            reporter,
            seed: None,
            worker: Mutex::new(None),
        }
    }

    /// Seed every session's RNG, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn control(&self) -> &Arc<Control> {
        &self.control
    }

    /// Live-editable bounds; changes apply to a running session.
    pub fn config(&self) -> &Arc<SharedConfig> {
        &self.config
    }

    pub fn output(&self) -> &Arc<Mutex<O>> {
        &self.output
    }

    pub fn phase(&self) -> Phase {
        self.control.phase()
    }

    /// Begin typing `text` after the configured countdown.
    ///
    /// Returns false when ignored: a session is already active, or the text is
    /// blank or has a character with no US keystroke (both reported as
    /// warnings).
    pub fn start(&self, text: &str) -> bool {
        if !self.control.phase().accepts_start() {
            return false;
        }

        let text = match prepare_text(text) {
            Ok(text) => text,
            Err(err) => {
                self.reporter.report(&format!("{err:#}"), Severity::Warning);
                return false;
            }
        };
        if text.is_empty() {
            self.reporter
                .report("Please enter some text to type!", Severity::Warning);
            return false;
        }

        if !self.control.claim_start() {
            return false;
        }

        // A stopped worker exits within one keystroke; it must be gone before
        // `running` is raised again.
        self.join_worker();
        self.control.arm();

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let control = self.control.clone();
        let config = self.config.clone();
        let output = self.output.clone();
        let reporter = self.reporter.clone();
        let countdown_secs = self.settings.countdown_secs;
        let change_chance = self.settings.speed_change_chance;

        debug!(chars = text.chars().count(), countdown_secs, "starting session");

        let handle = std::thread::spawn(move || {
            let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);

            if !countdown(countdown_secs, &mut *out, reporter.as_ref(), &control) {
                return;
            }
            if !control.begin_typing() {
                return;
            }

            let mut session = Session::new(&text, change_chance, config, rng);
            match session.run(&mut *out, reporter.as_ref(), &control) {
                Outcome::Completed => {
                    if control.complete() {
                        reporter.report("Completed", Severity::Success);
                    }
                }
                Outcome::Stopped => debug!(cursor = session.cursor(), "worker exiting after stop"),
            }
        });

        match self.worker.lock() {
            Ok(mut worker) => *worker = Some(handle),
            Err(poisoned) => *poisoned.into_inner() = Some(handle),
        }
        true
    }

    pub fn pause_toggle(&self) {
        match self.control.toggle_pause() {
            Some(true) => self.reporter.report("Paused", Severity::Info),
            Some(false) => self.reporter.report("Typing...", Severity::Info),
            None => {}
        }
    }

    pub fn stop(&self) {
        if self.control.stop() {
            self.reporter.report("Stopped", Severity::Info);
        }
    }

    /// Block until the current worker, if any, has exited.
    pub fn wait(&self) {
        self.join_worker();
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("typing worker panicked");
            }
        }
    }
}

impl<O> Drop for Typist<O> {
    fn drop(&mut self) {
        self.control.stop();
    }
}
