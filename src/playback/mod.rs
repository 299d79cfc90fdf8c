pub mod backends;
mod util;

use anyhow::{anyhow, Result};

use crate::driver::Control;
use crate::emit::{ConsoleReporter, KeyEmitter, Pacer};
use crate::model::{KeyEvent, Transcript};
use crate::session::countdown;
use crate::trace::transcript_trace;

pub use util::sleep_interruptible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackBackend {
    Auto,
    X11,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> PlaybackBackend {
    // Xwayland sessions export DISPLAY too, so X11 covers them.
    if env_is_set("DISPLAY") {
        return PlaybackBackend::X11;
    }
    PlaybackBackend::Auto
}

fn backend_unavailable_message() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();
    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected an X11 DISPLAY).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

pub fn resolve_backend(requested: PlaybackBackend) -> Result<PlaybackBackend> {
    let resolved = match requested {
        PlaybackBackend::Auto => auto_backend(),
        other => other,
    };

    match resolved {
        PlaybackBackend::X11 => {
            if cfg!(feature = "x11") {
                Ok(PlaybackBackend::X11)
            } else {
                let how = match requested {
                    PlaybackBackend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {}",
                    backend_unavailable_message()
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!(
            "No supported playback backend detected. {}\n\
             Pure Wayland sessions are not supported; run under X11 or Xwayland.",
            backend_unavailable_message()
        )),
    }
}

/// Connect a keyboard for the resolved backend.
pub fn open_keyboard(requested: PlaybackBackend) -> Result<Box<dyn KeyEmitter + Send>> {
    match resolve_backend(requested)? {
        PlaybackBackend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(backends::x11::X11Keyboard::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        PlaybackBackend::Auto => Err(anyhow!("no backend resolved")),
    }
}

/// Wall-clock pacing that wakes early on stop.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Pacer for WallClock {
    fn wait(&mut self, ms: u64, control: &Control) {
        sleep_interruptible(control, ms);
    }
}

/// A real keyboard paced by the wall clock.
pub struct LiveOutput<K> {
    keyboard: K,
    clock: WallClock,
}

impl<K: KeyEmitter> LiveOutput<K> {
    pub fn new(keyboard: K) -> Self {
        Self {
            keyboard,
            clock: WallClock,
        }
    }
}

impl<K: KeyEmitter> KeyEmitter for LiveOutput<K> {
    fn emit_char(&mut self, c: char) {
        self.keyboard.emit_char(c);
    }

    fn emit_backspace(&mut self) {
        self.keyboard.emit_backspace();
    }
}

impl<K> Pacer for LiveOutput<K> {
    fn wait(&mut self, ms: u64, control: &Control) {
        self.clock.wait(ms, control);
    }
}

/// Replay a recorded transcript into the focused window.
pub fn play_transcript(
    transcript: &Transcript,
    countdown_secs: u64,
    trace: bool,
    backend: PlaybackBackend,
    control: &Control,
) -> Result<()> {
    resolve_backend(backend)?;

    let mut clock = WallClock;
    if !countdown(countdown_secs, &mut clock, &ConsoleReporter, control) {
        return Err(anyhow!("aborted"));
    }

    let mut keyboard = open_keyboard(backend)?;

    let trace_events = trace.then(|| transcript_trace(&transcript.events));
    let mut next_trace_event = 0usize;

    for (event_index, event) in transcript.events.iter().enumerate() {
        if !control.is_running() {
            break;
        }

        if let Some(events) = &trace_events {
            while next_trace_event < events.len()
                && events[next_trace_event].event_index == event_index
            {
                util::print_trace_line(&events[next_trace_event].line);
                next_trace_event += 1;
            }
        }

        match *event {
            KeyEvent::Wait { ms } => clock.wait(ms, control),
            KeyEvent::Char { c } => keyboard.emit_char(c),
            KeyEvent::Backspace => keyboard.emit_backspace(),
        }
    }

    if !control.is_running() {
        return Err(anyhow!("aborted"));
    }
    Ok(())
}
