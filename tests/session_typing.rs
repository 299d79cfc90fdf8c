use std::sync::Arc;

use pretty_assertions::assert_eq;
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::SeedableRng;

use autoscribe::config::{SharedConfig, TypingConfig};
use autoscribe::driver::Control;
use autoscribe::emit::{KeyEmitter, Pacer, Recorder, StatusLog};
use autoscribe::keyboard::{keystroke_for_output_char, prepare_text};
use autoscribe::model::{KeyEvent, Phase, Severity};
use autoscribe::session::{Outcome, Session, PAUSE_POLL_MS};
use autoscribe::sim::simulate_typed_text;
use autoscribe::trace::transcript_trace;

fn shared(min_wpm: u32, max_wpm: u32, typo_min: u32, typo_max: u32) -> Arc<SharedConfig> {
    Arc::new(SharedConfig::new(&TypingConfig {
        min_wpm,
        max_wpm,
        typo_min_words: typo_min,
        typo_max_words: typo_max,
        ..TypingConfig::default()
    }))
}

fn chars(text: &str) -> Vec<KeyEvent> {
    text.chars().map(|c| KeyEvent::Char { c }).collect()
}

#[test]
fn scheduled_mistake_is_noticed_after_the_space() {
    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    let mut session = Session::new("cat sat", 0.15, config, StepRng::new(0, 0));
    session.mistakes_mut().schedule_now();

    let mut out = Recorder::new();
    let outcome = session.run(&mut out, &StatusLog::new(), &Control::started());
    assert_eq!(outcome, Outcome::Completed);

    let mut expected = chars("xat ");
    expected.extend(vec![KeyEvent::Backspace; 4]);
    expected.extend(chars("cat sat"));
    assert_eq!(out.keystrokes(), expected);

    // The interval re-armed on the corrected word, which counts as one word.
    assert_eq!(session.mistakes().words_since_mistake(), 2);
    assert_eq!(session.mistakes().next_mistake_threshold(), 10);
}

#[test]
fn every_word_after_the_first_is_corrected_with_unit_interval() {
    let text = "one two three four";
    for seed in 0..20 {
        let mut session = Session::new(text, 0.15, shared(60, 80, 1, 1), StdRng::seed_from_u64(seed));
        let mut out = Recorder::new();
        session.run(&mut out, &StatusLog::new(), &Control::started());

        let events = out.into_events();
        assert_eq!(simulate_typed_text(&events), text, "seed {seed}");

        let replaced: Vec<String> = transcript_trace(&events)
            .into_iter()
            .map(|e| e.line)
            .filter(|line| line.starts_with("Replace"))
            .collect();
        assert_eq!(replaced.len(), 3, "seed {seed}: {replaced:?}");
        assert!(replaced[2].ends_with("with \"four\"..."), "{replaced:?}");
    }
}

#[test]
fn typed_text_matches_source_across_seeds() {
    let text = "Hello, world! The quick brown fox - it's 42 years old.\nNext line; done?";
    for seed in 0..50 {
        let mut session = Session::new(text, 0.15, shared(40, 120, 1, 3), StdRng::seed_from_u64(seed));
        let mut out = Recorder::new();
        let outcome = session.run(&mut out, &StatusLog::new(), &Control::started());

        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(simulate_typed_text(&out.events), text, "seed {seed}");
        assert!(out.events.contains(&KeyEvent::Backspace), "seed {seed}");
    }
}

#[test]
fn mistake_on_last_word_is_fixed_without_a_boundary() {
    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    let mut session = Session::new("go", 0.15, config, StepRng::new(0, 0));
    session.mistakes_mut().schedule_now();

    let mut out = Recorder::new();
    session.run(&mut out, &StatusLog::new(), &Control::started());

    let mut expected = chars("fo");
    expected.extend(vec![KeyEvent::Backspace; 2]);
    expected.extend(chars("go"));
    assert_eq!(out.keystrokes(), expected);
    assert!(!session.mistakes().in_word());
}

#[test]
fn uppercase_letters_wait_for_shift() {
    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    let mut session = Session::new("Hi", 0.15, config, StepRng::new(0, 0));

    let mut out = Recorder::new();
    session.run(&mut out, &StatusLog::new(), &Control::started());

    assert_eq!(
        out.events[..2],
        [KeyEvent::Wait { ms: 50 }, KeyEvent::Char { c: 'H' }]
    );
}

#[test]
fn thinking_pauses_are_reported() {
    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    // Zero stream: every pause threshold is one word and every pause 0.5s.
    let mut session = Session::new("a b c", 0.15, config, StepRng::new(0, 0));
    let log = StatusLog::new();
    session.run(&mut Recorder::new(), &log, &Control::started());

    let pauses = log
        .entries()
        .into_iter()
        .filter(|(text, _)| text == "Thinking pause (0.5s)")
        .count();
    assert_eq!(pauses, 2);
    assert_eq!(log.entries()[0], ("Typing...".to_string(), Severity::Info));
}

#[test]
fn rate_follows_bounds_changed_mid_session() {
    struct Retune {
        rec: Recorder,
        config: Arc<SharedConfig>,
        typed: usize,
    }

    impl KeyEmitter for Retune {
        fn emit_char(&mut self, c: char) {
            self.typed += 1;
            if self.typed == 20 {
                self.config.set_wpm(150, 160);
            }
            self.rec.emit_char(c);
        }

        fn emit_backspace(&mut self) {
            self.rec.emit_backspace();
        }
    }

    impl Pacer for Retune {
        fn wait(&mut self, ms: u64, control: &Control) {
            self.rec.wait(ms, control);
        }
    }

    let config = shared(30, 40, 5, 10);
    let text = "lorem ipsum dolor sit amet ".repeat(10);
    let mut session = Session::new(text.trim(), 0.15, config.clone(), StdRng::seed_from_u64(8));
    let mut out = Retune {
        rec: Recorder::new(),
        config,
        typed: 0,
    };
    session.run(&mut out, &StatusLog::new(), &Control::started());

    let rate = session.speed().current_rate();
    assert!((150.0..=160.0).contains(&rate), "rate {rate}");
}

#[test]
fn stop_halts_before_the_next_keystroke() {
    struct StopAfterFirst {
        rec: Recorder,
        control: Arc<Control>,
    }

    impl KeyEmitter for StopAfterFirst {
        fn emit_char(&mut self, c: char) {
            self.rec.emit_char(c);
            self.control.stop();
        }

        fn emit_backspace(&mut self) {
            self.rec.emit_backspace();
        }
    }

    impl Pacer for StopAfterFirst {
        fn wait(&mut self, ms: u64, control: &Control) {
            self.rec.wait(ms, control);
        }
    }

    let control = Arc::new(Control::started());
    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    let mut session = Session::new("cat sat", 0.15, config, StepRng::new(0, 0));
    session.mistakes_mut().schedule_now();

    let mut out = StopAfterFirst {
        rec: Recorder::new(),
        control: control.clone(),
    };
    let outcome = session.run(&mut out, &StatusLog::new(), &control);

    assert_eq!(outcome, Outcome::Stopped);
    assert_eq!(out.rec.keystrokes(), chars("x"));
    assert!(!session.mistakes().in_word());
    assert_eq!(control.phase(), Phase::Stopped);
}

#[test]
fn paused_session_emits_nothing_until_resumed() {
    struct ResumeAfterPolls {
        rec: Recorder,
        polls: usize,
    }

    impl KeyEmitter for ResumeAfterPolls {
        fn emit_char(&mut self, c: char) {
            self.rec.emit_char(c);
        }

        fn emit_backspace(&mut self) {
            self.rec.emit_backspace();
        }
    }

    impl Pacer for ResumeAfterPolls {
        fn wait(&mut self, ms: u64, control: &Control) {
            if control.is_paused() {
                self.polls += 1;
                if self.polls == 3 {
                    control.toggle_pause();
                }
            }
            self.rec.wait(ms, control);
        }
    }

    let control = Control::started();
    assert_eq!(control.toggle_pause(), Some(true));

    let config = Arc::new(SharedConfig::new(&TypingConfig::default()));
    let mut session = Session::new("ok", 0.15, config, StdRng::seed_from_u64(2));
    let mut out = ResumeAfterPolls {
        rec: Recorder::new(),
        polls: 0,
    };
    let outcome = session.run(&mut out, &StatusLog::new(), &control);

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(
        out.rec.events[..3],
        [KeyEvent::Wait { ms: PAUSE_POLL_MS }; 3]
    );
    assert_eq!(simulate_typed_text(&out.rec.events), "ok");
}

/// Forwards only what a US keyboard can type, like the live X11 emitter.
#[derive(Default)]
struct UsKeyboardOnly {
    rec: Recorder,
}

impl KeyEmitter for UsKeyboardOnly {
    fn emit_char(&mut self, c: char) {
        if keystroke_for_output_char(c).is_some() {
            self.rec.emit_char(c);
        }
    }

    fn emit_backspace(&mut self) {
        self.rec.emit_backspace();
    }
}

impl Pacer for UsKeyboardOnly {
    fn wait(&mut self, ms: u64, control: &Control) {
        self.rec.wait(ms, control);
    }
}

#[test]
fn crlf_text_corrects_without_eating_the_previous_space() {
    let text = prepare_text("one two\r\nthree").unwrap();
    assert_eq!(text, "one two\nthree");

    for seed in 0..20 {
        let mut session = Session::new(&text, 0.15, shared(60, 80, 1, 1), StdRng::seed_from_u64(seed));
        let mut out = UsKeyboardOnly::default();
        session.run(&mut out, &StatusLog::new(), &Control::started());

        assert_eq!(simulate_typed_text(&out.rec.events), "one two\nthree", "seed {seed}");
    }
}

#[test]
fn smart_quotes_are_typed_and_corrected_as_ascii() {
    let text = prepare_text("it’s “done” now").unwrap();
    let mut session = Session::new(&text, 0.15, shared(60, 80, 1, 1), StdRng::seed_from_u64(1));
    let mut out = UsKeyboardOnly::default();
    session.run(&mut out, &StatusLog::new(), &Control::started());

    assert_eq!(simulate_typed_text(&out.rec.events), "it's \"done\" now");
}

#[test]
fn untypable_letters_are_rejected_before_typing() {
    let err = prepare_text("one café two").unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("'é'"), "{msg}");
    assert!(msg.contains("line 1, column 8"), "{msg}");
}
