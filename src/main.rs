use std::fs;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use autoscribe::config::{SharedConfig, TypingConfig};
use autoscribe::driver::{Control, Typist};
use autoscribe::emit::{ConsoleReporter, Recorder, StatusLog};
use autoscribe::keyboard::prepare_text;
use autoscribe::model::{Phase, Transcript};
use autoscribe::playback::{open_keyboard, play_transcript, LiveOutput};
use autoscribe::session::Session;
use autoscribe::sim;
use autoscribe::trace::transcript_trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlaybackBackendArg {
    Auto,
    X11,
}

impl PlaybackBackendArg {
    fn to_library(self) -> autoscribe::playback::PlaybackBackend {
        match self {
            PlaybackBackendArg::Auto => autoscribe::playback::PlaybackBackend::Auto,
            PlaybackBackendArg::X11 => autoscribe::playback::PlaybackBackend::X11,
        }
    }
}

#[derive(Debug, Args, Clone)]
struct TypingArgs {
    /// JSON settings file; flags below override it.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[arg(long)]
    min_wpm: Option<u32>,

    #[arg(long)]
    max_wpm: Option<u32>,

    /// Fewest words between injected mistakes.
    #[arg(long)]
    typo_min_words: Option<u32>,

    /// Most words between injected mistakes.
    #[arg(long)]
    typo_max_words: Option<u32>,

    /// Per-keystroke chance of a speed change (0.0-1.0).
    #[arg(long)]
    speed_change_chance: Option<f64>,

    /// Optional RNG seed (for debugging)
    #[arg(long)]
    seed: Option<u64>,
}

impl TypingArgs {
    fn build_config(&self, countdown: Option<u64>) -> Result<TypingConfig> {
        let mut cfg = match &self.config {
            Some(path) => TypingConfig::load(path)?,
            None => TypingConfig::default(),
        };

        if let Some(v) = self.min_wpm {
            cfg.min_wpm = v;
        }
        if let Some(v) = self.max_wpm {
            cfg.max_wpm = v;
        }
        if let Some(v) = self.typo_min_words {
            cfg.typo_min_words = v;
        }
        if let Some(v) = self.typo_max_words {
            cfg.typo_max_words = v;
        }
        if let Some(v) = self.speed_change_chance {
            cfg.speed_change_chance = v;
        }
        if let Some(v) = countdown {
            cfg.countdown_secs = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Debug, Parser)]
#[command(name = "autoscribe")]
#[command(about = "Types text with human-like cadence, pauses and self-corrected typos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dry-run a session and write its transcript (JSON)
    Plan {
        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output transcript file (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Print the typing/correction trace to stderr
        #[arg(long)]
        trace: bool,

        #[command(flatten)]
        typing: TypingArgs,
    },

    /// Replay a saved transcript into the focused window
    Play {
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Transcript file (JSON)
        #[arg(long, value_name = "PATH")]
        transcript: PathBuf,

        /// Countdown seconds before playback starts
        #[arg(long, default_value_t = 3)]
        countdown: u64,

        /// Disable console typing trace output
        #[arg(long)]
        no_trace: bool,
    },

    /// Type text live into the focused window
    ///
    /// While typing, enter `p` to pause/resume and `s` to stop (when the text
    /// is not read from stdin). Ctrl+C always stops.
    Run {
        #[arg(long, value_enum, default_value_t = PlaybackBackendArg::Auto)]
        backend: PlaybackBackendArg,

        /// Input text file, or '-' for stdin
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Countdown seconds before typing starts
        #[arg(long)]
        countdown: Option<u64>,

        #[command(flatten)]
        typing: TypingArgs,
    },
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == std::ffi::OsStr::new("-")
}

fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }

    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn print_stats(label: &str, transcript: &Transcript) {
    let stats = sim::stats(transcript);
    eprintln!(
        "{label}: {} events, {} chars, {} backspaces, ~{:.1} min",
        stats.events,
        stats.chars,
        stats.backspaces,
        (stats.total_wait_ms as f64) / 1000.0 / 60.0
    );
}

fn dry_run(text: &str, cfg: TypingConfig, seed: Option<u64>) -> Result<Transcript> {
    let text = prepare_text(text)?;
    if text.is_empty() {
        return Err(anyhow!("input text is empty"));
    }

    let shared = Arc::new(SharedConfig::new(&cfg));
    let mut session = Session::new(&text, cfg.speed_change_chance, shared, rng_from_seed(seed));
    let mut recorder = Recorder::new();
    session.run(&mut recorder, &StatusLog::new(), &Control::started());

    Ok(Transcript {
        version: 1,
        config: cfg,
        events: recorder.into_events(),
    })
}

fn spawn_stdin_controls<O>(typist: Arc<Typist<O>>)
where
    O: autoscribe::emit::KeyEmitter + autoscribe::emit::Pacer + Send + 'static,
{
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match line.trim() {
                "p" => typist.pause_toggle(),
                "s" | "q" => typist.stop(),
                "" => {}
                other => eprintln!("Unknown command {other:?} (p = pause/resume, s = stop)"),
            }
        }
    });
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan {
            input,
            output,
            trace,
            typing,
        } => {
            let text = read_input(&input)?;
            let cfg = typing.build_config(Some(0))?;

            let transcript = dry_run(&text, cfg, typing.seed)?;
            print_stats("Planned", &transcript);

            if trace {
                for event in transcript_trace(&transcript.events) {
                    eprintln!("{}", event.line);
                }
            }

            let json =
                serde_json::to_string_pretty(&transcript).context("failed to serialize transcript")?;
            if let Some(out) = output {
                write_output(&out, &json)?;
            } else {
                println!("{json}");
            }
        }
        Command::Play {
            backend,
            transcript,
            countdown,
            no_trace,
        } => {
            let json = fs::read_to_string(&transcript)
                .with_context(|| format!("failed to read {}", transcript.display()))?;
            let transcript: Transcript =
                serde_json::from_str(&json).context("failed to parse transcript JSON")?;
            print_stats("Playing", &transcript);

            let control = Arc::new(Control::started());
            {
                let control = control.clone();
                ctrlc::set_handler(move || {
                    control.stop();
                })
                .context("failed to install Ctrl+C handler")?;
            }

            play_transcript(
                &transcript,
                countdown,
                !no_trace,
                backend.to_library(),
                &control,
            )?;
        }
        Command::Run {
            backend,
            input,
            countdown,
            typing,
        } => {
            let text = read_input(&input)?;
            let cfg = typing.build_config(countdown)?;
            let text = prepare_text(&text)?;
            if text.is_empty() {
                return Err(anyhow!("input text is empty"));
            }

            let keyboard = open_keyboard(backend.to_library())?;
            let mut typist = Typist::new(cfg, LiveOutput::new(keyboard), Arc::new(ConsoleReporter));
            if let Some(seed) = typing.seed {
                typist = typist.with_seed(seed);
            }
            let typist = Arc::new(typist);

            {
                let typist = typist.clone();
                ctrlc::set_handler(move || typist.stop())
                    .context("failed to install Ctrl+C handler")?;
            }
            if !is_stdin(&input) {
                spawn_stdin_controls(typist.clone());
            }

            eprintln!("Focus the target window before the countdown ends.");
            if !typist.start(&text) {
                return Err(anyhow!("nothing to type"));
            }

            while !matches!(typist.phase(), Phase::Completed | Phase::Stopped) {
                std::thread::sleep(Duration::from_millis(100));
            }
            typist.wait();

            if typist.phase() == Phase::Stopped {
                return Err(anyhow!("aborted"));
            }
        }
    }

    Ok(())
}
