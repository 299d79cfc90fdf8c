use std::time::Duration;

use crate::driver::Control;

const SLEEP_STEP_MS: u64 = 50;

/// Sleep for `ms`, waking every 50 ms to return early once `control` stops.
pub fn sleep_interruptible(control: &Control, ms: u64) {
    let mut remaining = ms;
    while remaining > 0 {
        if !control.is_running() {
            return;
        }
        let step = remaining.min(SLEEP_STEP_MS);
        std::thread::sleep(Duration::from_millis(step));
        remaining -= step;
    }
}

pub(crate) fn print_trace_line(line: &str) {
    const RESET: &str = "\x1b[0m";
    const TYPING: &str = "\x1b[34m";
    const REPLACE: &str = "\x1b[33m";

    if let Some(rest) = line.strip_prefix("Typing") {
        eprintln!("{TYPING}Typing{RESET}{rest}");
    } else if let Some(rest) = line.strip_prefix("Replace") {
        eprintln!("{REPLACE}Replace{RESET}{rest}");
    } else {
        eprintln!("{line}");
    }
}
