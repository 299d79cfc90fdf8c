use crate::model::KeyEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub event_index: usize,
    pub line: String,
}

#[derive(Debug, Default, Clone)]
struct Correction {
    start: usize,
    deleted: Vec<char>,
    inserted: String,
}

impl Correction {
    fn deleted_string(&self) -> String {
        self.deleted.iter().rev().collect()
    }

    fn is_repaired(&self) -> bool {
        !self.inserted.is_empty() && self.inserted.chars().count() >= self.deleted.len()
    }
}

#[derive(Debug, Default)]
struct TracePlanner {
    buf: Vec<char>,
    run_start: Option<usize>,
    run: String,
    correction: Option<Correction>,
    events: Vec<TraceEvent>,
}

impl TracePlanner {
    fn observe(&mut self, index: usize, event: &KeyEvent) {
        match *event {
            KeyEvent::Wait { .. } => {}
            KeyEvent::Backspace => {
                if self.correction.as_ref().is_some_and(|c| !c.inserted.is_empty()) {
                    self.finish_correction();
                }
                self.flush_run();
                let correction = self.correction.get_or_insert_with(|| Correction {
                    start: index,
                    ..Default::default()
                });
                if let Some(c) = self.buf.pop() {
                    correction.deleted.push(c);
                }
            }
            KeyEvent::Char { c } => {
                self.buf.push(c);
                if let Some(correction) = &mut self.correction {
                    correction.inserted.push(c);
                    if correction.is_repaired() {
                        self.finish_correction();
                    }
                    return;
                }
                if self.run.is_empty() {
                    self.run_start = Some(index);
                }
                self.run.push(c);
            }
        }
    }

    fn flush_run(&mut self) {
        if let Some(start) = self.run_start.take() {
            if !self.run.is_empty() {
                self.events.push(TraceEvent {
                    event_index: start,
                    line: format!("Typing \"{}\"...", escape_for_log(&self.run)),
                });
            }
        }
        self.run.clear();
    }

    fn finish_correction(&mut self) {
        let Some(correction) = self.correction.take() else {
            return;
        };
        let line = if correction.inserted.is_empty() {
            format!("Delete \"{}\"...", escape_for_log(&correction.deleted_string()))
        } else {
            format!(
                "Replace \"{}\" with \"{}\"...",
                escape_for_log(&correction.deleted_string()),
                escape_for_log(&correction.inserted)
            )
        };
        self.events.push(TraceEvent {
            event_index: correction.start,
            line,
        });
    }
}

/// Describe a transcript as typing runs and replacements, keyed by the index
/// of the event each one starts at, so playback can print a line just before
/// the keystrokes it describes.
pub fn transcript_trace(events: &[KeyEvent]) -> Vec<TraceEvent> {
    let mut planner = TracePlanner::default();
    for (index, event) in events.iter().enumerate() {
        planner.observe(index, event);
    }
    planner.flush_run();
    planner.finish_correction();

    planner.events.sort_by_key(|e| e.event_index);
    planner.events
}

fn escape_for_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
