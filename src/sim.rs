use crate::model::{KeyEvent, Transcript};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptStats {
    pub events: usize,
    pub chars: usize,
    pub backspaces: usize,
    pub total_wait_ms: u64,
}

pub fn stats(transcript: &Transcript) -> TranscriptStats {
    let mut out = TranscriptStats {
        events: transcript.events.len(),
        ..Default::default()
    };

    for e in &transcript.events {
        match e {
            KeyEvent::Wait { ms } => {
                out.total_wait_ms = out.total_wait_ms.saturating_add(*ms);
            }
            KeyEvent::Char { .. } => out.chars += 1,
            KeyEvent::Backspace => out.backspaces += 1,
        }
    }

    out
}

/// Replay characters and backspaces into the text an editor would show.
///
/// The cursor always sits at the end; backspace on an empty buffer is a no-op.
pub fn simulate_typed_text(events: &[KeyEvent]) -> String {
    let mut buf: Vec<char> = Vec::new();
    for e in events {
        match e {
            KeyEvent::Char { c } => buf.push(*c),
            KeyEvent::Backspace => {
                buf.pop();
            }
            KeyEvent::Wait { .. } => {}
        }
    }
    buf.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypingConfig;

    #[test]
    fn stats_count_each_kind() {
        let transcript = Transcript {
            version: 1,
            config: TypingConfig::default(),
            events: vec![
                KeyEvent::Char { c: 'a' },
                KeyEvent::Wait { ms: 120 },
                KeyEvent::Backspace,
                KeyEvent::Wait { ms: 80 },
                KeyEvent::Char { c: 'b' },
            ],
        };

        assert_eq!(
            stats(&transcript),
            TranscriptStats {
                events: 5,
                chars: 2,
                backspaces: 1,
                total_wait_ms: 200,
            }
        );
        assert_eq!(simulate_typed_text(&transcript.events), "b");
    }

    #[test]
    fn backspace_on_empty_buffer_is_ignored() {
        let events = [KeyEvent::Backspace, KeyEvent::Char { c: 'z' }];
        assert_eq!(simulate_typed_text(&events), "z");
    }
}
