use anyhow::{anyhow, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_MINUS: u32 = 12;
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_TAB: u32 = 15;
pub const KEY_Q: u32 = 16;
pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_A: u32 = 30;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_Z: u32 = 44;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

// US-QWERTY rows as (first keycode, unshifted, shifted). Keycodes within a row
// are consecutive.
const US_ROWS: [(u32, &str, &str); 4] = [
    (KEY_1 - 1, "`1234567890-=", "~!@#$%^&*()_+"),
    (KEY_Q, "qwertyuiop[]", "QWERTYUIOP{}"),
    (KEY_A, "asdfghjkl;'", "ASDFGHJKL:\""),
    (KEY_Z, "zxcvbnm,./", "ZXCVBNM<>?"),
];

// The grave key is not contiguous with the digit row.
const KEY_GRAVE: u32 = 41;
const KEY_BACKSLASH: u32 = 43;

/// Map a source character to the ASCII character actually typed for it.
///
/// Smart quotes are typed as their ASCII forms; most editors auto-substitute
/// them back.
pub fn typed_char_for_output_char(c: char) -> Option<char> {
    match c {
        '\n' | '\t' | ' ' => Some(c),
        '\r' => None,
        '’' | '‘' => Some('\''),
        '”' | '“' => Some('"'),
        c if c.is_ascii_graphic() => Some(c),
        _ => None,
    }
}

pub fn keystroke_for_output_char(c: char) -> Option<KeyStroke> {
    typed_char_for_output_char(c).and_then(char_to_keystroke)
}

pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    let plain = |keycode| Some(KeyStroke { keycode, shift: false });
    match c {
        ' ' => return plain(KEY_SPACE),
        '\n' => return plain(KEY_ENTER),
        '\t' => return plain(KEY_TAB),
        '`' => return plain(KEY_GRAVE),
        '~' => {
            return Some(KeyStroke {
                keycode: KEY_GRAVE,
                shift: true,
            })
        }
        '\\' => return plain(KEY_BACKSLASH),
        '|' => {
            return Some(KeyStroke {
                keycode: KEY_BACKSLASH,
                shift: true,
            })
        }
        _ => {}
    }

    for (first, unshifted, shifted) in US_ROWS {
        for (offset, (lo, hi)) in unshifted.chars().zip(shifted.chars()).enumerate() {
            // Row 0 starts at the grave key, which is handled above.
            if first == KEY_1 - 1 && offset == 0 {
                continue;
            }
            let keycode = first + offset as u32;
            if c == lo {
                return Some(KeyStroke {
                    keycode,
                    shift: false,
                });
            }
            if c == hi {
                return Some(KeyStroke {
                    keycode,
                    shift: true,
                });
            }
        }
    }

    None
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystroke_for_output_char(c).is_none())
}

fn byte_index_to_line_col(text: &str, byte_idx: usize) -> (usize, usize) {
    let before = &text[..byte_idx];
    let line = before.matches('\n').count() + 1;
    let col = before
        .rsplit('\n')
        .next()
        .map(|tail| tail.chars().count() + 1)
        .unwrap_or(1);
    (line, col)
}

/// Rewrite `text` as exactly the characters the keyboard will emit.
///
/// Carriage returns are dropped, smart quotes become ASCII and surrounding
/// whitespace is trimmed. Every character of the result has a US keystroke;
/// anything else is an error.
pub fn prepare_text(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for (byte_idx, c) in text.char_indices() {
        if c == '\r' {
            continue;
        }
        match typed_char_for_output_char(c).filter(|&t| char_to_keystroke(t).is_some()) {
            Some(typed) => out.push(typed),
            None => {
                let (line, col) = byte_index_to_line_col(text, byte_idx);
                return Err(anyhow!(
                    "unsupported character {c:?} (U+{:04X}) at line {line}, column {col}. Supported: ASCII, newline, tab, and smart quotes (’ ‘ ” “).",
                    c as u32
                ));
            }
        }
    }
    Ok(out.trim().to_string())
}

/// Characters that extend the current word. Anything else is a word boundary.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '’' || c == '-'
}

fn qwerty_neighbors(base: char) -> &'static [char] {
    match base {
        'a' => &['q', 'w', 's', 'z'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['s', 'e', 'r', 'f', 'c', 'x'],
        'e' => &['w', 's', 'd', 'r'],
        'f' => &['d', 'r', 't', 'g', 'v', 'c'],
        'g' => &['f', 't', 'y', 'h', 'b', 'v'],
        'h' => &['g', 'y', 'u', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['h', 'u', 'i', 'k', 'm', 'n'],
        'k' => &['j', 'i', 'o', 'l', 'm'],
        'l' => &['k', 'o', 'p'],
        'm' => &['n', 'j', 'k'],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l'],
        'q' => &['w', 'a'],
        'r' => &['e', 'd', 'f', 't'],
        's' => &['a', 'w', 'e', 'd', 'x', 'z'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'g', 'h', 'u'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'q', 'w'],
        '3' => &['2', '4', 'w', 'e'],
        '4' => &['3', '5', 'e', 'r'],
        '5' => &['4', '6', 'r', 't'],
        '6' => &['5', '7', 't', 'y'],
        '7' => &['6', '8', 'y', 'u'],
        '8' => &['7', '9', 'u', 'i'],
        '9' => &['8', '0', 'i', 'o'],
        '0' => &['9', 'o', 'p'],
        _ => &[],
    }
}

/// Pick a physically adjacent key for `c`, preserving case.
///
/// Returns `None` for characters outside the letter/digit table.
pub fn qwerty_adjacent_char(c: char, rng: &mut impl Rng) -> Option<char> {
    let upper = c.is_ascii_uppercase();
    let neighbors = qwerty_neighbors(c.to_ascii_lowercase());
    if neighbors.is_empty() {
        return None;
    }

    let chosen = neighbors[rng.gen_range(0..neighbors.len())];
    Some(if upper {
        chosen.to_ascii_uppercase()
    } else {
        chosen
    })
}

const KEY_HOLD_MEAN_MS: f64 = 30.0;
const KEY_HOLD_STDDEV_MS: f64 = 7.0;
const KEY_HOLD_MIN_MS: f64 = 18.0;
const KEY_HOLD_MAX_MS: f64 = 45.0;

/// How long a key stays down between press and release.
pub fn key_hold_ms(rng: &mut impl Rng) -> u64 {
    let held = match Normal::new(KEY_HOLD_MEAN_MS, KEY_HOLD_STDDEV_MS) {
        Ok(dist) => dist.sample(rng),
        Err(_) => KEY_HOLD_MEAN_MS,
    };
    held.clamp(KEY_HOLD_MIN_MS, KEY_HOLD_MAX_MS).round() as u64
}
