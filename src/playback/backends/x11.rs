use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::warn;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use super::COMMON_MODIFIER_KEYCODES;
use crate::emit::KeyEmitter;
use crate::keyboard::{
    key_hold_ms, keystroke_for_output_char, KeyStroke, KEY_BACKSPACE, KEY_LEFTSHIFT,
};

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn keysyms_for_keycode(conn: &impl Connection, keycode: u8) -> Result<(u32, u32)> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    if reply.keysyms_per_keycode == 0 {
        return Err(anyhow!("X server returned 0 keysyms per keycode"));
    }

    let at = |i: usize| reply.keysyms.get(i).copied().unwrap_or(x11rb::NO_SYMBOL);
    Ok((at(0), at(1)))
}

/// Check a few representative keys against US QWERTY. Latin-1 keysyms equal
/// their character codes.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    for (plain, shifted) in [('a', 'A'), ('q', 'Q'), ('1', '!'), ('-', '_'), ('\'', '"'), ('[', '{')] {
        let stroke = keystroke_for_output_char(plain)
            .ok_or_else(|| anyhow!("no keystroke for {plain:?}"))?;
        let keycode = evdev_to_x11_keycode(stroke.keycode)?;
        let (got0, got1) = keysyms_for_keycode(conn, keycode)?;

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 keymap returned NoSymbol for keycode {keycode}; this backend assumes X11 keycodes are evdev+8 with a US layout"
            ));
        }
        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but keycode {keycode} maps to {got0:#x}/{got1:#x}. Try `setxkbmap us`."
            ));
        }
    }
    Ok(())
}

fn require_explicit_focus(conn: &impl Connection) -> Result<()> {
    let focus = conn
        .get_input_focus()
        .context("failed to request input focus")?
        .reply()
        .context("failed to read input focus reply")?;

    // X11 special focus value: the focused window follows the pointer.
    const POINTER_ROOT: xproto::Window = 1;
    if focus.focus == x11rb::NONE {
        return Err(anyhow!(
            "no X11 input focus detected; click into the target window before starting"
        ));
    }
    if focus.focus == POINTER_ROOT {
        return Err(anyhow!(
            "X11 input focus is set to PointerRoot; click into the target window to give it explicit focus"
        ));
    }
    Ok(())
}

/// Types into the focused X11 window through XTEST fake input.
pub struct X11Keyboard {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Keyboard {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;
        require_explicit_focus(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?;

        let keyboard = Self { conn, root };
        keyboard.release_modifiers();
        Ok(keyboard)
    }

    fn fake_key(&self, evdev_keycode: u32, pressed: bool) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        let type_ = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(type_, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("failed to send XTEST fake input")?;
        Ok(())
    }

    fn tap(&self, stroke: KeyStroke) -> Result<()> {
        let hold_ms = key_hold_ms(&mut rand::thread_rng());

        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, true)?;
        }
        self.fake_key(stroke.keycode, true)?;
        self.conn.flush().context("failed to flush X11 connection")?;
        std::thread::sleep(Duration::from_millis(hold_ms));
        self.fake_key(stroke.keycode, false)?;
        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, false)?;
        }
        self.conn.flush().context("failed to flush X11 connection")?;
        Ok(())
    }

    fn release_modifiers(&self) {
        // Releases are sent even if the key is not down.
        for keycode in COMMON_MODIFIER_KEYCODES {
            let _ = self.fake_key(keycode, false);
        }
        let _ = self.conn.flush();
    }
}

impl KeyEmitter for X11Keyboard {
    fn emit_char(&mut self, c: char) {
        let Some(stroke) = keystroke_for_output_char(c) else {
            warn!(?c, "no US keystroke for character; skipped");
            return;
        };
        if let Err(err) = self.tap(stroke) {
            warn!("X11 key emission failed: {err:#}");
        }
    }

    fn emit_backspace(&mut self) {
        let stroke = KeyStroke {
            keycode: KEY_BACKSPACE,
            shift: false,
        };
        if let Err(err) = self.tap(stroke) {
            warn!("X11 backspace emission failed: {err:#}");
        }
    }
}

impl Drop for X11Keyboard {
    fn drop(&mut self) {
        self.release_modifiers();
    }
}
