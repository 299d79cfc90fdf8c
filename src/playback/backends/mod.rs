#[cfg(feature = "x11")]
pub mod x11;

// Modifiers released when a keyboard connects and when it is dropped, so an
// aborted run never leaves one held. A physically held modifier may appear
// released to the target app until it is tapped again.
#[cfg_attr(not(feature = "x11"), allow(dead_code))]
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
    crate::keyboard::KEY_RIGHTALT,
];

#[cfg(test)]
mod tests {
    use super::COMMON_MODIFIER_KEYCODES;
    use crate::keyboard::{char_to_keystroke, KEY_LEFTSHIFT};

    #[test]
    fn modifiers_never_overlap_typable_keys() {
        assert!(COMMON_MODIFIER_KEYCODES.contains(&KEY_LEFTSHIFT));
        for b in 32u8..=126u8 {
            let stroke = char_to_keystroke(b as char).expect("printable ASCII is typable");
            assert!(!COMMON_MODIFIER_KEYCODES.contains(&stroke.keycode));
        }
    }
}
