//! evdev event codes
//!
//! Linux input event types, key codes and mouse button codes used by mousekeys.
//! Values are from <linux/input-event-codes.h>.

#![allow(dead_code)]

// ============================================================================
// Event Types
// ============================================================================

/// Synchronization event type
pub const EV_SYN: u16 = 0x00;

/// Key / button event type
pub const EV_KEY: u16 = 0x01;

/// Misc event type (scancodes accompany EV_KEY on most mice)
pub const EV_MSC: u16 = 0x04;

/// End of a state update
pub const SYN_REPORT: u16 = 0;

/// Highest key code the kernel accepts in UI_SET_KEYBIT
pub const KEY_MAX: u16 = 0x2ff;

// ============================================================================
// Key Values
// ============================================================================

pub const VALUE_RELEASE: i32 = 0;
pub const VALUE_PRESS: i32 = 1;
pub const VALUE_REPEAT: i32 = 2;

// ============================================================================
// Modifier Keys
// ============================================================================

pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_RIGHTCTRL: u16 = 97;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_LEFTALT: u16 = 56;
/// Right Alt key (AltGr on some keyboards)
pub const KEY_RIGHTALT: u16 = 100;
pub const KEY_LEFTMETA: u16 = 125;
pub const KEY_RIGHTMETA: u16 = 126;

// ============================================================================
// Navigation Keys
// ============================================================================

pub const KEY_HOME: u16 = 102;
pub const KEY_UP: u16 = 103;
pub const KEY_PAGEUP: u16 = 104;
pub const KEY_LEFT: u16 = 105;
pub const KEY_RIGHT: u16 = 106;
pub const KEY_END: u16 = 107;
pub const KEY_DOWN: u16 = 108;
pub const KEY_PAGEDOWN: u16 = 109;
pub const KEY_INSERT: u16 = 110;
pub const KEY_DELETE: u16 = 111;

// ============================================================================
// Mouse Buttons
// ============================================================================

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
/// Thumb button, usually "back"
pub const BTN_SIDE: u16 = 0x113;
/// Thumb button, usually "forward"
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;
pub const BTN_BACK: u16 = 0x116;
pub const BTN_TASK: u16 = 0x117;

/// Symbolic names accepted in the config file
///
/// Names are matched case-insensitively (see [`parse_code`]).
const NAMED_CODES: &[(&str, u16)] = &[
    ("KEY_ESC", 1),
    ("KEY_1", 2),
    ("KEY_2", 3),
    ("KEY_3", 4),
    ("KEY_4", 5),
    ("KEY_5", 6),
    ("KEY_6", 7),
    ("KEY_7", 8),
    ("KEY_8", 9),
    ("KEY_9", 10),
    ("KEY_0", 11),
    ("KEY_MINUS", 12),
    ("KEY_EQUAL", 13),
    ("KEY_BACKSPACE", 14),
    ("KEY_TAB", 15),
    ("KEY_Q", 16),
    ("KEY_W", 17),
    ("KEY_E", 18),
    ("KEY_R", 19),
    ("KEY_T", 20),
    ("KEY_Y", 21),
    ("KEY_U", 22),
    ("KEY_I", 23),
    ("KEY_O", 24),
    ("KEY_P", 25),
    ("KEY_LEFTBRACE", 26),
    ("KEY_RIGHTBRACE", 27),
    ("KEY_ENTER", 28),
    ("KEY_LEFTCTRL", KEY_LEFTCTRL),
    ("KEY_A", 30),
    ("KEY_S", 31),
    ("KEY_D", 32),
    ("KEY_F", 33),
    ("KEY_G", 34),
    ("KEY_H", 35),
    ("KEY_J", 36),
    ("KEY_K", 37),
    ("KEY_L", 38),
    ("KEY_SEMICOLON", 39),
    ("KEY_APOSTROPHE", 40),
    ("KEY_GRAVE", 41),
    ("KEY_LEFTSHIFT", KEY_LEFTSHIFT),
    ("KEY_BACKSLASH", 43),
    ("KEY_Z", 44),
    ("KEY_X", 45),
    ("KEY_C", 46),
    ("KEY_V", 47),
    ("KEY_B", 48),
    ("KEY_N", 49),
    ("KEY_M", 50),
    ("KEY_COMMA", 51),
    ("KEY_DOT", 52),
    ("KEY_SLASH", 53),
    ("KEY_RIGHTSHIFT", KEY_RIGHTSHIFT),
    ("KEY_LEFTALT", KEY_LEFTALT),
    ("KEY_SPACE", 57),
    ("KEY_CAPSLOCK", 58),
    ("KEY_F1", 59),
    ("KEY_F2", 60),
    ("KEY_F3", 61),
    ("KEY_F4", 62),
    ("KEY_F5", 63),
    ("KEY_F6", 64),
    ("KEY_F7", 65),
    ("KEY_F8", 66),
    ("KEY_F9", 67),
    ("KEY_F10", 68),
    ("KEY_F11", 87),
    ("KEY_F12", 88),
    ("KEY_RIGHTCTRL", KEY_RIGHTCTRL),
    ("KEY_RIGHTALT", KEY_RIGHTALT),
    ("KEY_HOME", KEY_HOME),
    ("KEY_UP", KEY_UP),
    ("KEY_PAGEUP", KEY_PAGEUP),
    ("KEY_LEFT", KEY_LEFT),
    ("KEY_RIGHT", KEY_RIGHT),
    ("KEY_END", KEY_END),
    ("KEY_DOWN", KEY_DOWN),
    ("KEY_PAGEDOWN", KEY_PAGEDOWN),
    ("KEY_INSERT", KEY_INSERT),
    ("KEY_DELETE", KEY_DELETE),
    ("KEY_MUTE", 113),
    ("KEY_VOLUMEDOWN", 114),
    ("KEY_VOLUMEUP", 115),
    ("KEY_LEFTMETA", KEY_LEFTMETA),
    ("KEY_RIGHTMETA", KEY_RIGHTMETA),
    ("KEY_BACK", 158),
    ("KEY_FORWARD", 159),
    ("KEY_NEXTSONG", 163),
    ("KEY_PLAYPAUSE", 164),
    ("KEY_PREVIOUSSONG", 165),
    ("KEY_REFRESH", 173),
    ("BTN_LEFT", BTN_LEFT),
    ("BTN_RIGHT", BTN_RIGHT),
    ("BTN_MIDDLE", BTN_MIDDLE),
    ("BTN_SIDE", BTN_SIDE),
    ("BTN_EXTRA", BTN_EXTRA),
    ("BTN_FORWARD", BTN_FORWARD),
    ("BTN_BACK", BTN_BACK),
    ("BTN_TASK", BTN_TASK),
];

/// Resolve a key/button name or numeric literal to an event code
///
/// Accepts `KEY_PAGEDOWN`, `key_pagedown`, `BTN_EXTRA`, decimal (`276`)
/// and hexadecimal (`0x114`) codes.
pub fn parse_code(name: &str) -> Option<u16> {
    let name = name.trim();
    if let Some(hex) = name.strip_prefix("0x").or_else(|| name.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).ok();
    }
    if let Ok(code) = name.parse::<u16>() {
        return Some(code);
    }
    NAMED_CODES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}

/// Symbolic name for an event code (for logging)
pub fn code_name(code: u16) -> Option<&'static str> {
    NAMED_CODES
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(n, _)| n)
}

/// Human-readable label: symbolic name if known, else the hex code
pub fn describe(code: u16) -> String {
    match code_name(code) {
        Some(name) => name.to_string(),
        None => format!("0x{:03x}", code),
    }
}

/// Chord label, e.g. `KEY_LEFTCTRL+KEY_PAGEUP`
pub fn describe_chord(keys: &[u16]) -> String {
    keys.iter()
        .map(|&k| describe(k))
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_code("KEY_PAGEDOWN"), Some(KEY_PAGEDOWN));
        assert_eq!(parse_code("btn_extra"), Some(BTN_EXTRA));
        assert_eq!(parse_code(" KEY_LEFTCTRL "), Some(KEY_LEFTCTRL));
        assert_eq!(parse_code("KEY_NOPE"), None);
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_code("0x113"), Some(BTN_SIDE));
        assert_eq!(parse_code("104"), Some(KEY_PAGEUP));
        assert_eq!(parse_code("0xzz"), None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(BTN_SIDE), "BTN_SIDE");
        assert_eq!(describe(0x2fe), "0x2fe");
        assert_eq!(
            describe_chord(&[KEY_LEFTCTRL, KEY_PAGEUP]),
            "KEY_LEFTCTRL+KEY_PAGEUP"
        );
    }
}
