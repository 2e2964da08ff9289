use std::collections::HashMap;
use std::sync::LazyLock;

/// Backend-neutral native key codes. Window backends translate their own
/// key identities into this space before normalization.
pub mod native {
    pub const UNDEFINED: u16 = 0x00;
    pub const BACK_SPACE: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const ENTER: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const ALT: u16 = 0x12;
    pub const PAUSE: u16 = 0x13;
    pub const CAPS_LOCK: u16 = 0x14;
    pub const ESCAPE: u16 = 0x1B;
    pub const SPACE: u16 = 0x20;
    pub const PAGE_UP: u16 = 0x21;
    pub const PAGE_DOWN: u16 = 0x22;
    pub const END: u16 = 0x23;
    pub const HOME: u16 = 0x24;
    pub const LEFT: u16 = 0x25;
    pub const UP: u16 = 0x26;
    pub const RIGHT: u16 = 0x27;
    pub const DOWN: u16 = 0x28;
    pub const F1: u16 = 0x70;
    pub const F12: u16 = 0x7B;
    pub const NUM_LOCK: u16 = 0x90;
    pub const SCROLL_LOCK: u16 = 0x91;
    pub const DELETE: u16 = 0x93;
    pub const PRINT_SCREEN: u16 = 0x9A;
    pub const INSERT: u16 = 0x9B;
    pub const WINDOWS: u16 = 0x20C;
    pub const CONTEXT_MENU: u16 = 0x20D;
}

/// Key codes as seen by sketches.
pub mod code {
    pub const BACKSPACE: i32 = 8;
    pub const TAB: i32 = 9;
    pub const ENTER: i32 = 10;
    pub const RETURN: i32 = 13;
    pub const ESC: i32 = 27;
    pub const DELETE: i32 = 127;
    pub const SHIFT: i32 = 16;
    pub const CONTROL: i32 = 17;
    pub const ALT: i32 = 18;
    pub const LEFT: i32 = 37;
    pub const UP: i32 = 38;
    pub const RIGHT: i32 = 39;
    pub const DOWN: i32 = 40;
    pub const META: i32 = 157;
}

static CODED_KEYS: LazyLock<HashMap<u16, i32>> = LazyLock::new(|| {
    HashMap::from([
        (native::UP, code::UP),
        (native::DOWN, code::DOWN),
        (native::LEFT, code::LEFT),
        (native::RIGHT, code::RIGHT),
        (native::ALT, code::ALT),
        (native::CONTROL, code::CONTROL),
        (native::SHIFT, code::SHIFT),
        (native::WINDOWS, code::META),
    ])
});

// Keys whose native character payload differs between backends.
static HACKY_KEYS: LazyLock<HashMap<u16, (i32, char)>> = LazyLock::new(|| {
    HashMap::from([
        (native::BACK_SPACE, (code::BACKSPACE, '\u{8}')),
        (native::TAB, (code::TAB, '\t')),
        (native::ENTER, (code::ENTER, '\n')),
        (native::ESCAPE, (code::ESC, '\u{1b}')),
        (native::DELETE, (code::DELETE, '\u{7f}')),
    ])
});

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyClass {
    /// No printable character; carries the logical key code.
    Coded(i32),
    /// Logical code and substituted character.
    Hacky(i32, char),
    Ordinary,
}

pub fn classify(native_code: u16, printable: bool) -> KeyClass {
    if let Some(code) = CODED_KEYS.get(&native_code) {
        return KeyClass::Coded(*code);
    }

    if let Some((code, key)) = HACKY_KEYS.get(&native_code) {
        return KeyClass::Hacky(*code, *key);
    }

    if !printable {
        return KeyClass::Coded(native_code as i32);
    }

    KeyClass::Ordinary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_keys_are_coded_regardless_of_payload() {
        for (native_code, expected) in [
            (native::UP, code::UP),
            (native::DOWN, code::DOWN),
            (native::LEFT, code::LEFT),
            (native::RIGHT, code::RIGHT),
            (native::ALT, code::ALT),
            (native::CONTROL, code::CONTROL),
            (native::SHIFT, code::SHIFT),
            (native::WINDOWS, code::META),
        ] {
            assert_eq!(classify(native_code, true), KeyClass::Coded(expected));
            assert_eq!(classify(native_code, false), KeyClass::Coded(expected));
        }
    }

    #[test]
    fn hacky_keys_substitute_characters() {
        assert_eq!(
            classify(native::ENTER, true),
            KeyClass::Hacky(code::ENTER, '\n')
        );
        assert_eq!(
            classify(native::BACK_SPACE, false),
            KeyClass::Hacky(code::BACKSPACE, '\u{8}')
        );
        assert_eq!(
            classify(native::DELETE, false),
            KeyClass::Hacky(code::DELETE, '\u{7f}')
        );
        assert_eq!(
            classify(native::TAB, true),
            KeyClass::Hacky(code::TAB, '\t')
        );
    }

    #[test]
    fn unknown_non_printable_passes_code_through() {
        assert_eq!(classify(native::F1, false), KeyClass::Coded(0x70));
        assert_eq!(classify(0x4242, false), KeyClass::Coded(0x4242));
    }

    #[test]
    fn printable_keys_are_ordinary() {
        assert_eq!(classify(b'A' as u16, true), KeyClass::Ordinary);
        assert_eq!(classify(native::SPACE, true), KeyClass::Ordinary);
    }
}
