use crate::config::END_OF_INPUT;

pub const KEY_A: u8 = 0x04;
pub const KEY_Z: u8 = 0x1D;
pub const KEY_ONE: u8 = 0x1E;
pub const KEY_ZERO: u8 = 0x27;
pub const KEY_ENTER: u8 = 0x28;
pub const KEY_SPACE: u8 = 0x2C;
pub const KEY_MINUS: u8 = 0x2D;
pub const KEY_SLASH: u8 = 0x38;
pub const KEY_CAPS_LOCK: u8 = 0x39;
pub const KEY_NUM_LOCK: u8 = 0x53;
pub const KEY_PAD_SLASH: u8 = 0x54;
pub const KEY_PAD_ENTER: u8 = 0x58;
pub const KEY_PAD_ONE: u8 = 0x59;
pub const KEY_PAD_NINE: u8 = 0x61;
pub const KEY_PAD_ZERO: u8 = 0x62;
pub const KEY_PAD_PERIOD: u8 = 0x63;

/// Left and right Shift bits of the modifier byte.
pub const SHIFT_MASK: u8 = 0x22;

const NUM_KEYS: [u8; 10] = *b"!@#$%^&*()";
const SYM_KEYS_UPPER: [u8; 12] = *b"_+{}|~:\"~<>?";
const SYM_KEYS_LOWER: [u8; 12] = *b"-=[]\\ ;'`,./";
const PAD_KEYS: [u8; 5] = [b'/', b'*', b'-', b'+', END_OF_INPUT];

/// Caps Lock / Num Lock state applied while decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    pub caps_lock: bool,
    pub num_lock: bool,
}

impl LockState {
    /// Flips the matching lock when `scan_code` is a lock key; returns whether it was one.
    pub fn toggle(&mut self, scan_code: u8) -> bool {
        match scan_code {
            KEY_CAPS_LOCK => self.caps_lock = !self.caps_lock,
            KEY_NUM_LOCK => self.num_lock = !self.num_lock,
            _ => return false,
        }
        true
    }
}

/// Translates a boot-keyboard usage code into the ASCII byte it types (US layout).
///
/// Enter and keypad Enter yield [`END_OF_INPUT`]. Codes that type nothing yield `None`.
pub fn oem_to_ascii(modifier: u8, scan_code: u8, locks: LockState) -> Option<u8> {
    let shift = modifier & SHIFT_MASK != 0;
    match scan_code {
        KEY_A..=KEY_Z => {
            let base = if locks.caps_lock ^ shift { b'A' } else { b'a' };
            Some(scan_code - KEY_A + base)
        }
        KEY_ONE..=KEY_ZERO if shift => Some(NUM_KEYS[usize::from(scan_code - KEY_ONE)]),
        KEY_ZERO => Some(b'0'),
        KEY_ONE..=KEY_ZERO => Some(scan_code - KEY_ONE + b'1'),
        KEY_PAD_ONE..=KEY_PAD_NINE if locks.num_lock => Some(scan_code - KEY_PAD_ONE + b'1'),
        KEY_MINUS..=KEY_SLASH => {
            let table = if shift { &SYM_KEYS_UPPER } else { &SYM_KEYS_LOWER };
            Some(table[usize::from(scan_code - KEY_MINUS)])
        }
        KEY_PAD_SLASH..=KEY_PAD_ENTER => Some(PAD_KEYS[usize::from(scan_code - KEY_PAD_SLASH)]),
        KEY_SPACE => Some(b' '),
        KEY_ENTER => Some(END_OF_INPUT),
        KEY_PAD_ZERO if locks.num_lock => Some(b'0'),
        KEY_PAD_PERIOD if locks.num_lock => Some(b'.'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: LockState = LockState {
        caps_lock: false,
        num_lock: false,
    };
    const CAPS: LockState = LockState {
        caps_lock: true,
        num_lock: false,
    };
    const NUM: LockState = LockState {
        caps_lock: false,
        num_lock: true,
    };

    #[test]
    fn test_letters_follow_shift_xor_caps() {
        assert_eq!(oem_to_ascii(0, 0x04, PLAIN), Some(b'a'));
        assert_eq!(oem_to_ascii(0x22, 0x04, PLAIN), Some(b'A'));
        assert_eq!(oem_to_ascii(0x02, 0x1D, PLAIN), Some(b'Z'));
        assert_eq!(oem_to_ascii(0x20, 0x1D, PLAIN), Some(b'Z'));
        assert_eq!(oem_to_ascii(0, 0x04, CAPS), Some(b'A'));
        assert_eq!(oem_to_ascii(0x02, 0x04, CAPS), Some(b'a'));
        // Ctrl alone does not shift.
        assert_eq!(oem_to_ascii(0x01, 0x04, PLAIN), Some(b'a'));
    }

    #[test]
    fn test_top_row_digits_and_symbols() {
        assert_eq!(oem_to_ascii(0, 0x1E, PLAIN), Some(b'1'));
        assert_eq!(oem_to_ascii(0, 0x26, PLAIN), Some(b'9'));
        assert_eq!(oem_to_ascii(0, 0x27, PLAIN), Some(b'0'));
        assert_eq!(oem_to_ascii(0x02, 0x1E, PLAIN), Some(b'!'));
        assert_eq!(oem_to_ascii(0x02, 0x27, PLAIN), Some(b')'));
        // Caps Lock does not affect digits.
        assert_eq!(oem_to_ascii(0, 0x1F, CAPS), Some(b'2'));
    }

    #[test]
    fn test_keypad_digits_need_num_lock() {
        assert_eq!(oem_to_ascii(0, 0x59, PLAIN), None);
        assert_eq!(oem_to_ascii(0, 0x59, NUM), Some(b'1'));
        assert_eq!(oem_to_ascii(0, 0x61, NUM), Some(b'9'));
        assert_eq!(oem_to_ascii(0, KEY_PAD_ZERO, PLAIN), None);
        assert_eq!(oem_to_ascii(0, KEY_PAD_ZERO, NUM), Some(b'0'));
        assert_eq!(oem_to_ascii(0, KEY_PAD_PERIOD, NUM), Some(b'.'));
        assert_eq!(oem_to_ascii(0, KEY_PAD_PERIOD, PLAIN), None);
    }

    #[test]
    fn test_punctuation_tables() {
        assert_eq!(oem_to_ascii(0, 0x2D, PLAIN), Some(b'-'));
        assert_eq!(oem_to_ascii(0x02, 0x2D, PLAIN), Some(b'_'));
        assert_eq!(oem_to_ascii(0, 0x31, PLAIN), Some(b'\\'));
        assert_eq!(oem_to_ascii(0x20, 0x34, PLAIN), Some(b'"'));
        assert_eq!(oem_to_ascii(0, 0x38, PLAIN), Some(b'/'));
        assert_eq!(oem_to_ascii(0x02, 0x38, PLAIN), Some(b'?'));
    }

    #[test]
    fn test_keypad_operators_and_enter() {
        assert_eq!(oem_to_ascii(0, 0x54, PLAIN), Some(b'/'));
        assert_eq!(oem_to_ascii(0, 0x57, PLAIN), Some(b'+'));
        assert_eq!(oem_to_ascii(0, 0x58, PLAIN), Some(END_OF_INPUT));
    }

    #[test]
    fn test_space_enter_and_unmapped() {
        assert_eq!(oem_to_ascii(0, KEY_SPACE, PLAIN), Some(b' '));
        assert_eq!(oem_to_ascii(0, KEY_ENTER, PLAIN), Some(END_OF_INPUT));
        assert_eq!(oem_to_ascii(0x22, KEY_ENTER, CAPS), Some(END_OF_INPUT));
        assert_eq!(oem_to_ascii(0, 0x3A, PLAIN), None); // F1
        assert_eq!(oem_to_ascii(0, KEY_CAPS_LOCK, PLAIN), None);
        assert_eq!(oem_to_ascii(0, 0x00, PLAIN), None);
    }

    #[test]
    fn test_lock_toggle() {
        let mut locks = LockState::default();
        assert!(locks.toggle(KEY_CAPS_LOCK));
        assert!(locks.caps_lock);
        assert!(locks.toggle(KEY_NUM_LOCK));
        assert!(locks.num_lock);
        assert!(locks.toggle(KEY_CAPS_LOCK));
        assert!(!locks.caps_lock);
        assert!(!locks.toggle(0x04));
    }
}
