use crate::config::{END_OF_INPUT, MAX_INPUT_LEN};

/// Collects typed characters until Enter, or until the buffer is one short of full.
#[derive(Debug, Clone)]
pub struct KeystrokeAccumulator {
    buf: [u8; MAX_INPUT_LEN],
    len: usize,
}

impl Default for KeystrokeAccumulator {
    fn default() -> Self {
        Self {
            buf: [0; MAX_INPUT_LEN],
            len: 0,
        }
    }
}

impl KeystrokeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Adds one translated character. Returns the completed input when `ch` is
    /// [`END_OF_INPUT`] or the buffer has reached its limit, and starts over.
    pub fn push(&mut self, ch: u8) -> Option<Vec<u8>> {
        if ch != END_OF_INPUT {
            self.buf[self.len] = ch;
            self.len += 1;
        }
        if ch == END_OF_INPUT || self.len >= MAX_INPUT_LEN - 1 {
            let input = self.buf[..self.len].to_vec();
            self.len = 0;
            return Some(input);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_on_terminator() {
        let mut acc = KeystrokeAccumulator::new();
        for &ch in b"abc" {
            assert_eq!(acc.push(ch), None);
        }
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.push(END_OF_INPUT), Some(b"abc".to_vec()));
        assert!(acc.is_empty());
    }

    #[test]
    fn test_bare_terminator_delivers_empty_input() {
        let mut acc = KeystrokeAccumulator::new();
        assert_eq!(acc.push(END_OF_INPUT), Some(Vec::new()));
    }

    #[test]
    fn test_forced_delivery_at_capacity() {
        let mut acc = KeystrokeAccumulator::new();
        for _ in 0..MAX_INPUT_LEN - 2 {
            assert_eq!(acc.push(b'x'), None);
        }
        let input = acc.push(b'y').unwrap();
        assert_eq!(input.len(), MAX_INPUT_LEN - 1);
        assert_eq!(input.last(), Some(&b'y'));
        assert!(acc.is_empty());
        // The next attempt starts clean.
        assert_eq!(acc.push(b'z'), None);
        assert_eq!(acc.push(END_OF_INPUT), Some(b"z".to_vec()));
    }
}
