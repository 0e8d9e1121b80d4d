use keylatch::store::{CredentialKind, KeyRecord, KeyState, MemoryNvram, Registry};
use keylatch::verify::{check_input, hotp};

const SECRET: &[u8] = b"12345678901234567890";

// RFC 4226 Appendix D
const HOTP6: [u32; 10] = [
    755224, 287082, 359152, 969429, 338314, 254676, 287922, 162583, 399871, 520489,
];
const HOTP8: [u32; 10] = [
    84755224, 94287082, 37359152, 26969429, 40338314, 68254676, 18287922, 82162583, 73399871,
    45520489,
];

#[test]
fn test_rfc4226_six_digits() {
    for (counter, expected) in HOTP6.iter().enumerate() {
        assert_eq!(hotp(SECRET, counter as u64, 6), Some(*expected), "counter {counter}");
    }
}

#[test]
fn test_rfc4226_eight_digits() {
    for (counter, expected) in HOTP8.iter().enumerate() {
        assert_eq!(hotp(SECRET, counter as u64, 8), Some(*expected), "counter {counter}");
    }
}

#[test]
fn test_token_sequence_through_registry() {
    let key = KeyRecord {
        state: KeyState::new(CredentialKind::Hotp8, true),
        serial: Vec::new(),
        key: SECRET.to_vec(),
        counter: 0,
        counter_tolerance: 3,
    };
    let mut registry = Registry::new(MemoryNvram::new(128));
    registry.provision(&[], &[key]).unwrap();

    // Token presses 0, 1, then skips 2 and 3 (still inside the window), then 4.
    for counter in [0usize, 1, 4] {
        let typed = format!("{:08}", HOTP8[counter]);
        let m = check_input(&mut registry, typed.as_bytes(), &[])
            .unwrap()
            .unwrap_or_else(|| panic!("counter {counter} rejected"));
        assert_eq!(m.counter, Some(counter as u64));
    }
    let stored = registry.keys().unwrap().next().unwrap().unwrap().record.counter;
    assert_eq!(stored, 5);

    // 9 is beyond [5, 8).
    let typed = format!("{:08}", HOTP8[9]);
    assert!(check_input(&mut registry, typed.as_bytes(), &[]).unwrap().is_none());
}
