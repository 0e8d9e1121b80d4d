use subtle::ConstantTimeEq;

use super::hotp::{find_counter, parse_otp};
use crate::config::HMAC_KEY_LEN;
use crate::store::{
    CredentialKind, KeyRecord, Nvram, Registry, StoreError,
    registry::Entry,
};

/// The credential that accepted an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub index: u8,
    pub addr: u16,
    pub kind: CredentialKind,
    /// HOTP counter the input was valid for.
    pub counter: Option<u64>,
}

enum Outcome {
    Rejected,
    Accepted,
    Hotp(u64),
}

fn check_record(index: u8, key: &KeyRecord, input: &[u8], serial: &[u8]) -> Outcome {
    if !key.enabled() {
        tracing::debug!(index, "key disabled");
        return Outcome::Rejected;
    }

    let kind = key.kind();
    if !key.serial.is_empty() {
        if key.serial != serial {
            tracing::debug!(index, "serial mismatch");
            return Outcome::Rejected;
        }
        if kind == CredentialKind::SerialOnly {
            tracing::debug!(index, "serial OK");
            return Outcome::Accepted;
        }
    }

    match kind {
        CredentialKind::Static => {
            if key.key.len() != input.len() {
                return Outcome::Rejected;
            }
            if bool::from(key.key.as_slice().ct_eq(input)) {
                Outcome::Accepted
            } else {
                Outcome::Rejected
            }
        }
        CredentialKind::Hotp6 | CredentialKind::Hotp8 => {
            if key.key.len() != HMAC_KEY_LEN {
                tracing::debug!(index, len = key.key.len(), "HOTP key length mismatch, skipped");
                return Outcome::Rejected;
            }
            let Some(digits) = kind.otp_digits() else {
                return Outcome::Rejected;
            };
            let Some(otp) = parse_otp(input) else {
                return Outcome::Rejected;
            };
            match find_counter(&key.key, key.counter, key.counter_tolerance, digits, otp) {
                Some(counter) => {
                    tracing::debug!(index, counter, "counter OK");
                    Outcome::Hotp(counter)
                }
                None => Outcome::Rejected,
            }
        }
        CredentialKind::SerialOnly => Outcome::Rejected,
    }
}

/// Tries every key in registry order against `input` typed on a token whose serial is
/// `serial`. The first key that accepts wins; for HOTP its counter is advanced past the
/// matched value and rewritten in place before returning.
pub fn check_input<N: Nvram>(
    registry: &mut Registry<N>,
    input: &[u8],
    serial: &[u8],
) -> Result<Option<Match>, StoreError> {
    let mut found: Option<(Entry<KeyRecord>, Option<u64>)> = None;
    for entry in registry.keys()? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        match check_record(entry.index, &entry.record, input, serial) {
            Outcome::Rejected => {}
            Outcome::Accepted => {
                found = Some((entry, None));
                break;
            }
            Outcome::Hotp(counter) => {
                found = Some((entry, Some(counter)));
                break;
            }
        }
    }

    let Some((mut entry, counter)) = found else {
        tracing::debug!(input_len = input.len(), serial_len = serial.len(), "no key matched");
        return Ok(None);
    };
    if let Some(counter) = counter {
        entry.record.counter = counter + 1;
        registry.update_key(entry.addr, &entry.record)?;
    }
    tracing::info!(index = entry.index, kind = ?entry.record.kind(), "key matched");
    Ok(Some(Match {
        index: entry.index,
        addr: entry.addr,
        kind: entry.record.kind(),
        counter,
    }))
}
