pub mod hotp;
pub mod matcher;

pub use hotp::{hotp, parse_otp};
pub use matcher::{Match, check_input};

use crate::actuator::Signal;
use crate::store::{Nvram, Registry, StoreError};

/// Result of one authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid(Match),
    Invalid,
    /// Nothing matched but nothing was typed either, as on a serial probe.
    AwaitingInput,
}

impl Verdict {
    pub fn signal(&self) -> Signal {
        match self {
            Self::Valid(_) => Signal::CredentialValid,
            Self::Invalid => Signal::CredentialInvalid,
            Self::AwaitingInput => Signal::AwaitingInput,
        }
    }
}

pub fn verify<N: Nvram>(
    registry: &mut Registry<N>,
    input: &[u8],
    serial: &[u8],
) -> Result<Verdict, StoreError> {
    Ok(match check_input(registry, input, serial)? {
        Some(m) => Verdict::Valid(m),
        None if input.is_empty() => Verdict::AwaitingInput,
        None => Verdict::Invalid,
    })
}
