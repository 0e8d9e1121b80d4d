use serde::{Deserialize, Serialize};

use super::StoreError;

/// Size of the big-endian total-length prefix in front of every record.
pub const LEN_PREFIX: usize = 2;

const DEVICE_FIXED_LEN: usize = LEN_PREFIX + 2 + 2 + 1;
const KEY_FIXED_LEN: usize = LEN_PREFIX + 1 + 1 + 1 + 8 + 1;

const STATE_ENABLED: u8 = 0x01;
const TYPE_MASK: u8 = 0x06;
const TYPE_SHIFT: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    Static,
    Hotp6,
    Hotp8,
    SerialOnly,
}

impl CredentialKind {
    pub fn otp_digits(self) -> Option<u32> {
        match self {
            Self::Hotp6 => Some(6),
            Self::Hotp8 => Some(8),
            _ => None,
        }
    }

    pub fn is_hotp(self) -> bool {
        self.otp_digits().is_some()
    }
}

/// Key state byte: bit 0 enabled, bits 1-2 credential type. Bits 3-7 are carried but not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState(pub u8);

impl KeyState {
    pub fn new(kind: CredentialKind, enabled: bool) -> Self {
        let type_bits = match kind {
            CredentialKind::Static => 0,
            CredentialKind::Hotp6 => 1,
            CredentialKind::Hotp8 => 2,
            CredentialKind::SerialOnly => 3,
        };
        Self(type_bits << TYPE_SHIFT | u8::from(enabled))
    }

    pub fn enabled(self) -> bool {
        self.0 & STATE_ENABLED != 0
    }

    pub fn kind(self) -> CredentialKind {
        match (self.0 & TYPE_MASK) >> TYPE_SHIFT {
            0 => CredentialKind::Static,
            1 => CredentialKind::Hotp6,
            2 => CredentialKind::Hotp8,
            _ => CredentialKind::SerialOnly,
        }
    }
}

/// A supported token, identified by USB vendor and product ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub vid: u16,
    pub pid: u16,
    pub name: String,
}

/// One authorized credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub state: KeyState,
    /// Required token serial (UTF-16LE string descriptor payload); empty means any.
    pub serial: Vec<u8>,
    /// Static secret or HMAC key; empty for serial-only credentials.
    pub key: Vec<u8>,
    /// Next acceptable HOTP counter.
    pub counter: u64,
    pub counter_tolerance: u8,
}

impl KeyRecord {
    pub fn kind(&self) -> CredentialKind {
        self.state.kind()
    }

    pub fn enabled(&self) -> bool {
        self.state.enabled()
    }
}

/// Length-framed binary codec shared by the two registry sequences.
pub trait Record: Sized {
    const NAME: &'static str;
    /// Smallest valid total length, prefix included.
    const MIN_LEN: usize;

    /// Total framed length, prefix included.
    fn encoded_len(&self) -> Result<u16, StoreError>;

    /// Appends the framed record to `out`.
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StoreError>;

    /// Decodes a record body (the bytes after the length prefix). `None` when the
    /// inner field lengths disagree with the body length.
    fn decode(body: &[u8]) -> Option<Self>;
}

fn field_len(field: &'static str, len: usize) -> Result<u8, StoreError> {
    u8::try_from(len).map_err(|_| StoreError::FieldTooLong { field, len })
}

fn frame_len(len: usize) -> Result<u16, StoreError> {
    u16::try_from(len).map_err(|_| StoreError::FieldTooLong {
        field: "record",
        len,
    })
}

struct Cursor<'a>(&'a [u8]);

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.0.len() < n {
            return None;
        }
        let (head, rest) = self.0.split_at(n);
        self.0 = rest;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16_be(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn u64_le(&mut self) -> Option<u64> {
        let bytes: [u8; 8] = self.take(8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    fn finished(&self) -> bool {
        self.0.is_empty()
    }
}

impl Record for DeviceRecord {
    const NAME: &'static str = "device";
    const MIN_LEN: usize = DEVICE_FIXED_LEN;

    fn encoded_len(&self) -> Result<u16, StoreError> {
        field_len("device name", self.name.len())?;
        frame_len(DEVICE_FIXED_LEN + self.name.len())
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StoreError> {
        let len = self.encoded_len()?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&self.vid.to_be_bytes());
        out.extend_from_slice(&self.pid.to_be_bytes());
        out.push(field_len("device name", self.name.len())?);
        out.extend_from_slice(self.name.as_bytes());
        Ok(())
    }

    fn decode(body: &[u8]) -> Option<Self> {
        let mut cur = Cursor(body);
        let vid = cur.u16_be()?;
        let pid = cur.u16_be()?;
        let name_len = cur.u8()?;
        let name = String::from_utf8_lossy(cur.take(usize::from(name_len))?).into_owned();
        cur.finished().then_some(Self { vid, pid, name })
    }
}

impl Record for KeyRecord {
    const NAME: &'static str = "key";
    const MIN_LEN: usize = KEY_FIXED_LEN;

    fn encoded_len(&self) -> Result<u16, StoreError> {
        field_len("serial", self.serial.len())?;
        field_len("key", self.key.len())?;
        frame_len(KEY_FIXED_LEN + self.serial.len() + self.key.len())
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), StoreError> {
        let len = self.encoded_len()?;
        out.extend_from_slice(&len.to_be_bytes());
        out.push(self.state.0);
        out.push(field_len("serial", self.serial.len())?);
        out.extend_from_slice(&self.serial);
        out.push(field_len("key", self.key.len())?);
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&self.counter.to_le_bytes());
        out.push(self.counter_tolerance);
        Ok(())
    }

    fn decode(body: &[u8]) -> Option<Self> {
        let mut cur = Cursor(body);
        let state = KeyState(cur.u8()?);
        let serial_len = cur.u8()?;
        let serial = cur.take(usize::from(serial_len))?.to_vec();
        let key_len = cur.u8()?;
        let key = cur.take(usize::from(key_len))?.to_vec();
        let counter = cur.u64_le()?;
        let counter_tolerance = cur.u8()?;
        cur.finished().then_some(Self {
            state,
            serial,
            key,
            counter,
            counter_tolerance,
        })
    }
}
