pub mod manifest;
pub mod nvram;
pub mod record;
pub mod registry;

pub use manifest::Manifest;
pub use nvram::{FileNvram, MemoryNvram, Nvram};
pub use record::{CredentialKind, DeviceRecord, KeyRecord, KeyState};
pub use registry::{Entry, ProvisionSummary, Registry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("record at {addr:#06x} has invalid length {len}")]
    InvalidRecordLength { addr: usize, len: u16 },
    #[error("access of {len} bytes at {addr:#06x} is outside the image")]
    OutOfBounds { addr: usize, len: usize },
    #[error("cannot allocate record buffer")]
    Allocation,
    #[error("record at {addr:#06x} would change length from {stored} to {new}")]
    LengthChanged { addr: usize, stored: u16, new: u16 },
    #[error("registry full: layout needs {needed} bytes, image has {capacity}")]
    RegistryFull { needed: usize, capacity: usize },
    #[error("HOTP key #{index} has a {len}-byte key, expected 20")]
    KeyLengthMismatch { index: usize, len: usize },
    #[error("{field} is {len} bytes, longer than a record allows")]
    FieldTooLong { field: &'static str, len: usize },
    #[error("too many {0} for one sequence")]
    TooMany(&'static str),
    #[error("invalid registry capacity {0}")]
    InvalidCapacity(usize),
    #[error("manifest: {0}")]
    Manifest(String),
}
