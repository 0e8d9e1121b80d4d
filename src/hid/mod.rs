use std::io;

pub mod descriptor;
pub mod device;
pub mod fields;
pub mod item;
pub mod keyboard;
pub mod report;
pub mod transport;

pub use descriptor::{KeyStroke, ReportDescParser, decode_report};
pub use device::DeviceInfo;
pub use keyboard::{LockState, oem_to_ascii};
pub use transport::{HidEvent, HidTransport, start_hid_transport};

#[derive(Debug, thiserror::Error)]
pub enum HidError {
    #[error("descriptor item incomplete, more bytes needed")]
    Incomplete,
    #[error("report too short: field ends at bit {needed_bits}, report has {available_bits}")]
    ReportTooShort { needed_bits: u64, available_bits: u64 },
    #[error("Failed to open HID device: {0}")]
    Open(io::Error),
    #[error("HID read error: {0}")]
    Read(String),
    #[error("sysfs probe failed: {0}")]
    Sysfs(String),
}
