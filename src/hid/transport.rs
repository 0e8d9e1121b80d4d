use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{HidError, device::{DeviceInfo, probe_device}, report::MAX_REPORT_SIZE};
use crate::config::DEVICE_POLL_MILLIS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HidEvent {
    Connected(DeviceInfo),
    /// One input report as read from hidraw; numbered reports keep their ID byte.
    Report(Vec<u8>),
    Disconnected,
}

pub struct HidTransport {
    pub events_rx: mpsc::Receiver<HidEvent>,
    pub task: JoinHandle<Result<(), HidError>>,
}

/// Watches a hidraw node: waits for it to appear, probes it through sysfs, forwards
/// every input report, and re-arms after the token is unplugged.
///
/// The task ends with `Ok(())` once the receiving side is dropped.
pub fn start_hid_transport(device: PathBuf, sysfs_root: PathBuf) -> HidTransport {
    let (events_tx, events_rx) = mpsc::channel::<HidEvent>(64);

    let task = tokio::task::spawn_blocking(move || -> Result<(), HidError> {
        let name = device
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| HidError::Sysfs(format!("bad hidraw path {}", device.display())))?
            .to_owned();
        let poll = Duration::from_millis(DEVICE_POLL_MILLIS);

        loop {
            let mut file = match File::open(&device) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if events_tx.is_closed() {
                        return Ok(());
                    }
                    std::thread::sleep(poll);
                    continue;
                }
                Err(e) => return Err(HidError::Open(e)),
            };

            let info = match probe_device(&sysfs_root, &name) {
                Ok(info) => info,
                Err(e) => {
                    tracing::warn!("cannot probe {}: {e}", device.display());
                    drop(file);
                    std::thread::sleep(poll);
                    continue;
                }
            };
            tracing::info!(
                vid = format!("{:04x}", info.vid),
                pid = format!("{:04x}", info.pid),
                "token connected on {}",
                device.display()
            );
            if events_tx.blocking_send(HidEvent::Connected(info)).is_err() {
                return Ok(());
            }

            let mut buf = [0u8; MAX_REPORT_SIZE];
            loop {
                match file.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        tracing::trace!(len = n, "HID rx");
                        if events_tx.blocking_send(HidEvent::Report(buf[..n].to_vec())).is_err() {
                            return Ok(());
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("HID read ended: {}", HidError::Read(e.to_string()));
                        break;
                    }
                }
            }

            tracing::info!("token disconnected from {}", device.display());
            if events_tx.blocking_send(HidEvent::Disconnected).is_err() {
                return Ok(());
            }
            std::thread::sleep(poll);
        }
    });

    HidTransport { events_rx, task }
}
