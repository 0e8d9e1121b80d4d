use std::path::Path;

use super::HidError;

/// Identity and layout of the token behind a hidraw node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vid: u16,
    pub pid: u16,
    /// USB serial string as UTF-16LE, the form the registry stores. Empty when absent.
    pub serial: Vec<u8>,
    pub report_descriptor: Vec<u8>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Uevent {
    vid: u16,
    pid: u16,
    uniq: String,
}

// HID_ID=<bus>:<vendor>:<product>, each hex and zero padded to 4/8/8 digits.
fn parse_uevent(text: &str) -> Result<Uevent, HidError> {
    let mut id = None;
    let mut uniq = String::new();
    for line in text.lines() {
        if let Some(value) = line.strip_prefix("HID_ID=") {
            id = Some(value.to_owned());
        } else if let Some(value) = line.strip_prefix("HID_UNIQ=") {
            uniq = value.to_owned();
        }
    }
    let id = id.ok_or_else(|| HidError::Sysfs("uevent has no HID_ID".into()))?;
    let mut parts = id.split(':').skip(1);
    let mut hex = |what: &str| -> Result<u16, HidError> {
        let part = parts
            .next()
            .ok_or_else(|| HidError::Sysfs(format!("HID_ID {id:?} has no {what}")))?;
        u32::from_str_radix(part, 16)
            .ok()
            .and_then(|v| u16::try_from(v).ok())
            .ok_or_else(|| HidError::Sysfs(format!("bad {what} in HID_ID {id:?}")))
    };
    let vid = hex("vendor")?;
    let pid = hex("product")?;
    Ok(Uevent { vid, pid, uniq })
}

/// UTF-16LE bytes of a USB serial string.
pub fn serial_bytes(serial: &str) -> Vec<u8> {
    serial.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Serial string back from its UTF-16LE bytes. `None` if the bytes are not valid UTF-16LE.
pub fn serial_string(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Reads vendor/product, serial and report descriptor of `<sysfs_root>/<name>/device`.
pub fn probe_device(sysfs_root: &Path, name: &str) -> Result<DeviceInfo, HidError> {
    let dir = sysfs_root.join(name).join("device");
    let read_err = |file: &str, e: std::io::Error| {
        HidError::Sysfs(format!("{}: {e}", dir.join(file).display()))
    };

    let uevent = std::fs::read_to_string(dir.join("uevent")).map_err(|e| read_err("uevent", e))?;
    let uevent = parse_uevent(&uevent)?;
    let report_descriptor =
        std::fs::read(dir.join("report_descriptor")).map_err(|e| read_err("report_descriptor", e))?;

    tracing::debug!(
        vid = format!("{:04x}", uevent.vid),
        pid = format!("{:04x}", uevent.pid),
        serial_len = uevent.uniq.len(),
        descriptor_len = report_descriptor.len(),
        "probed {name}"
    );

    Ok(DeviceInfo {
        vid: uevent.vid,
        pid: uevent.pid,
        serial: serial_bytes(&uevent.uniq),
        report_descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uevent_fields() {
        let text = "DRIVER=hid-generic\nHID_ID=0003:00001050:00000407\nHID_NAME=Yubico YubiKey OTP+FIDO+CCID\nHID_UNIQ=0123456\n";
        let ev = parse_uevent(text).unwrap();
        assert_eq!(ev.vid, 0x1050);
        assert_eq!(ev.pid, 0x0407);
        assert_eq!(ev.uniq, "0123456");
    }

    #[test]
    fn test_parse_uevent_without_uniq() {
        let ev = parse_uevent("HID_ID=0003:000004D9:0000A0F8\n").unwrap();
        assert_eq!((ev.vid, ev.pid), (0x04D9, 0xA0F8));
        assert!(ev.uniq.is_empty());
    }

    #[test]
    fn test_parse_uevent_rejects_missing_or_bad_id() {
        assert!(matches!(parse_uevent("HID_NAME=x\n"), Err(HidError::Sysfs(_))));
        assert!(matches!(parse_uevent("HID_ID=0003:zz:0001\n"), Err(HidError::Sysfs(_))));
        assert!(matches!(parse_uevent("HID_ID=0003:00010000:0001\n"), Err(HidError::Sysfs(_))));
        assert!(matches!(parse_uevent("HID_ID=0003\n"), Err(HidError::Sysfs(_))));
    }

    #[test]
    fn test_serial_bytes_are_utf16le() {
        assert_eq!(serial_bytes("AB1"), vec![b'A', 0, b'B', 0, b'1', 0]);
        assert!(serial_bytes("").is_empty());
        assert_eq!(serial_string(&serial_bytes("0123456")).as_deref(), Some("0123456"));
        assert_eq!(serial_string(&[b'A']), None);
        assert_eq!(serial_string(&[0x00, 0xD8]), None);
    }
}
