use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    StoreError,
    record::{CredentialKind, DeviceRecord, KeyRecord, KeyState},
};
use crate::config::DEFAULT_COUNTER_TOLERANCE;
use crate::config::HMAC_KEY_LEN;
use crate::hid::device::{serial_bytes, serial_string};

/// Registry contents as written by an operator, loaded by `--provision`.
///
/// ```json
/// {
///   "devices": [{ "vid": 4176, "pid": 1031, "name": "YubiKey OTP" }],
///   "keys": [
///     { "kind": "hotp6", "key": "3132333435363738393031323334353637383930" },
///     { "kind": "static", "secret": "correct horse" },
///     { "kind": "serial-only", "serial": "0123456" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub devices: Vec<ManifestDevice>,
    #[serde(default)]
    pub keys: Vec<ManifestKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestDevice {
    pub vid: u16,
    pub pid: u16,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestKey {
    pub kind: CredentialKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// USB serial string the token must present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    /// Hex-encoded key bytes.
    #[serde(default, with = "hex")]
    pub key: Vec<u8>,
    /// Static secret as typed text, instead of `key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub counter: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_tolerance: Option<u8>,
}

fn enabled_by_default() -> bool {
    true
}

impl ManifestKey {
    fn to_record(&self, index: usize) -> Result<KeyRecord, StoreError> {
        let key = match (&self.secret, self.key.is_empty()) {
            (Some(_), false) => {
                return Err(StoreError::Manifest(format!(
                    "key #{index}: set either `key` or `secret`, not both"
                )));
            }
            (Some(secret), true) => secret.as_bytes().to_vec(),
            (None, _) => self.key.clone(),
        };
        let tolerance = if self.kind.is_hotp() {
            DEFAULT_COUNTER_TOLERANCE
        } else {
            0
        };
        Ok(KeyRecord {
            state: KeyState::new(self.kind, self.enabled),
            serial: self.serial.as_deref().map(serial_bytes).unwrap_or_default(),
            key,
            counter: self.counter,
            counter_tolerance: self.counter_tolerance.unwrap_or(tolerance),
        })
    }
}

impl ManifestKey {
    fn from_record(index: usize, record: &KeyRecord) -> Result<Self, StoreError> {
        let serial = match record.serial.as_slice() {
            [] => None,
            bytes => Some(serial_string(bytes).ok_or_else(|| {
                StoreError::Manifest(format!("key #{index}: serial is not UTF-16LE"))
            })?),
        };
        if record.kind().is_hotp() && record.key.len() != HMAC_KEY_LEN {
            tracing::warn!(
                index,
                len = record.key.len(),
                "HOTP key is not {HMAC_KEY_LEN} bytes, provisioning will skip it"
            );
        }
        Ok(Self {
            kind: record.kind(),
            enabled: record.enabled(),
            serial,
            key: record.key.clone(),
            secret: None,
            counter: record.counter,
            counter_tolerance: Some(record.counter_tolerance),
        })
    }
}

impl Manifest {
    /// Manifest that provisions `devices` and `keys` again, counters included.
    pub fn from_records(devices: &[DeviceRecord], keys: &[KeyRecord]) -> Result<Self, StoreError> {
        let devices = devices
            .iter()
            .map(|d| ManifestDevice {
                vid: d.vid,
                pid: d.pid,
                name: d.name.clone(),
            })
            .collect();
        let keys = keys
            .iter()
            .enumerate()
            .map(|(i, k)| ManifestKey::from_record(i, k))
            .collect::<Result<_, _>>()?;
        Ok(Self { devices, keys })
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Manifest(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Manifest(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_records(&self) -> Result<(Vec<DeviceRecord>, Vec<KeyRecord>), StoreError> {
        let devices = self
            .devices
            .iter()
            .map(|d| DeviceRecord {
                vid: d.vid,
                pid: d.pid,
                name: d.name.clone(),
            })
            .collect();
        let keys = self
            .keys
            .iter()
            .enumerate()
            .map(|(i, k)| k.to_record(i))
            .collect::<Result<_, _>>()?;
        Ok((devices, keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_to_records() {
        let manifest = Manifest::from_json(
            r#"{
                "devices": [{ "vid": 4176, "pid": 1031, "name": "YubiKey" }],
                "keys": [
                    { "kind": "hotp8", "key": "3132333435363738393031323334353637383930", "counter": 5 },
                    { "kind": "static", "secret": "pw", "enabled": false },
                    { "kind": "serial-only", "serial": "01" }
                ]
            }"#,
        )
        .unwrap();
        let (devices, keys) = manifest.to_records().unwrap();
        assert_eq!(devices[0].vid, 0x1050);
        assert_eq!(devices[0].name, "YubiKey");

        assert_eq!(keys[0].kind(), CredentialKind::Hotp8);
        assert_eq!(keys[0].key, b"12345678901234567890");
        assert_eq!(keys[0].counter, 5);
        assert_eq!(keys[0].counter_tolerance, DEFAULT_COUNTER_TOLERANCE);

        assert!(!keys[1].enabled());
        assert_eq!(keys[1].key, b"pw");
        assert_eq!(keys[1].counter_tolerance, 0);

        assert_eq!(keys[2].kind(), CredentialKind::SerialOnly);
        assert_eq!(keys[2].serial, vec![b'0', 0, b'1', 0]);
        assert!(keys[2].key.is_empty());
    }

    #[test]
    fn test_manifest_rejects_bad_input() {
        assert!(matches!(
            Manifest::from_json(r#"{ "keys": [{ "kind": "reserved" }] }"#),
            Err(StoreError::Manifest(_))
        ));
        assert!(matches!(
            Manifest::from_json(r#"{ "keys": [{ "kind": "static", "key": "zz" }] }"#),
            Err(StoreError::Manifest(_))
        ));
        let both = Manifest::from_json(r#"{ "keys": [{ "kind": "static", "key": "00", "secret": "x" }] }"#)
            .unwrap();
        assert!(matches!(both.to_records(), Err(StoreError::Manifest(_))));
    }

    #[test]
    fn test_records_survive_manifest_round_trip() {
        let devices = vec![DeviceRecord {
            vid: 0x1050,
            pid: 0x0407,
            name: "YubiKey".into(),
        }];
        let keys = vec![
            KeyRecord {
                state: KeyState::new(CredentialKind::Hotp6, true),
                serial: Vec::new(),
                key: b"12345678901234567890".to_vec(),
                counter: 17,
                counter_tolerance: 3,
            },
            KeyRecord {
                state: KeyState::new(CredentialKind::Static, false),
                serial: serial_bytes("0042"),
                key: b"pw".to_vec(),
                counter: 0,
                counter_tolerance: 0,
            },
        ];
        let json = Manifest::from_records(&devices, &keys).unwrap().to_json().unwrap();
        assert!(!json.contains("secret"));
        let (devices_again, keys_again) = Manifest::from_json(&json).unwrap().to_records().unwrap();
        assert_eq!(devices_again, devices);
        assert_eq!(keys_again, keys);
    }

    #[test]
    fn test_export_rejects_non_utf16_serial() {
        let key = KeyRecord {
            state: KeyState::new(CredentialKind::SerialOnly, true),
            serial: vec![0x31],
            key: Vec::new(),
            counter: 0,
            counter_tolerance: 0,
        };
        assert!(matches!(
            Manifest::from_records(&[], &[key]),
            Err(StoreError::Manifest(_))
        ));
    }
}
