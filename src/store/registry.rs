use std::marker::PhantomData;

use super::{
    StoreError,
    nvram::Nvram,
    record::{DeviceRecord, KeyRecord, LEN_PREFIX, Record},
};
use crate::config::{DEVICE_START_PTR, HMAC_KEY_LEN, KEY_START_PTR};

/// First byte after the two start pointers.
pub const FIRST_SEQUENCE_ADDR: usize = 4;
/// Pointers plus two empty sequences.
pub const MIN_CAPACITY: usize = FIRST_SEQUENCE_ADDR + 2;

const ERASED_POINTER: u16 = 0xFFFF;
const MAX_RECORDS: usize = u8::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Devices,
    Keys,
}

impl Sequence {
    fn pointer_addr(self) -> usize {
        match self {
            Self::Devices => DEVICE_START_PTR,
            Self::Keys => KEY_START_PTR,
        }
    }
}

/// A record read during iteration, with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<R> {
    pub index: u8,
    pub addr: u16,
    pub len: u16,
    pub record: R,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub devices: usize,
    pub keys: usize,
    pub skipped: usize,
    pub bytes_used: usize,
}

/// Device and key sequences laid out in a non-volatile image.
///
/// ```text
/// 0x0000  device start pointer (u16 BE)
/// 0x0002  key start pointer    (u16 BE)
/// start:  count (u8), then `count` records, each led by its u16 BE total length
/// ```
#[derive(Debug)]
pub struct Registry<N> {
    nvram: N,
}

impl<N: Nvram> Registry<N> {
    pub fn new(nvram: N) -> Self {
        Self { nvram }
    }

    pub fn nvram(&self) -> &N {
        &self.nvram
    }

    pub fn into_inner(self) -> N {
        self.nvram
    }

    fn read_u16(&self, addr: usize) -> Result<u16, StoreError> {
        let mut buf = [0u8; 2];
        self.nvram.read_at(addr, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_start_pointer(&self, seq: Sequence) -> Result<u16, StoreError> {
        self.read_u16(seq.pointer_addr())
    }

    pub fn write_start_pointer(&mut self, seq: Sequence, addr: u16) -> Result<(), StoreError> {
        self.nvram.write_at(seq.pointer_addr(), &addr.to_be_bytes())
    }

    /// Start of a sequence, `None` while the image is unprovisioned.
    fn sequence_start(&self, seq: Sequence) -> Result<Option<usize>, StoreError> {
        let ptr = self.read_start_pointer(seq)?;
        Ok((ptr != ERASED_POINTER).then_some(usize::from(ptr)))
    }

    fn read_count(&self, seq: Sequence) -> Result<u8, StoreError> {
        let Some(start) = self.sequence_start(seq)? else {
            return Ok(0);
        };
        let mut count = [0u8; 1];
        self.nvram.read_at(start, &mut count)?;
        Ok(count[0])
    }

    pub fn is_provisioned(&self) -> Result<bool, StoreError> {
        Ok(self.sequence_start(Sequence::Devices)?.is_some()
            && self.sequence_start(Sequence::Keys)?.is_some())
    }

    pub fn read_device_count(&self) -> Result<u8, StoreError> {
        self.read_count(Sequence::Devices)
    }

    pub fn read_key_count(&self) -> Result<u8, StoreError> {
        self.read_count(Sequence::Keys)
    }

    /// Total length stored at `addr`, checked against the image bounds.
    fn read_record_len<R: Record>(&self, addr: usize) -> Result<u16, StoreError> {
        let len = self.read_u16(addr)?;
        let fits = addr + usize::from(len) <= self.nvram.capacity();
        if usize::from(len) < R::MIN_LEN || !fits {
            return Err(StoreError::InvalidRecordLength { addr, len });
        }
        Ok(len)
    }

    fn read_record<R: Record>(&self, addr: usize) -> Result<(R, u16), StoreError> {
        let len = self.read_record_len::<R>(addr)?;
        let body_len = usize::from(len) - LEN_PREFIX;
        let mut body = Vec::new();
        body.try_reserve_exact(body_len)
            .map_err(|_| StoreError::Allocation)?;
        body.resize(body_len, 0);
        self.nvram.read_at(addr + LEN_PREFIX, &mut body)?;
        let record = R::decode(&body).ok_or(StoreError::InvalidRecordLength { addr, len })?;
        Ok((record, len))
    }

    fn write_record<R: Record>(
        &mut self,
        addr: usize,
        record: &R,
        calc_only: bool,
    ) -> Result<u16, StoreError> {
        let len = record.encoded_len()?;
        if calc_only {
            return Ok(len);
        }
        let mut out = Vec::with_capacity(usize::from(len));
        record.encode(&mut out)?;
        self.nvram.write_at(addr, &out)?;
        Ok(len)
    }

    /// Reads the device record at `addr`, returning it with its total length.
    pub fn read_device(&self, addr: u16) -> Result<(DeviceRecord, u16), StoreError> {
        self.read_record(usize::from(addr))
    }

    pub fn read_key(&self, addr: u16) -> Result<(KeyRecord, u16), StoreError> {
        self.read_record(usize::from(addr))
    }

    /// Writes `record` at `addr` and returns its total length. With `calc_only`
    /// nothing is written.
    pub fn write_device(
        &mut self,
        addr: u16,
        record: &DeviceRecord,
        calc_only: bool,
    ) -> Result<u16, StoreError> {
        self.write_record(usize::from(addr), record, calc_only)
    }

    pub fn write_key(&mut self, addr: u16, record: &KeyRecord, calc_only: bool) -> Result<u16, StoreError> {
        self.write_record(usize::from(addr), record, calc_only)
    }

    /// Rewrites the key at `addr` in place. The new encoding must keep the stored length.
    pub fn update_key(&mut self, addr: u16, record: &KeyRecord) -> Result<(), StoreError> {
        let stored = self.read_record_len::<KeyRecord>(usize::from(addr))?;
        let new = record.encoded_len()?;
        if stored != new {
            return Err(StoreError::LengthChanged {
                addr: usize::from(addr),
                stored,
                new,
            });
        }
        self.write_key(addr, record, false)?;
        Ok(())
    }

    fn iter<R: Record>(&self, seq: Sequence) -> Result<RecordIter<'_, N, R>, StoreError> {
        let (addr, count) = match self.sequence_start(seq)? {
            Some(start) => (start + 1, self.read_count(seq)?),
            None => (0, 0),
        };
        Ok(RecordIter {
            registry: self,
            addr,
            index: 0,
            count,
            _record: PhantomData,
        })
    }

    pub fn devices(&self) -> Result<RecordIter<'_, N, DeviceRecord>, StoreError> {
        self.iter(Sequence::Devices)
    }

    pub fn keys(&self) -> Result<RecordIter<'_, N, KeyRecord>, StoreError> {
        self.iter(Sequence::Keys)
    }

    /// First device entry with this vendor/product pair. Unreadable records are skipped.
    pub fn find_device(&self, vid: u16, pid: u16) -> Result<Option<DeviceRecord>, StoreError> {
        for entry in self.devices()? {
            match entry {
                Ok(entry) if entry.record.vid == vid && entry.record.pid == pid => {
                    return Ok(Some(entry.record));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("device record skipped: {e}"),
            }
        }
        Ok(None)
    }

    /// Rebuilds the image from scratch.
    ///
    /// Every record is sized first; nothing is written unless the whole layout fits.
    /// HOTP keys without a full-length HMAC key are skipped.
    pub fn provision(
        &mut self,
        devices: &[DeviceRecord],
        keys: &[KeyRecord],
    ) -> Result<ProvisionSummary, StoreError> {
        let mut accepted = Vec::with_capacity(keys.len());
        let mut skipped = 0;
        for (index, key) in keys.iter().enumerate() {
            if key.kind().is_hotp() && key.key.len() != HMAC_KEY_LEN {
                let e = StoreError::KeyLengthMismatch {
                    index,
                    len: key.key.len(),
                };
                tracing::warn!("{e}; key ignored");
                skipped += 1;
                continue;
            }
            accepted.push(key);
        }
        if devices.len() > MAX_RECORDS {
            return Err(StoreError::TooMany("devices"));
        }
        if accepted.len() > MAX_RECORDS {
            return Err(StoreError::TooMany("keys"));
        }

        let capacity = self.nvram.capacity();
        let as_addr = |needed: usize| {
            u16::try_from(needed).map_err(|_| StoreError::RegistryFull { needed, capacity })
        };

        let device_start = FIRST_SEQUENCE_ADDR;
        let mut addr = device_start + 1;
        for device in devices {
            addr += usize::from(self.write_device(as_addr(addr)?, device, true)?);
        }
        let key_start = addr;
        addr += 1;
        for key in &accepted {
            addr += usize::from(self.write_key(as_addr(addr)?, key, true)?);
        }
        if addr > capacity {
            return Err(StoreError::RegistryFull {
                needed: addr,
                capacity,
            });
        }

        self.nvram.erase()?;
        let mut header = [0u8; FIRST_SEQUENCE_ADDR];
        header[DEVICE_START_PTR..DEVICE_START_PTR + 2]
            .copy_from_slice(&as_addr(device_start)?.to_be_bytes());
        header[KEY_START_PTR..KEY_START_PTR + 2].copy_from_slice(&as_addr(key_start)?.to_be_bytes());
        self.nvram.write_at(0, &header)?;

        self.nvram.write_at(device_start, &[devices.len() as u8])?;
        let mut addr = device_start + 1;
        for device in devices {
            addr += usize::from(self.write_device(as_addr(addr)?, device, false)?);
        }
        self.nvram.write_at(key_start, &[accepted.len() as u8])?;
        let mut addr = key_start + 1;
        for key in &accepted {
            addr += usize::from(self.write_key(as_addr(addr)?, key, false)?);
        }

        let summary = ProvisionSummary {
            devices: devices.len(),
            keys: accepted.len(),
            skipped,
            bytes_used: addr,
        };
        tracing::info!(
            devices = summary.devices,
            keys = summary.keys,
            skipped = summary.skipped,
            bytes = summary.bytes_used,
            "registry provisioned"
        );
        Ok(summary)
    }

    /// Erases the image and leaves empty device and key sequences.
    pub fn wipe(&mut self) -> Result<(), StoreError> {
        self.provision(&[], &[])?;
        Ok(())
    }
}

/// Walks one sequence through the length-prefix chain.
///
/// A record whose body does not decode is reported and skipped using its length
/// prefix; a length prefix that is itself unusable ends the walk.
pub struct RecordIter<'a, N, R> {
    registry: &'a Registry<N>,
    addr: usize,
    index: u8,
    count: u8,
    _record: PhantomData<R>,
}

impl<N: Nvram, R: Record> Iterator for RecordIter<'_, N, R> {
    type Item = Result<Entry<R>, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        let addr = self.addr;
        self.index += 1;

        match self.registry.read_record::<R>(addr) {
            Ok((record, len)) => {
                self.addr = addr + usize::from(len);
                Some(Ok(Entry {
                    index,
                    addr: addr as u16,
                    len,
                    record,
                }))
            }
            Err(e) => {
                match self.registry.read_record_len::<R>(addr) {
                    Ok(len) => self.addr = addr + usize::from(len),
                    Err(_) => self.index = self.count,
                }
                tracing::debug!(kind = R::NAME, index, addr, "unreadable record: {e}");
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(usize::from(self.count - self.index)))
    }
}
