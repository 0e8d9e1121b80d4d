use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use super::StoreError;

/// Value of an erased cell.
pub const ERASED: u8 = 0xFF;

/// Byte-addressed non-volatile storage with a fixed capacity.
pub trait Nvram {
    fn capacity(&self) -> usize;

    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Writes `bytes` at `addr` as one operation.
    fn write_at(&mut self, addr: usize, bytes: &[u8]) -> Result<(), StoreError>;

    fn erase(&mut self) -> Result<(), StoreError> {
        let blank = vec![ERASED; self.capacity()];
        self.write_at(0, &blank)
    }
}

fn check_bounds(capacity: usize, addr: usize, len: usize) -> Result<(), StoreError> {
    match addr.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(StoreError::OutOfBounds { addr, len }),
    }
}

/// RAM-backed image, used for dry runs and tests.
#[derive(Debug, Clone)]
pub struct MemoryNvram {
    cells: Vec<u8>,
}

impl MemoryNvram {
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: vec![ERASED; capacity],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }
}

impl Nvram for MemoryNvram {
    fn capacity(&self) -> usize {
        self.cells.len()
    }

    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        check_bounds(self.cells.len(), addr, buf.len())?;
        buf.copy_from_slice(&self.cells[addr..addr + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, addr: usize, bytes: &[u8]) -> Result<(), StoreError> {
        check_bounds(self.cells.len(), addr, bytes.len())?;
        self.cells[addr..addr + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

/// Fixed-size image file. A missing or short file is extended with erased cells.
#[derive(Debug)]
pub struct FileNvram {
    file: File,
    capacity: usize,
}

impl FileNvram {
    pub fn open(path: &Path, capacity: usize) -> Result<Self, StoreError> {
        if capacity < super::registry::MIN_CAPACITY || capacity > usize::from(u16::MAX) + 1 {
            return Err(StoreError::InvalidCapacity(capacity));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let current = file.metadata()?.len() as usize;
        if current < capacity {
            file.write_all_at(&vec![ERASED; capacity - current], current as u64)?;
            file.sync_data()?;
            tracing::debug!(path = %path.display(), capacity, "registry image extended");
        } else if current > capacity {
            tracing::warn!(
                path = %path.display(),
                size = current,
                capacity,
                "registry image larger than configured capacity, tail ignored"
            );
        }
        Ok(Self { file, capacity })
    }
}

impl Nvram for FileNvram {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read_at(&self, addr: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        check_bounds(self.capacity, addr, buf.len())?;
        self.file.read_exact_at(buf, addr as u64)?;
        Ok(())
    }

    fn write_at(&mut self, addr: usize, bytes: &[u8]) -> Result<(), StoreError> {
        check_bounds(self.capacity, addr, bytes.len())?;
        self.file.write_all_at(bytes, addr as u64)?;
        self.file.sync_data()?;
        Ok(())
    }
}
