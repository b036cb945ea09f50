use anyhow::{ensure, Result};

use super::flatfs_storage::FlatFsStorage;

/// An image held in memory. Starts empty and grows on write like a sparse file.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing image.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryStorage { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FlatFsStorage for MemoryStorage {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        let start = position as usize;
        let end = start + buf.len();
        ensure!(
            end <= self.bytes.len(),
            "read of {start}..{end} past the end of a {}-byte image",
            self.bytes.len()
        );

        buf.copy_from_slice(&self.bytes[start..end]);

        Ok(())
    }

    fn write_at(&mut self, position: u64, data: &[u8]) -> Result<()> {
        let start = position as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }

        self.bytes[start..end].copy_from_slice(data);

        Ok(())
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }
}
