use std::fs::File;
use std::os::unix::fs::{FileExt, MetadataExt};

use anyhow::{Context, Result};

use crate::metadata::{OwnershipMetadata, TimeMetadata};

use super::flatfs_storage::FlatFsStorage;

pub struct FileBackedStorage(File);

impl FileBackedStorage {
    pub fn new(file: File) -> Self {
        FileBackedStorage(file)
    }
}

impl FlatFsStorage for FileBackedStorage {
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<()> {
        self.0
            .read_exact_at(buf, position)
            .with_context(|| format!("reading {} bytes at {position}", buf.len()))
    }

    fn write_at(&mut self, position: u64, data: &[u8]) -> Result<()> {
        self.0
            .write_all_at(data, position)
            .with_context(|| format!("writing {} bytes at {position}", data.len()))
    }

    fn len(&self) -> Result<u64> {
        Ok(self.0.metadata().context("reading image metadata")?.len())
    }

    fn time_metadata(&self) -> Result<TimeMetadata> {
        let metadata = self.0.metadata()?;

        Ok(TimeMetadata {
            atime: metadata.accessed()?,
            mtime: metadata.modified()?,
            crtime: metadata.created()?,
        })
    }

    fn ownership_metadata(&self) -> Result<OwnershipMetadata> {
        let metadata = self.0.metadata()?;

        Ok(OwnershipMetadata {
            uid: metadata.uid(),
            gid: metadata.gid(),
        })
    }
}
