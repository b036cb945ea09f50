use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;

use crate::error::{FsError, Result};
use crate::flatfs::{Attributes, DirectoryEntry, FlatFs, SlotNumber};
use crate::storage::FlatFsStorage;

/// A [`FlatFs`] shared between threads.
///
/// The whole filesystem sits behind one reader-writer lock. Mutating operations hold the
/// write lock from path resolution until their changes are persisted.
pub struct SharedFlatFs<S: FlatFsStorage>(Arc<RwLock<FlatFs<S>>>);

impl<S: FlatFsStorage> Clone for SharedFlatFs<S> {
    fn clone(&self) -> Self {
        SharedFlatFs(Arc::clone(&self.0))
    }
}

impl<S: FlatFsStorage> SharedFlatFs<S> {
    pub fn new(fs: FlatFs<S>) -> Self {
        SharedFlatFs(Arc::new(RwLock::new(fs)))
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, FlatFs<S>>> {
        self.0
            .read()
            .map_err(|_| FsError::Io(anyhow!("filesystem lock poisoned")))
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, FlatFs<S>>> {
        self.0
            .write()
            .map_err(|_| FsError::Io(anyhow!("filesystem lock poisoned")))
    }

    pub fn getattr(&self, path: &str) -> Result<Attributes> {
        self.read()?.getattr(path)
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.read()?.readdir(path)
    }

    pub fn read_file(&self, path: &str, size: usize, offset: usize) -> Result<Vec<u8>> {
        self.read()?.read(path, size, offset)
    }

    /// Like [`FlatFs::mkdir`], but fails with [`FsError::AlreadyExists`] if `path` is taken.
    /// The check and the insertion happen under one write lock.
    pub fn mkdir(&self, path: &str, mode: u32) -> Result<SlotNumber> {
        let mut fs = self.write()?;
        if fs.resolve(path).is_some() {
            return Err(FsError::AlreadyExists);
        }

        fs.mkdir(path, mode)
    }

    pub fn create(&self, path: &str, mode: u32) -> Result<SlotNumber> {
        self.write()?.create(path, mode)
    }

    pub fn write_file(
        &self,
        path: &str,
        data: &[u8],
        offset: usize,
        append: bool,
    ) -> Result<usize> {
        self.write()?.write(path, data, offset, append)
    }

    pub fn unlink(&self, path: &str) -> Result<()> {
        self.write()?.unlink(path)
    }

    pub fn rmdir(&self, path: &str) -> Result<()> {
        self.write()?.rmdir(path)
    }
}
