use std::ffi::OsStr;
use std::ops::ControlFlow;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
};
use libc::{EINVAL, ENOENT};
use log::warn;

use crate::{
    disk_format::{
        block::{BLOCKS_NUM, BLOCK_SIZE},
        inode::{InodeType, INODES_NUM},
        name::MAX_NAME_LEN,
    },
    error::{FsError, Result},
    flatfs::{Attributes, SlotNumber},
    path,
    shared::SharedFlatFs,
    storage::FlatFsStorage,
};

/// Kernel inode numbers are slot numbers shifted by one, so that the root (slot 0) is inode 1.
pub fn slot_to_ino(slot: SlotNumber) -> u64 {
    slot as u64 + 1
}

pub fn ino_to_slot(ino: u64) -> Option<SlotNumber> {
    ino.checked_sub(1).map(|slot| slot as SlotNumber)
}

pub struct FlatFsFuse<S: FlatFsStorage> {
    fs: SharedFlatFs<S>,
    first_free_handle: u64,
}

impl<S: FlatFsStorage> FlatFsFuse<S> {
    const TTL: Duration = Duration::new(1, 0);
    const GENERATION: u64 = 1;

    pub fn new(fs: SharedFlatFs<S>) -> FlatFsFuse<S> {
        FlatFsFuse {
            fs,
            first_free_handle: 0,
        }
    }

    /// Permissions come from the record; timestamps and ownership come from the storage.
    fn get_attributes(&self, slot: SlotNumber) -> Result<FileAttr> {
        let attributes = self.fs.getattr(&self.path_of(slot)?)?;

        let fs = self.fs.read()?;

        let time_metadata = fs.storage.time_metadata().unwrap_or_default();
        let ownership_metadata = fs.storage.ownership_metadata().unwrap_or_default();

        Ok(FileAttr {
            ino: slot_to_ino(slot),
            size: attributes.size,
            blocks: attributes.num_blocks,
            atime: time_metadata.atime,
            mtime: time_metadata.mtime,
            ctime: time_metadata.mtime,
            crtime: time_metadata.crtime,
            kind: file_type(attributes)?,
            perm: attributes.permissions,
            nlink: attributes.links_count,
            uid: ownership_metadata.uid,
            gid: ownership_metadata.gid,
            rdev: 0,
            flags: 0,
            blksize: BLOCK_SIZE as u32,
        })
    }

    fn path_of(&self, slot: SlotNumber) -> Result<String> {
        self.fs
            .read()?
            .path_of(slot)
            .map(str::to_owned)
            .ok_or(FsError::NotFound)
    }

    fn entry_path(&self, parent: u64, name: &OsStr) -> Result<String> {
        let parent_slot = ino_to_slot(parent).ok_or(FsError::NotFound)?;
        let parent_path = self.path_of(parent_slot)?;
        let name = name.to_str().ok_or(FsError::InvalidArgument)?;

        Ok(path::join(&parent_path, name))
    }

    fn lookup_entry(&self, parent: u64, name: &OsStr) -> Result<FileAttr> {
        let path = self.entry_path(parent, name)?;
        let slot = self.fs.read()?.resolve(&path).ok_or(FsError::NotFound)?;

        self.get_attributes(slot)
    }

    fn read_file(&self, ino: u64, offset: i64, size: u32) -> Result<Vec<u8>> {
        let slot = ino_to_slot(ino).ok_or(FsError::NotFound)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;

        self.fs
            .read_file(&self.path_of(slot)?, size as usize, offset)
    }

    fn write_file(&self, ino: u64, offset: i64, data: &[u8], append: bool) -> Result<u32> {
        let slot = ino_to_slot(ino).ok_or(FsError::NotFound)?;
        let offset = usize::try_from(offset).map_err(|_| FsError::InvalidArgument)?;

        let write_len = self
            .fs
            .write_file(&self.path_of(slot)?, data, offset, append)?;

        Ok(write_len as u32)
    }

    fn create_file(&self, parent: u64, name: &OsStr, mode: u32) -> Result<FileAttr> {
        let path = self.entry_path(parent, name)?;
        let slot = self.fs.create(&path, mode)?;

        self.get_attributes(slot)
    }

    fn create_directory(&self, parent: u64, name: &OsStr, mode: u32) -> Result<FileAttr> {
        let path = self.entry_path(parent, name)?;
        let slot = self.fs.mkdir(&path, mode)?;

        self.get_attributes(slot)
    }

    fn remove_file(&self, parent: u64, name: &OsStr) -> Result<()> {
        let path = self.entry_path(parent, name)?;
        self.fs.unlink(&path)
    }

    fn remove_directory(&self, parent: u64, name: &OsStr) -> Result<()> {
        let path = self.entry_path(parent, name)?;
        self.fs.rmdir(&path)
    }

    fn read_directory(&self, ino: u64) -> Result<Vec<(u64, FileType, String)>> {
        let slot = ino_to_slot(ino).ok_or(FsError::NotFound)?;
        let entries = self.fs.readdir(&self.path_of(slot)?)?;

        let mut directory_contents = vec![];
        for entry in entries {
            let kind = match entry.type_ {
                InodeType::Directory => FileType::Directory,
                InodeType::Regular => FileType::RegularFile,
                InodeType::Free => {
                    warn!("directory lists an entry without a file type: {}", entry.name);
                    continue;
                }
            };

            directory_contents.push((slot_to_ino(entry.slot), kind, entry.name));
        }

        Ok(directory_contents)
    }

    fn assign_file_handle(&mut self) -> u64 {
        let assigned = self.first_free_handle;
        self.first_free_handle += 1;

        assigned
    }
}

fn file_type(attributes: Attributes) -> Result<FileType> {
    match attributes.type_ {
        InodeType::Directory => Ok(FileType::Directory),
        InodeType::Regular => Ok(FileType::RegularFile),
        InodeType::Free => Err(FsError::NotFound),
    }
}

impl<S: FlatFsStorage> Filesystem for FlatFsFuse<S> {
    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        let Ok(fs) = self.fs.read() else {
            reply.error(libc::EIO);
            return;
        };

        let num_free_blocks = fs.num_free_blocks();
        let num_free_inodes = fs.num_free_inodes();

        reply.statfs(
            BLOCKS_NUM as u64,
            num_free_blocks as u64,
            num_free_blocks as u64,
            INODES_NUM as u64,
            num_free_inodes as u64,
            BLOCK_SIZE as u32,
            (MAX_NAME_LEN - 1) as u32,
            BLOCK_SIZE as u32,
        );
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match self.lookup_entry(parent, name) {
            Ok(attr) => reply.entry(&Self::TTL, &attr, Self::GENERATION),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, _ino: u64, flags: i32, reply: ReplyOpen) {
        let handle = self.assign_file_handle();
        reply.opened(handle, flags as u32);
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, flags: i32, reply: ReplyOpen) {
        let handle = self.assign_file_handle();
        reply.opened(handle, flags as u32);
    }

    fn getattr(&mut self, _req: &Request, ino: u64, reply: ReplyAttr) {
        let Some(slot) = ino_to_slot(ino) else {
            reply.error(ENOENT);
            return;
        };

        match self.get_attributes(slot) {
            Ok(attr) => reply.attr(&Self::TTL, &attr),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock: Option<u64>,
        reply: ReplyData,
    ) {
        match self.read_file(ino, offset, size) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.read_directory(ino) {
            Ok(entries) => entries,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        let Ok(offset) = usize::try_from(offset) else {
            reply.error(EINVAL);
            return;
        };

        entries
            .into_iter()
            .enumerate()
            .skip(offset)
            .try_for_each(|(i, (entry_ino, kind, name))| {
                let is_buffer_full = reply.add(entry_ino, (i + 1) as i64, kind, name);

                if is_buffer_full {
                    return ControlFlow::Break(());
                }

                ControlFlow::Continue(())
            });

        reply.ok();
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let append = flags & libc::O_APPEND != 0;

        match self.write_file(ino, offset, data, append) {
            Ok(write_len) => reply.written(write_len),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        match self.create_file(parent, name, mode & !umask) {
            Ok(attr) => reply.created(
                &Self::TTL,
                &attr,
                Self::GENERATION,
                self.assign_file_handle(),
                flags as u32,
            ),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        match self.create_directory(parent, name, mode & !umask) {
            Ok(attr) => reply.entry(&Self::TTL, &attr, Self::GENERATION),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.remove_file(parent, name) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match self.remove_directory(parent, name) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;
    use crate::flatfs::FlatFs;
    use crate::storage::MemoryStorage;

    fn new_adapter() -> FlatFsFuse<MemoryStorage> {
        let fs = FlatFs::open(MemoryStorage::new()).unwrap();
        FlatFsFuse::new(SharedFlatFs::new(fs))
    }

    const ROOT_INO: u64 = 1;

    #[test]
    fn test_ino_mapping() {
        assert_eq!(slot_to_ino(0), ROOT_INO);
        assert_eq!(ino_to_slot(ROOT_INO), Some(0));
        assert_eq!(ino_to_slot(0), None);
    }

    #[test]
    fn test_root_attributes() {
        let adapter = new_adapter();
        let attr = adapter.get_attributes(0).unwrap();

        assert_eq!(attr.ino, ROOT_INO);
        assert_eq!(attr.kind, FileType::Directory);
        assert_eq!(attr.nlink, 2);
        assert_eq!(attr.blksize, BLOCK_SIZE as u32);
    }

    #[test]
    fn test_create_then_lookup() {
        let adapter = new_adapter();
        let created = adapter
            .create_directory(ROOT_INO, OsStr::new("a"), 0o755)
            .unwrap();
        let file = adapter
            .create_file(created.ino, OsStr::new("f"), 0o644)
            .unwrap();

        let found = adapter.lookup_entry(created.ino, OsStr::new("f")).unwrap();
        assert_eq!(found.ino, file.ino);
        assert_eq!(found.kind, FileType::RegularFile);
        assert_eq!(found.perm, 0o644);
        assert_eq!(adapter.path_of(ino_to_slot(file.ino).unwrap()).unwrap(), "/a/f");
    }

    #[test]
    fn test_mkdir_existing_path() {
        let adapter = new_adapter();
        adapter
            .create_directory(ROOT_INO, OsStr::new("a"), 0o755)
            .unwrap();

        let err = adapter
            .create_directory(ROOT_INO, OsStr::new("a"), 0o755)
            .unwrap_err();
        assert_eq!(err.errno(), libc::EEXIST);
    }

    #[test]
    fn test_write_read_by_ino() {
        let adapter = new_adapter();
        let file = adapter
            .create_file(ROOT_INO, OsStr::new("f"), 0o644)
            .unwrap();

        assert_eq!(adapter.write_file(file.ino, 0, b"hello", false).unwrap(), 5);
        assert_eq!(adapter.write_file(file.ino, 0, b"!", true).unwrap(), 1);
        assert_eq!(adapter.read_file(file.ino, 0, 4096).unwrap(), b"hello!");
        assert_eq!(adapter.get_attributes(1).unwrap().size, 6);
    }

    #[test]
    fn test_negative_offset() {
        let adapter = new_adapter();
        let file = adapter
            .create_file(ROOT_INO, OsStr::new("f"), 0o644)
            .unwrap();

        let err = adapter.read_file(file.ino, -1, 10).unwrap_err();
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn test_read_directory() {
        let adapter = new_adapter();
        let dir = adapter
            .create_directory(ROOT_INO, OsStr::new("a"), 0o755)
            .unwrap();
        let file = adapter
            .create_file(ROOT_INO, OsStr::new("f"), 0o644)
            .unwrap();

        let entries = adapter.read_directory(ROOT_INO).unwrap();
        assert_eq!(
            entries,
            vec![
                (ROOT_INO, FileType::Directory, ".".to_owned()),
                (ROOT_INO, FileType::Directory, "..".to_owned()),
                (dir.ino, FileType::Directory, "a".to_owned()),
                (file.ino, FileType::RegularFile, "f".to_owned()),
            ]
        );
    }

    #[test]
    fn test_remove_entries() {
        let adapter = new_adapter();
        let dir = adapter
            .create_directory(ROOT_INO, OsStr::new("a"), 0o755)
            .unwrap();
        adapter
            .create_file(dir.ino, OsStr::new("f"), 0o644)
            .unwrap();

        adapter.remove_file(dir.ino, OsStr::new("f")).unwrap();
        adapter.remove_directory(ROOT_INO, OsStr::new("a")).unwrap();

        let err = adapter.lookup_entry(ROOT_INO, OsStr::new("a")).unwrap_err();
        assert_eq!(err.errno(), ENOENT);
    }

    #[test]
    fn test_unknown_ino() {
        let adapter = new_adapter();
        assert_eq!(adapter.get_attributes(42).unwrap_err().errno(), ENOENT);
    }

    #[test]
    fn test_file_handles_increase() {
        let mut adapter = new_adapter();
        assert_eq!(adapter.assign_file_handle(), 0);
        assert_eq!(adapter.assign_file_handle(), 1);
    }
}
