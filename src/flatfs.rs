use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, bail, ensure, Context};
use log::{info, warn};

use crate::bitmap::Bitmap;
use crate::disk_format::{
    block::{BLOCKS_NUM, BLOCK_SIZE, EMPTY_BLOCK, RESERVED_BLOCK},
    inode::{
        Inode, InodeType, FREE_INODE, INODES_NUM, INODE_SIZE, MAX_FILE_SIZE, NUM_DIRECT,
        ROOT_PATH, ROOT_SLOT,
    },
    layout::{
        BLOCK_BITMAP_POSITION, BLOCK_BITMAP_SIZE, IMAGE_SIZE, INODE_BITMAP_POSITION,
        INODE_BITMAP_SIZE, INODE_TABLE_POSITION, INODE_TABLE_SIZE,
    },
    name::InodeName,
};
use crate::error::{FsError, Result};
use crate::path;
use crate::storage::FlatFsStorage;

/// Index into the inode table.
pub type SlotNumber = usize;

/// Index into the block region.
pub type BlockNumber = usize;

/// What [`FlatFs::getattr`] reports for a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub type_: InodeType,
    pub permissions: u16,
    pub links_count: u32,
    pub size: u64,
    /// Number of blocks the node holds.
    pub num_blocks: u64,
}

impl From<&Inode> for Attributes {
    fn from(inode: &Inode) -> Self {
        Attributes {
            type_: inode.type_(),
            permissions: inode.permissions(),
            links_count: inode.links_count.max(0) as u32,
            size: inode.size,
            num_blocks: inode.allocated_blocks().count() as u64,
        }
    }
}

/// One entry yielded by [`FlatFs::readdir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub slot: SlotNumber,
    pub type_: InodeType,
}

/// A filesystem over one image.
///
/// Both bitmaps and the inode table live in memory and are written back in full by every
/// mutating operation before it returns.
pub struct FlatFs<S: FlatFsStorage> {
    pub storage: S,
    /// Tracks the allocation status of blocks.
    /// A value of `true` represents "occupied".
    block_bitmap: Bitmap,
    /// Tracks the allocation status of inode slots.
    /// A value of `true` represents "occupied".
    inode_bitmap: Bitmap,
    inodes: Vec<Inode>,
}

impl<S: FlatFsStorage> FlatFs<S> {
    /// Formats `storage` if it is empty, loads it otherwise.
    pub fn open(storage: S) -> Result<Self> {
        if storage.is_empty()? {
            Self::format(storage)
        } else {
            Self::load(storage)
        }
    }

    pub fn format(storage: S) -> Result<Self> {
        info!("formatting image ({IMAGE_SIZE} bytes)");

        let mut fs = Self {
            storage,
            block_bitmap: Bitmap::new(BLOCKS_NUM),
            inode_bitmap: Bitmap::new(INODES_NUM),
            inodes: vec![FREE_INODE; INODES_NUM],
        };

        fs.block_bitmap.mark(RESERVED_BLOCK, true);
        fs.inode_bitmap.mark(ROOT_SLOT, true);
        fs.inodes[ROOT_SLOT] = Inode::directory(InodeName::try_from(ROOT_PATH)?, 0o755);

        fs.sync()?;

        for block_number in 0..BLOCKS_NUM {
            fs.storage.write_block(block_number, &EMPTY_BLOCK)?;
        }

        Ok(fs)
    }

    pub fn load(storage: S) -> Result<Self> {
        let len = storage.len()?;
        if len < IMAGE_SIZE as u64 {
            return Err(anyhow!("image is {len} bytes long; expected {IMAGE_SIZE}").into());
        }

        let mut block_bitmap = vec![0; BLOCK_BITMAP_SIZE];
        storage
            .read_at(BLOCK_BITMAP_POSITION as u64, &mut block_bitmap)
            .context("reading block bitmap")?;

        let mut inode_bitmap = vec![0; INODE_BITMAP_SIZE];
        storage
            .read_at(INODE_BITMAP_POSITION as u64, &mut inode_bitmap)
            .context("reading inode bitmap")?;

        let mut table = vec![0; INODE_TABLE_SIZE];
        storage
            .read_at(INODE_TABLE_POSITION as u64, &mut table)
            .context("reading inode table")?;

        let inodes = table
            .chunks_exact(INODE_SIZE)
            .map(bincode::deserialize::<Inode>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("parsing inode table")?;

        let fs = Self {
            storage,
            block_bitmap: Bitmap::from_bytes(&block_bitmap),
            inode_bitmap: Bitmap::from_bytes(&inode_bitmap),
            inodes,
        };

        info!("{} of {BLOCKS_NUM} blocks free", fs.num_free_blocks());
        info!("{} of {INODES_NUM} inodes free", fs.num_free_inodes());

        if let Err(err) = fs.check_filesystem() {
            warn!("image is inconsistent: {err:#}");
        }

        Ok(fs)
    }

    /// Finds the slot whose stored name is exactly `path`.
    pub fn resolve(&self, path: &str) -> Option<SlotNumber> {
        (0..INODES_NUM)
            .find(|&slot| self.inode_bitmap.is_used(slot) && self.inodes[slot].name.matches(path))
    }

    /// The record in `slot`, if the slot is allocated.
    pub fn inode(&self, slot: SlotNumber) -> Option<&Inode> {
        if self.inode_bitmap.is_used(slot) {
            self.inodes.get(slot)
        } else {
            None
        }
    }

    pub fn path_of(&self, slot: SlotNumber) -> Option<&str> {
        self.inode(slot)?.name.to_str()
    }

    /// The names of the immediate entries of `dir`, in slot order.
    ///
    /// Unlike a plain prefix match on stored paths, `/ab` is not an entry of `/a` and
    /// `/a/b/c` is not an entry of `/a`.
    pub fn list_children(&self, dir: &str) -> Vec<String> {
        self.children(dir)
            .map(|(_, name, _)| path::file_name(name).to_owned())
            .collect()
    }

    pub fn getattr(&self, path: &str) -> Result<Attributes> {
        info!("getting attributes of {path}");

        if path == ROOT_PATH {
            return Ok(Attributes {
                type_: InodeType::Directory,
                permissions: 0o755,
                links_count: 2,
                size: 0,
                num_blocks: 0,
            });
        }

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;

        Ok(Attributes::from(&self.inodes[slot]))
    }

    /// Lists `path`, starting with `.` and `..`.
    pub fn readdir(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        info!("reading directory {path}");

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;
        if self.inodes[slot].type_() != InodeType::Directory {
            return Err(FsError::NotDirectory);
        }

        let parent_slot = path::parent(path)
            .and_then(|parent| self.resolve(parent))
            .unwrap_or(slot);

        let mut entries = vec![
            DirectoryEntry {
                name: ".".to_owned(),
                slot,
                type_: InodeType::Directory,
            },
            DirectoryEntry {
                name: "..".to_owned(),
                slot: parent_slot,
                type_: InodeType::Directory,
            },
        ];

        entries.extend(
            self.children(path)
                .map(|(child_slot, name, type_)| DirectoryEntry {
                    name: path::file_name(name).to_owned(),
                    slot: child_slot,
                    type_,
                }),
        );

        Ok(entries)
    }

    /// Installs a directory record. Neither the parent nor the uniqueness of `path` is checked.
    pub fn mkdir(&mut self, path: &str, mode: u32) -> Result<SlotNumber> {
        info!("creating directory {path} (mode = {mode:o})");

        let name = InodeName::try_from(path)?;
        let slot = self.inode_bitmap.find_free().ok_or(FsError::NoSpace)?;

        self.inode_bitmap.mark(slot, true);
        self.inodes[slot] = Inode::directory(name, mode);

        self.sync()?;

        Ok(slot)
    }

    /// Installs a regular file record together with its first block.
    pub fn create(&mut self, path: &str, mode: u32) -> Result<SlotNumber> {
        info!("creating file {path} (mode = {mode:o})");

        if self.resolve(path).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let name = InodeName::try_from(path)?;
        let slot = self.inode_bitmap.find_free().ok_or(FsError::NoSpace)?;
        let first_block = self.allocate_block()?;

        self.inode_bitmap.mark(slot, true);
        self.inodes[slot] = Inode::regular(name, mode, first_block);

        self.sync()?;

        Ok(slot)
    }

    /// Writes `data` at `offset`, or at the current end of the file if `append` is set.
    ///
    /// Returns the number of bytes written. Blocks allocated before a failure stay allocated.
    pub fn write(&mut self, path: &str, data: &[u8], offset: usize, append: bool) -> Result<usize> {
        if data.is_empty() {
            return Err(FsError::InvalidArgument);
        }

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;
        if self.inodes[slot].type_() == InodeType::Directory {
            return Err(FsError::IsDirectory);
        }

        let offset = if append {
            self.inodes[slot].size as usize
        } else {
            offset
        };

        info!(
            "[slot #{slot}] writing {path} (offset = {offset}; data.len() = {})",
            data.len()
        );

        let outcome = self.write_blocks(slot, offset, data);

        if let Ok(write_len) = outcome {
            let inode = &mut self.inodes[slot];
            inode.size = inode.size.max((offset + write_len) as u64);
        }

        self.sync()?;

        let write_len = outcome?;
        info!("[slot #{slot}] wrote {write_len} bytes");

        Ok(write_len)
    }

    /// Reads up to `size` bytes from `offset`. Reading at or past the end yields no bytes.
    pub fn read(&self, path: &str, size: usize, offset: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Err(FsError::InvalidArgument);
        }

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;
        let inode = &self.inodes[slot];
        if inode.type_() == InodeType::Directory {
            return Err(FsError::IsDirectory);
        }

        info!("[slot #{slot}] reading {path} (offset = {offset}; size = {size})");

        let file_size = inode.size as usize;
        if offset >= file_size {
            return Ok(vec![]);
        }

        let end = offset.saturating_add(size).min(file_size);

        let mut data = Vec::with_capacity(end - offset);
        let mut position = offset;
        while position < end {
            let block_index = position / BLOCK_SIZE;
            if block_index >= NUM_DIRECT {
                break;
            }

            let block_offset = position % BLOCK_SIZE;
            let chunk_len = (BLOCK_SIZE - block_offset).min(end - position);

            let start = data.len();
            data.resize(start + chunk_len, 0);

            // an unmapped block inside the file reads as zeros
            let block_number = inode.blocks[block_index] as BlockNumber;
            if block_number != 0 {
                self.storage
                    .read_block_range(block_number, block_offset, &mut data[start..])?;
            }

            position += chunk_len;
        }

        Ok(data)
    }

    pub fn unlink(&mut self, path: &str) -> Result<()> {
        info!("unlinking {path}");

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;
        if self.inodes[slot].type_() != InodeType::Regular {
            return Err(FsError::IsDirectory);
        }

        self.free_slot(slot);
        self.sync()
    }

    /// Removes a directory unless one of its own blocks holds non-zero bytes.
    ///
    /// Entries whose paths lie under `path` are not considered and survive the removal.
    pub fn rmdir(&mut self, path: &str) -> Result<()> {
        info!("removing directory {path}");

        let slot = self.resolve(path).ok_or(FsError::NotFound)?;
        if self.inodes[slot].type_() != InodeType::Directory {
            return Err(FsError::NotDirectory);
        }

        if slot == ROOT_SLOT {
            return Err(FsError::Busy);
        }

        for block_number in self.inodes[slot].allocated_blocks() {
            let block = self.storage.read_block(block_number)?;
            if block.iter().any(|b| *b != 0) {
                return Err(FsError::NotEmpty);
            }
        }

        self.free_slot(slot);
        self.sync()
    }

    pub fn num_free_blocks(&self) -> usize {
        self.block_bitmap.num_free()
    }

    pub fn num_free_inodes(&self) -> usize {
        self.inode_bitmap.num_free()
    }

    /// Checks the in-memory state for consistency.
    ///
    /// Leaked blocks and entries whose parent directory is missing only produce warnings.
    pub fn check_filesystem(&self) -> anyhow::Result<()> {
        ensure!(
            self.block_bitmap.is_used(RESERVED_BLOCK),
            "reserved block {RESERVED_BLOCK} is marked free"
        );
        ensure!(self.inode_bitmap.is_used(ROOT_SLOT), "root slot is free");

        let root = &self.inodes[ROOT_SLOT];
        ensure!(
            root.type_() == InodeType::Directory && root.name.matches(ROOT_PATH),
            "slot {ROOT_SLOT} does not hold the root directory"
        );

        let mut names = HashSet::new();
        let mut block_owners: HashMap<BlockNumber, SlotNumber> = HashMap::new();

        for (slot, inode) in self.inodes.iter().enumerate() {
            if !self.inode_bitmap.is_used(slot) {
                if inode.allocated_blocks().next().is_some() {
                    warn!("free slot {slot} still lists blocks");
                }

                continue;
            }

            ensure!(
                inode.type_() != InodeType::Free,
                "allocated slot {slot} has no file type"
            );
            ensure!(!inode.name.is_empty(), "allocated slot {slot} has no name");

            let name = inode
                .name
                .to_str()
                .ok_or_else(|| anyhow!("name in slot {slot} is not UTF-8: {}", inode.name))?;

            ensure!(names.insert(name), "duplicate name: {name}");
            ensure!(
                inode.size as usize <= MAX_FILE_SIZE,
                "{name}: size {} exceeds the maximum file size",
                inode.size
            );

            for block_number in inode.allocated_blocks() {
                ensure!(
                    block_number < BLOCKS_NUM,
                    "{name}: invalid block number {block_number}"
                );
                ensure!(
                    self.block_bitmap.is_used(block_number),
                    "{name}: block {block_number} is marked free"
                );

                if let Some(owner) = block_owners.insert(block_number, slot) {
                    bail!("block {block_number} is used by slots {owner} and {slot}");
                }
            }

            if let Some(parent) = path::parent(name) {
                if self.resolve(parent).is_none() {
                    warn!("{name}: parent directory {parent} does not exist");
                }
            }
        }

        let leaked = (0..BLOCKS_NUM)
            .filter(|b| *b != RESERVED_BLOCK)
            .filter(|b| self.block_bitmap.is_used(*b) && !block_owners.contains_key(b))
            .count();
        if leaked > 0 {
            warn!("{leaked} blocks are marked allocated but not used by any inode");
        }

        Ok(())
    }

    /// Allocated slots that are immediate entries of `dir`, in slot order.
    fn children<'a>(
        &'a self,
        dir: &'a str,
    ) -> impl Iterator<Item = (SlotNumber, &'a str, InodeType)> + 'a {
        self.inodes
            .iter()
            .enumerate()
            .filter(move |(slot, _)| self.inode_bitmap.is_used(*slot))
            .filter_map(move |(slot, inode)| {
                let name = inode.name.to_str()?;
                path::is_child_of(dir, name).then_some((slot, name, inode.type_()))
            })
    }

    fn write_blocks(&mut self, slot: SlotNumber, offset: usize, data: &[u8]) -> Result<usize> {
        let mut write_len = 0;
        while write_len < data.len() {
            let position = offset + write_len;

            let block_index = position / BLOCK_SIZE;
            if block_index >= NUM_DIRECT {
                return Err(FsError::FileTooBig);
            }

            let block_number = match self.inodes[slot].blocks[block_index] {
                0 => {
                    let block_number = self.allocate_block()?;
                    self.inodes[slot].blocks[block_index] = block_number as u32;
                    block_number
                }
                block_number => block_number as BlockNumber,
            };

            let block_offset = position % BLOCK_SIZE;
            let chunk_len = (BLOCK_SIZE - block_offset).min(data.len() - write_len);

            self.storage.write_block_range(
                block_number,
                block_offset,
                &data[write_len..write_len + chunk_len],
            )?;

            write_len += chunk_len;
        }

        Ok(write_len)
    }

    /// Takes the lowest free block and zero-fills it.
    fn allocate_block(&mut self) -> Result<BlockNumber> {
        let block_number = self.block_bitmap.find_free().ok_or(FsError::NoSpace)?;

        self.storage.write_block(block_number, &EMPTY_BLOCK)?;
        self.block_bitmap.mark(block_number, true);

        Ok(block_number)
    }

    /// Releases the slot and every block it lists. Does not persist.
    fn free_slot(&mut self, slot: SlotNumber) {
        let inode = self.inodes[slot];

        for block_number in inode.allocated_blocks() {
            if block_number < BLOCKS_NUM {
                self.block_bitmap.mark(block_number, false);
            } else {
                warn!("[slot #{slot}] ignoring invalid block number {block_number}");
            }
        }

        self.inodes[slot] = FREE_INODE;
        self.inode_bitmap.mark(slot, false);
    }

    /// Writes both bitmaps and the whole inode table back to the storage.
    fn sync(&mut self) -> Result<()> {
        self.storage
            .write_at(BLOCK_BITMAP_POSITION as u64, &self.block_bitmap.to_bytes())
            .context("writing block bitmap")?;

        self.storage
            .write_at(INODE_BITMAP_POSITION as u64, &self.inode_bitmap.to_bytes())
            .context("writing inode bitmap")?;

        let table = self
            .inodes
            .iter()
            .map(|inode| bincode::serialize(inode).context("serializing inode"))
            .collect::<anyhow::Result<Vec<_>>>()?
            .concat();

        self.storage
            .write_at(INODE_TABLE_POSITION as u64, &table)
            .context("writing inode table")?;

        Ok(())
    }
}
