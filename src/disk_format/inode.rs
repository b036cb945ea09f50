use serde::{Deserialize, Serialize};

use super::name::{InodeName, MAX_NAME_LEN};
use super::block::BLOCK_SIZE;
use crate::flatfs::BlockNumber;

/// number of slots in the inode table
pub const INODES_NUM: usize = 192;

/// The number of bytes one serialized inode record occupies in the inode table.
pub const INODE_SIZE: usize = 4 + MAX_NAME_LEN + 8 + 4 + 4 * NUM_DIRECT;

/// Direct block pointers per inode. There are no indirect blocks.
pub const NUM_DIRECT: usize = 14;

pub const MAX_FILE_SIZE: usize = NUM_DIRECT * BLOCK_SIZE;

/// The root directory always lives in this slot.
pub const ROOT_SLOT: usize = 0;
pub const ROOT_PATH: &str = "/";

pub const S_IFMT: u32 = libc::S_IFMT as u32;
pub const S_IFDIR: u32 = libc::S_IFDIR as u32;
pub const S_IFREG: u32 = libc::S_IFREG as u32;
pub const PERMISSION_MASK: u32 = 0o7777;

/// A free slot. Freed records are reset to this.
pub const FREE_INODE: Inode = Inode {
    mode: 0,
    name: InodeName::EMPTY,
    size: 0,
    links_count: 0,
    blocks: [0; NUM_DIRECT],
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct Inode {
    /// file type and permission bits
    pub mode: u32,
    /// full absolute path; doubles as the directory entry
    pub name: InodeName,
    /// apparent file size in bytes (0 for directories)
    pub size: u64,
    /// link count (2 for a fresh directory, 1 for a fresh file)
    pub links_count: i32,
    /// block #s of the file's blocks, `blocks[i]` holds bytes `i * BLOCK_SIZE..`; 0 = none
    pub blocks: [u32; NUM_DIRECT],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InodeType {
    /// This slot is not in use.
    Free,
    Directory,
    Regular,
}

impl Inode {
    pub fn directory(name: InodeName, permissions: u32) -> Self {
        Inode {
            mode: S_IFDIR | (permissions & PERMISSION_MASK),
            name,
            links_count: 2,
            ..FREE_INODE
        }
    }

    pub fn regular(name: InodeName, permissions: u32, first_block: BlockNumber) -> Self {
        let mut blocks = [0; NUM_DIRECT];
        blocks[0] = first_block as u32;

        Inode {
            mode: S_IFREG | (permissions & PERMISSION_MASK),
            name,
            links_count: 1,
            blocks,
            ..FREE_INODE
        }
    }

    pub fn type_(&self) -> InodeType {
        match self.mode & S_IFMT {
            S_IFDIR => InodeType::Directory,
            S_IFREG => InodeType::Regular,
            _ => InodeType::Free,
        }
    }

    pub fn permissions(&self) -> u16 {
        (self.mode & PERMISSION_MASK) as u16
    }

    /// The non-zero entries of the block list, in file order.
    pub fn allocated_blocks(&self) -> impl Iterator<Item = BlockNumber> + '_ {
        self.blocks
            .iter()
            .filter(|b| **b != 0)
            .map(|b| *b as BlockNumber)
    }
}
