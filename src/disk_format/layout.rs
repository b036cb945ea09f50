//! ```text
//! 0                                      block bitmap   (BLOCKS_NUM bytes)
//! BLOCKS_NUM                             inode bitmap   (INODES_NUM bytes)
//! BLOCKS_NUM + INODES_NUM                inode table    (INODES_NUM * INODE_SIZE bytes)
//! BLOCKS_NUM + INODES_NUM + table size   block region   (BLOCKS_NUM * BLOCK_SIZE bytes)
//! ```
//!
//! There is no header, magic number or version field.

use super::block::{BLOCKS_NUM, BLOCK_SIZE};
use super::inode::{INODES_NUM, INODE_SIZE};

pub const BLOCK_BITMAP_POSITION: usize = 0;
pub const BLOCK_BITMAP_SIZE: usize = BLOCKS_NUM;

pub const INODE_BITMAP_POSITION: usize = BLOCK_BITMAP_POSITION + BLOCK_BITMAP_SIZE;
pub const INODE_BITMAP_SIZE: usize = INODES_NUM;

pub const INODE_TABLE_POSITION: usize = INODE_BITMAP_POSITION + INODE_BITMAP_SIZE;
pub const INODE_TABLE_SIZE: usize = INODES_NUM * INODE_SIZE;

/// Everything before the block region. Rewritten in full by every mutating operation.
pub const METADATA_SIZE: usize = INODE_TABLE_POSITION + INODE_TABLE_SIZE;

pub const BLOCK_REGION_POSITION: usize = METADATA_SIZE;
pub const BLOCK_REGION_SIZE: usize = BLOCKS_NUM * BLOCK_SIZE;

/// The size of a fully formatted image.
pub const IMAGE_SIZE: usize = BLOCK_REGION_POSITION + BLOCK_REGION_SIZE;

/// Absolute byte position of the start of block `block_number`.
pub const fn block_position(block_number: usize) -> usize {
    BLOCK_REGION_POSITION + block_number * BLOCK_SIZE
}
