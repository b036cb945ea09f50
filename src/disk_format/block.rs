use std::mem::size_of;

/// size of a block in bytes
pub const BLOCK_SIZE: usize = 512;

/// number of blocks in the block region
pub const BLOCKS_NUM: usize = 2880;

/// Block zero doubles as the "no block" sentinel in inode block lists, so it is marked
/// allocated at format time and never handed out.
pub const RESERVED_BLOCK: usize = 0;

pub type Block = [u8; BLOCK_SIZE];
const_assert!(size_of::<Block>() == BLOCK_SIZE);

pub const EMPTY_BLOCK: Block = [0; BLOCK_SIZE];
