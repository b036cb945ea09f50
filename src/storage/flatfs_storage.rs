use anyhow::{ensure, Result};

use crate::disk_format::block::{Block, BLOCKS_NUM, BLOCK_SIZE, EMPTY_BLOCK};
use crate::disk_format::layout::block_position;
use crate::flatfs::BlockNumber;
use crate::metadata::{OwnershipMetadata, TimeMetadata};

/// Random-access byte storage holding one image.
///
/// Implementors provide byte-granularity access; block access is layered on top.
pub trait FlatFsStorage {
    /// Fills `buf` from `position`. A short read is an error.
    fn read_at(&self, position: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes all of `data` at `position`, growing the storage if needed.
    fn write_at(&mut self, position: u64, data: &[u8]) -> Result<()>;

    /// Current size in bytes. Zero means the image has never been formatted.
    fn len(&self) -> Result<u64>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read_block(&self, block_number: BlockNumber) -> Result<Block> {
        let mut block = EMPTY_BLOCK;
        self.read_block_range(block_number, 0, &mut block)?;

        Ok(block)
    }

    fn write_block(&mut self, block_number: BlockNumber, block: &Block) -> Result<()> {
        self.write_block_range(block_number, 0, block)
    }

    /// Reads `buf.len()` bytes starting `offset` bytes into the block.
    fn read_block_range(
        &self,
        block_number: BlockNumber,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<()> {
        let position = checked_position(block_number, offset, buf.len())?;
        self.read_at(position, buf)
    }

    /// Writes `data` starting `offset` bytes into the block.
    fn write_block_range(
        &mut self,
        block_number: BlockNumber,
        offset: usize,
        data: &[u8],
    ) -> Result<()> {
        let position = checked_position(block_number, offset, data.len())?;
        self.write_at(position, data)
    }

    fn time_metadata(&self) -> Result<TimeMetadata> {
        Ok(TimeMetadata::default())
    }

    fn ownership_metadata(&self) -> Result<OwnershipMetadata> {
        Ok(OwnershipMetadata::default())
    }
}

fn checked_position(block_number: BlockNumber, offset: usize, len: usize) -> Result<u64> {
    ensure!(
        block_number < BLOCKS_NUM,
        "block number out of bounds: {block_number}"
    );
    ensure!(
        offset + len <= BLOCK_SIZE,
        "byte range {offset}..{} crosses the end of block {block_number}",
        offset + len
    );

    Ok((block_position(block_number) + offset) as u64)
}
