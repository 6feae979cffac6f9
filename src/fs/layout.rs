use bitflags::bitflags;
use tracing::trace;

use crate::{
    disk::{Block, BlockDevice, BlockId, BLOCK_SIZE},
    fs::{
        error::{FsError, Result},
        FileSystem,
    },
};

bitflags! {
    /// 需要写回磁盘的元数据区域
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Regions: u8 {
        const SUPER_BLOCK = 1 << 0;
        const INODE_TABLE = 1 << 1;
        const BITMAP = 1 << 2;
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 把指定的元数据区域写回磁盘。超级块最后写，让它的计数对应已落盘的位图。
    pub fn flush(&self, regions: Regions) -> Result<()> {
        if regions.contains(Regions::INODE_TABLE) {
            self.inode_table.sync(&self.disk)?;
        }
        if regions.contains(Regions::BITMAP) {
            self.bitmap.sync(&self.disk)?;
        }
        if regions.contains(Regions::SUPER_BLOCK) {
            self.super_block.sync(&self.disk)?;
        }
        trace!(?regions, "flushed metadata");
        Ok(())
    }

    /// 读取任意一个块的原始内容
    pub fn read_block(&self, block: BlockId) -> Result<Block> {
        if block >= self.super_block.total_blocks {
            return Err(FsError::InvalidBlock(block));
        }
        let mut block_buf: Block = [0; BLOCK_SIZE];
        self.disk.read_block(block, &mut block_buf)?;
        Ok(block_buf)
    }

    /// 写一个数据块，只允许写数据区
    pub fn write_data_block(&self, block: BlockId, buf: &Block) -> Result<()> {
        if !(self.super_block.data_start..self.super_block.total_blocks).contains(&block) {
            return Err(FsError::InvalidBlock(block));
        }
        self.disk.write_block(block, buf)?;
        Ok(())
    }
}
