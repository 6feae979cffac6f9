use std::io::Result;

use crate::disk::types::{Block, BlockId};

/// 以块为单位的后备存储。所有读写都是同步阻塞的。
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_id: BlockId, buf: &mut Block) -> Result<()>;
    fn write_block(&self, block_id: BlockId, buf: &Block) -> Result<()>;

    /// 设备可寻址的块数
    fn block_count(&self) -> u32;

    /// 把缓冲区的内容落盘
    fn sync(&self) -> Result<()> {
        Ok(())
    }
}
