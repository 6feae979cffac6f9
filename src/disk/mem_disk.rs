use std::{
    fmt,
    io::{self, Result},
    sync::Mutex,
};

use crate::disk::{
    block_device::BlockDevice,
    types::{Block, BlockId, BLOCK_SIZE},
};

/// 内存块设备，进程退出即丢失，用于测试和临时会话
pub struct MemDisk {
    bytes: Mutex<Vec<u8>>,
    block_count: u32,
}

impl MemDisk {
    pub fn new(block_count: u32) -> Self {
        Self {
            bytes: Mutex::new(vec![0; block_count as usize * BLOCK_SIZE]),
            block_count,
        }
    }

    fn range(&self, block_id: BlockId) -> Result<std::ops::Range<usize>> {
        if block_id >= self.block_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {block_id} out of range (disk has {} blocks)", self.block_count),
            ));
        }
        let start = block_id as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl fmt::Debug for MemDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemDisk")
            .field("block_count", &self.block_count)
            .finish_non_exhaustive()
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, block_id: BlockId, buf: &mut Block) -> Result<()> {
        let range = self.range(block_id)?;
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory disk lock poisoned"))?;
        buf.copy_from_slice(&bytes[range]);
        Ok(())
    }

    fn write_block(&self, block_id: BlockId, buf: &Block) -> Result<()> {
        let range = self.range(block_id)?;
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory disk lock poisoned"))?;
        bytes[range].copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }
}
