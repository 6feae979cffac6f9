use crate::{
    disk::{Block, BlockDevice, BlockId, BLOCK_SIZE},
    fs::{config::Geometry, error::Result},
};

/// 块占用位图，每个 bit 表示一个块是否被占用（1 = 已占用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockBitmap {
    bits: Vec<u8>,
    total_blocks: u32,
    start_block: u32, // 位图在磁盘中的起始块号
}

impl BlockBitmap {
    /// 新位图：`[0, data_start)` 是元数据区，直接置位
    pub fn new(geometry: &Geometry) -> Self {
        let mut bitmap = Self {
            bits: vec![0; geometry.bitmap_bytes()],
            total_blocks: geometry.total_blocks,
            start_block: geometry.bitmap_start(),
        };
        for block in 0..geometry.data_start() {
            bitmap.set(block);
        }
        bitmap
    }

    fn locate(block: BlockId) -> (usize, u8) {
        ((block / 8) as usize, (block % 8) as u8)
    }

    fn set(&mut self, block: BlockId) {
        let (byte_index, bit_index) = Self::locate(block);
        self.bits[byte_index] |= 1 << bit_index;
    }

    pub fn is_used(&self, block: BlockId) -> bool {
        if block >= self.total_blocks {
            return false;
        }
        let (byte_index, bit_index) = Self::locate(block);
        self.bits[byte_index] & (1 << bit_index) != 0
    }

    pub fn used_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// 从 `from` 开始找编号最小的空闲块并置位（first-fit）
    pub fn alloc(&mut self, from: BlockId) -> Option<BlockId> {
        let block = (from..self.total_blocks).find(|&b| !self.is_used(b))?;
        self.set(block);
        Some(block)
    }

    /// 清除占用位，返回该块之前是否被占用
    pub fn free(&mut self, block: BlockId) -> bool {
        if !self.is_used(block) {
            return false;
        }
        let (byte_index, bit_index) = Self::locate(block);
        self.bits[byte_index] &= !(1 << bit_index);
        true
    }

    // 从磁盘加载位图
    pub fn load<D: BlockDevice>(disk: &D, geometry: &Geometry) -> Result<Self> {
        let start_block = geometry.bitmap_start();
        let size_in_block = geometry.bitmap_blocks();
        let mut bits = Vec::with_capacity(size_in_block as usize * BLOCK_SIZE);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for i in 0..size_in_block {
            disk.read_block(start_block + i, &mut block_buf)?;
            bits.extend_from_slice(&block_buf);
        }

        // 截掉多余字节，只保留有效位
        bits.truncate(geometry.bitmap_bytes());

        // 最后一个字节里超出 total_blocks 的位不算数
        let tail_bits = geometry.total_blocks % 8;
        if tail_bits != 0 {
            if let Some(last) = bits.last_mut() {
                *last &= (1u8 << tail_bits) - 1;
            }
        }

        Ok(Self {
            bits,
            total_blocks: geometry.total_blocks,
            start_block,
        })
    }

    // 将位图写回磁盘，每块 4KB，不够用 0 填充
    pub fn sync<D: BlockDevice>(&self, disk: &D) -> Result<()> {
        for (i, chunk) in self.bits.chunks(BLOCK_SIZE).enumerate() {
            let mut block_buf: Block = [0; BLOCK_SIZE];
            block_buf[..chunk.len()].copy_from_slice(chunk);
            disk.write_block(self.start_block + i as u32, &block_buf)?;
        }
        Ok(())
    }
}
