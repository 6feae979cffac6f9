use crate::disk::BLOCK_SIZE;

pub const SUPER_BLOCK_BLOCK_ID: u32 = 0;
pub const INODE_TABLE_START_BLOCK_ID: u32 = 1;

/// 魔数，"MFS1"
pub const FS_MAGIC: u32 = 0x4D46_5331;

pub const DEFAULT_TOTAL_BLOCKS: u32 = 1024;
pub const DEFAULT_MAX_INODES: u32 = 128;

// 每个文件最多 10 个数据块
pub const MAX_FILE_BLOCKS: usize = 10;
pub const MAX_FILE_SIZE: usize = MAX_FILE_BLOCKS * BLOCK_SIZE;

// 文件名字段 32 字节，末尾至少留一个 NUL
pub const NAME_FIELD_LEN: usize = 32;
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

// 每个 Inode 在盘上固定占 128 字节，一个 4KB 块可以存 32 个 Inode
pub const INODE_RECORD_SIZE: usize = 128;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_RECORD_SIZE;

/// 镜像几何参数。块大小和单文件块数是编译期常量，这里只放可以按镜像调整的部分。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub total_blocks: u32,
    pub max_inodes: u32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            total_blocks: DEFAULT_TOTAL_BLOCKS,
            max_inodes: DEFAULT_MAX_INODES,
        }
    }
}

impl Geometry {
    pub fn new(total_blocks: u32, max_inodes: u32) -> Self {
        Self {
            total_blocks,
            max_inodes,
        }
    }

    /// inode 表占用的块数 = ceil(max_inodes * 128 / block_size)
    pub fn inode_table_blocks(&self) -> u32 {
        ceil_div(self.max_inodes as usize * INODE_RECORD_SIZE, BLOCK_SIZE) as u32
    }

    /// 位图字节数，每块 1 bit
    pub fn bitmap_bytes(&self) -> usize {
        ceil_div(self.total_blocks as usize, 8)
    }

    /// 位图占用的块数 = ceil(total_blocks / 8 / block_size)
    pub fn bitmap_blocks(&self) -> u32 {
        ceil_div(self.bitmap_bytes(), BLOCK_SIZE) as u32
    }

    pub fn bitmap_start(&self) -> u32 {
        INODE_TABLE_START_BLOCK_ID + self.inode_table_blocks()
    }

    pub fn data_start(&self) -> u32 {
        self.bitmap_start() + self.bitmap_blocks()
    }
}

pub const fn ceil_div(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_reference_image() {
        let g = Geometry::default();
        assert_eq!(g.inode_table_blocks(), 4);
        assert_eq!(g.bitmap_start(), 5);
        assert_eq!(g.bitmap_blocks(), 1);
        assert_eq!(g.data_start(), 6);
    }

    #[test]
    fn partial_regions_round_up() {
        let g = Geometry::new(40_000, 33);
        // 33 * 128 = 4224 字节，跨两个块
        assert_eq!(g.inode_table_blocks(), 2);
        // 40000 bit = 5000 字节，跨两个块
        assert_eq!(g.bitmap_blocks(), 2);
        assert_eq!(g.data_start(), 1 + 2 + 2);
    }
}
