use serde::{Deserialize, Serialize};

use crate::{
    disk::{Block, BlockDevice, BLOCK_SIZE},
    fs::{
        config::{
            Geometry, FS_MAGIC, INODE_RECORD_SIZE, INODE_TABLE_START_BLOCK_ID, MAX_FILE_BLOCKS,
            SUPER_BLOCK_BLOCK_ID,
        },
        error::{FsError, Result},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub magic: u32, // 魔数，用于识别文件系统
    /** 几何信息，格式化后不再改变 */
    pub block_size: u32, // 每块大小（字节）
    pub total_blocks: u32, // 文件系统总块数
    pub max_inodes: u32,   // inode 表容量
    pub max_file_blocks: u32, // 单个文件最多占用的块数
    pub inode_record_size: u32, // 每个 inode 在盘上的字节数
    /** 区域起始块号 */
    pub inode_table_start: u32,
    pub bitmap_start: u32,
    pub data_start: u32,
    /** 可变计数 */
    pub free_blocks: u32, // 当前空闲块数
}

impl SuperBlock {
    /// 按几何参数计算布局。元数据区（超级块、inode 表、位图）从一开始就算作已占用。
    pub fn new(geometry: &Geometry) -> Result<Self> {
        let bitmap_start = geometry.bitmap_start();
        let data_start = geometry.data_start();

        if geometry.max_inodes == 0 {
            return Err(FsError::InvalidGeometry(
                "inode table must hold at least one inode".into(),
            ));
        }
        if data_start >= geometry.total_blocks {
            return Err(FsError::InvalidGeometry(format!(
                "metadata needs {data_start} blocks, leaving no data region in {} blocks",
                geometry.total_blocks
            )));
        }

        Ok(Self {
            magic: FS_MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks: geometry.total_blocks,
            max_inodes: geometry.max_inodes,
            max_file_blocks: MAX_FILE_BLOCKS as u32,
            inode_record_size: INODE_RECORD_SIZE as u32,
            inode_table_start: INODE_TABLE_START_BLOCK_ID,
            bitmap_start,
            data_start,
            free_blocks: geometry.total_blocks - data_start,
        })
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.total_blocks, self.max_inodes)
    }

    /// 校验盘上的几何参数与期望一致
    pub fn validate(&self, expected: &Geometry) -> Result<()> {
        if self.magic != FS_MAGIC {
            return Err(FsError::IncompatibleImage(format!(
                "bad magic {:#010x}, expected {FS_MAGIC:#010x}",
                self.magic
            )));
        }

        let checks = [
            ("block_size", self.block_size, BLOCK_SIZE as u32),
            ("total_blocks", self.total_blocks, expected.total_blocks),
            ("max_inodes", self.max_inodes, expected.max_inodes),
            ("max_file_blocks", self.max_file_blocks, MAX_FILE_BLOCKS as u32),
            ("inode_record_size", self.inode_record_size, INODE_RECORD_SIZE as u32),
        ];
        for (field, found, wanted) in checks {
            if found != wanted {
                return Err(FsError::IncompatibleImage(format!(
                    "{field} is {found}, expected {wanted}"
                )));
            }
        }

        let layout_ok = self.inode_table_start == INODE_TABLE_START_BLOCK_ID
            && self.bitmap_start == expected.bitmap_start()
            && self.data_start == expected.data_start();
        if !layout_ok {
            return Err(FsError::IncompatibleImage(format!(
                "region offsets {}/{}/{} do not match geometry",
                self.inode_table_start, self.bitmap_start, self.data_start
            )));
        }
        Ok(())
    }

    pub fn load<D: BlockDevice>(disk: &D) -> Result<Self> {
        let mut block_buf: Block = [0; BLOCK_SIZE];
        disk.read_block(SUPER_BLOCK_BLOCK_ID, &mut block_buf)?;
        bincode::deserialize(&block_buf)
            .map_err(|e| FsError::IncompatibleImage(format!("unreadable superblock: {e}")))
    }

    pub fn sync<D: BlockDevice>(&self, disk: &D) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| FsError::Corrupted(format!("encode superblock: {e}")))?;
        let mut block_buf: Block = [0; BLOCK_SIZE];
        block_buf[..bytes.len()].copy_from_slice(&bytes);
        disk.write_block(SUPER_BLOCK_BLOCK_ID, &block_buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    #[test]
    fn new_reserves_metadata_blocks() {
        let sb = SuperBlock::new(&Geometry::default()).expect("layout");
        assert_eq!(sb.inode_table_start, 1);
        assert!(sb.inode_table_start < sb.bitmap_start);
        assert!(sb.bitmap_start < sb.data_start);
        assert!(sb.data_start <= sb.total_blocks);
        assert_eq!(sb.free_blocks, 1024 - 6);
    }

    #[test]
    fn rejects_geometry_without_data_region() {
        let err = SuperBlock::new(&Geometry::new(6, 128)).unwrap_err();
        assert!(matches!(err, FsError::InvalidGeometry(_)));
    }

    #[test]
    fn persists_through_block_zero() {
        let disk = MemDisk::new(16);
        let mut sb = SuperBlock::new(&Geometry::new(16, 8)).expect("layout");
        sb.free_blocks = 3;
        sb.sync(&disk).expect("sync");

        let loaded = SuperBlock::load(&disk).expect("load");
        assert_eq!(loaded, sb);
    }

    #[test]
    fn validate_reports_mismatched_field() {
        let sb = SuperBlock::new(&Geometry::new(64, 8)).expect("layout");
        let err = sb.validate(&Geometry::new(128, 8)).unwrap_err();
        match err {
            FsError::IncompatibleImage(reason) => assert!(reason.contains("total_blocks")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zeroed_block_is_not_a_filesystem() {
        let disk = MemDisk::new(4);
        let sb = SuperBlock::load(&disk).expect("zeros still decode");
        assert!(matches!(
            sb.validate(&Geometry::default()),
            Err(FsError::IncompatibleImage(_))
        ));
    }
}
