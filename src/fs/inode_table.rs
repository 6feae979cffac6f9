use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    disk::{Block, BlockDevice, BlockId, BLOCK_SIZE},
    fs::{
        config::{
            Geometry, INODES_PER_BLOCK, INODE_RECORD_SIZE, INODE_TABLE_START_BLOCK_ID,
            MAX_FILE_BLOCKS, MAX_NAME_LEN,
        },
        error::{FsError, Result},
    },
    utils::{current_timestamp, generate_uuid},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Inode {
    #[serde(with = "fixed_name")]
    pub name: String, // 文件名，空串表示该槽位空闲
    #[serde(with = "uuid::serde::compact")]
    pub id: Uuid,
    pub size: u64, // 文件大小（字节），不按块对齐
    #[serde(with = "ts_seconds")]
    pub created: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub modified: DateTime<Utc>,

    // 第 i 项存放字节区间 [i * BLOCK_SIZE, (i + 1) * BLOCK_SIZE)，None 表示未分配
    pub blocks: [Option<BlockId>; MAX_FILE_BLOCKS],
}

impl Inode {
    pub fn new(name: &str) -> Self {
        let now = current_timestamp();
        Self {
            name: name.to_string(),
            id: generate_uuid(),
            size: 0,
            created: now,
            modified: now,
            blocks: [None; MAX_FILE_BLOCKS],
        }
    }

    pub fn empty() -> Self {
        Self {
            name: String::new(),
            id: Uuid::nil(),
            size: 0,
            created: DateTime::<Utc>::default(),
            modified: DateTime::<Utc>::default(),
            blocks: [None; MAX_FILE_BLOCKS],
        }
    }

    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    // 更新修改时间
    pub fn touch(&mut self) {
        self.modified = current_timestamp();
    }

    /// 已分配的块，按文件内顺序
    pub fn assigned_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.iter().flatten().copied()
    }

    pub fn block_count(&self) -> usize {
        self.assigned_blocks().count()
    }
}

/// 文件名在盘上占固定 32 字节，NUL 填充
mod fixed_name {
    use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

    use crate::fs::config::{MAX_NAME_LEN, NAME_FIELD_LEN};

    pub fn serialize<S: Serializer>(name: &str, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = name.as_bytes();
        if bytes.len() > MAX_NAME_LEN {
            return Err(ser::Error::custom(format!(
                "name of {} bytes does not fit the name field",
                bytes.len()
            )));
        }
        let mut field = [0u8; NAME_FIELD_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        field.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let field = <[u8; NAME_FIELD_LEN]>::deserialize(deserializer)?;
        let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        String::from_utf8(field[..end].to_vec()).map_err(de::Error::custom)
    }
}

/// 定长 inode 表，按槽位下标寻址，槽位一旦分配就不会搬动
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeTable {
    inodes: Vec<Inode>,
    start_block: u32,
}

impl InodeTable {
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            inodes: vec![Inode::empty(); geometry.max_inodes as usize],
            start_block: INODE_TABLE_START_BLOCK_ID,
        }
    }

    pub fn capacity(&self) -> usize {
        self.inodes.len()
    }

    /// 线性扫描，按文件名精确匹配
    pub fn lookup(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        self.inodes.iter().position(|inode| inode.name == name)
    }

    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(FsError::InvalidName);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(FsError::NameTooLong {
                name: name.to_string(),
                max: MAX_NAME_LEN,
            });
        }
        Ok(())
    }

    /// 占用编号最小的空闲槽位。校验失败时不修改任何槽位。
    pub fn alloc_inode(&mut self, name: &str) -> Result<usize> {
        Self::validate_name(name)?;
        if self.lookup(name).is_some() {
            return Err(FsError::AlreadyExists(name.to_string()));
        }
        let slot = self
            .inodes
            .iter()
            .position(Inode::is_free)
            .ok_or(FsError::NoFreeInode)?;
        self.inodes[slot] = Inode::new(name);
        Ok(slot)
    }

    pub fn get_inode(&self, slot: usize) -> Option<&Inode> {
        self.inodes.get(slot).filter(|inode| !inode.is_free())
    }

    pub fn get_inode_mut(&mut self, slot: usize) -> Option<&mut Inode> {
        self.inodes.get_mut(slot).filter(|inode| !inode.is_free())
    }

    /// 已占用的槽位，按表内顺序
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Inode)> {
        self.inodes
            .iter()
            .enumerate()
            .filter(|(_, inode)| !inode.is_free())
    }

    pub fn sync<D: BlockDevice>(&self, disk: &D) -> Result<()> {
        for (i, chunk) in self.inodes.chunks(INODES_PER_BLOCK).enumerate() {
            let mut block_buf: Block = [0; BLOCK_SIZE];
            for (j, inode) in chunk.iter().enumerate() {
                let bytes = bincode::serialize(inode)
                    .map_err(|e| FsError::Corrupted(format!("encode inode: {e}")))?;
                if bytes.len() > INODE_RECORD_SIZE {
                    return Err(FsError::Corrupted(format!(
                        "inode record is {} bytes, slot holds {INODE_RECORD_SIZE}",
                        bytes.len()
                    )));
                }
                let offset = j * INODE_RECORD_SIZE;
                block_buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
            }
            disk.write_block(self.start_block + i as u32, &block_buf)?;
        }
        Ok(())
    }

    pub fn load<D: BlockDevice>(disk: &D, geometry: &Geometry) -> Result<Self> {
        let mut table = Self::new(geometry);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for (i, chunk) in table.inodes.chunks_mut(INODES_PER_BLOCK).enumerate() {
            disk.read_block(table.start_block + i as u32, &mut block_buf)?;
            for (j, slot) in chunk.iter_mut().enumerate() {
                let offset = j * INODE_RECORD_SIZE;
                let record = &block_buf[offset..offset + INODE_RECORD_SIZE];
                *slot = bincode::deserialize(record).map_err(|e| {
                    FsError::Corrupted(format!("inode {}: {e}", i * INODES_PER_BLOCK + j))
                })?;
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemDisk;

    fn table(max_inodes: u32) -> InodeTable {
        InodeTable::new(&Geometry::new(256, max_inodes))
    }

    #[test]
    fn full_inode_fits_its_record() {
        let mut inode = Inode::new(&"n".repeat(MAX_NAME_LEN));
        inode.size = u64::MAX;
        inode.blocks = [Some(BlockId::MAX); MAX_FILE_BLOCKS];
        let size = bincode::serialized_size(&inode).expect("size") as usize;
        assert!(size <= INODE_RECORD_SIZE, "record is {size} bytes");
    }

    #[test]
    fn zeroed_record_decodes_as_free_slot() {
        let zeros = [0u8; INODE_RECORD_SIZE];
        let inode: Inode = bincode::deserialize(&zeros).expect("decode");
        assert!(inode.is_free());
        assert_eq!(inode.block_count(), 0);
    }

    #[test]
    fn alloc_takes_lowest_free_slot() {
        let mut t = table(4);
        assert_eq!(t.alloc_inode("a").unwrap(), 0);
        assert_eq!(t.alloc_inode("b").unwrap(), 1);
        assert_eq!(t.lookup("b"), Some(1));
        assert_eq!(t.lookup("c"), None);
        assert_eq!(t.lookup(""), None);
    }

    #[test]
    fn duplicate_name_leaves_table_untouched() {
        let mut t = table(4);
        t.alloc_inode("a").unwrap();
        let before = t.clone();

        let err = t.alloc_inode("a").unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists(ref n) if n == "a"));
        assert_eq!(t, before);
    }

    #[test]
    fn rejects_bad_names_without_truncating() {
        let mut t = table(4);
        assert!(matches!(t.alloc_inode(""), Err(FsError::InvalidName)));

        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(t.alloc_inode(&long), Err(FsError::NameTooLong { .. })));
        assert_eq!(t.occupied().count(), 0);

        let exact = "y".repeat(MAX_NAME_LEN);
        assert!(t.alloc_inode(&exact).is_ok());
    }

    #[test]
    fn full_table_reports_no_free_inode() {
        let mut t = table(2);
        t.alloc_inode("a").unwrap();
        t.alloc_inode("b").unwrap();
        assert!(matches!(t.alloc_inode("c"), Err(FsError::NoFreeInode)));
    }

    #[test]
    fn sync_and_load_preserve_every_slot() {
        // 40 个 inode 跨越两个块
        let g = Geometry::new(64, 40);
        let disk = MemDisk::new(g.total_blocks);
        let mut t = InodeTable::new(&g);
        for i in 0..35 {
            t.alloc_inode(&format!("file-{i}")).unwrap();
        }
        let inode = t.get_inode_mut(33).unwrap();
        inode.size = 5000;
        inode.blocks[0] = Some(10);
        inode.blocks[1] = Some(11);
        t.sync(&disk).expect("sync");

        let loaded = InodeTable::load(&disk, &g).expect("load");
        assert_eq!(loaded, t);
        assert_eq!(loaded.get_inode(33).unwrap().block_count(), 2);
        assert!(loaded.get_inode(39).is_none());
    }
}
