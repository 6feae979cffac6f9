use chrono::{DateTime, Utc};

use crate::{
    disk::BlockDevice,
    fs::{
        error::{FsError, Result},
        inode_table::Inode,
        FileSystem,
    },
};

/// 目录列表中的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub slot: usize,
    pub name: String,
    pub size: u64,
    pub blocks: usize,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl FileInfo {
    fn from_inode(slot: usize, inode: &Inode) -> Self {
        Self {
            slot,
            name: inode.name.clone(),
            size: inode.size,
            blocks: inode.block_count(),
            created: inode.created,
            modified: inode.modified,
        }
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 按 inode 表顺序列出所有文件，只读
    pub fn list(&self) -> Vec<FileInfo> {
        self.inode_table
            .occupied()
            .map(|(slot, inode)| FileInfo::from_inode(slot, inode))
            .collect()
    }

    pub fn stat(&self, name: &str) -> Result<FileInfo> {
        let slot = self
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        self.inode_table
            .get_inode(slot)
            .map(|inode| FileInfo::from_inode(slot, inode))
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }
}
