use std::{collections::HashSet, path::Path};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::disk::{Block, BlockDevice, BlockId, FileDisk, BLOCK_SIZE};

pub mod block_bitmap;
pub mod config;
pub mod error;
pub mod inode_table;
pub mod layout;
pub mod listing;
pub mod shared;
pub mod super_block;


pub use block_bitmap::BlockBitmap;
pub use config::{Geometry, MAX_FILE_BLOCKS, MAX_FILE_SIZE, MAX_NAME_LEN};
pub use error::{FsError, Result};
pub use inode_table::{Inode, InodeTable};
pub use layout::Regions;
pub use listing::FileInfo;
pub use shared::SharedFileSystem;
pub use super_block::SuperBlock;

use config::ceil_div;

/// `create` 的返回值，标识一个 inode 槽位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub slot: usize,
    pub id: Uuid,
    pub name: String,
}

/// 空间使用概况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub total_blocks: u32,
    pub data_blocks: u32,
    pub free_blocks: u32,
    pub used_inodes: usize,
    pub max_inodes: usize,
}

/// 一个已挂载的镜像。超级块、位图和 inode 表常驻内存，每次修改后立即写回磁盘。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = FileDisk> {
    disk: D,                    // 底层磁盘抽象层
    super_block: SuperBlock,    // 文件系统总体信息
    bitmap: BlockBitmap,        // 块分配信息
    inode_table: InodeTable,    // 所有 inode 管理
}

impl FileSystem<FileDisk> {
    /// 镜像文件不存在（或为空）时格式化，否则挂载
    pub fn open_or_format(path: impl AsRef<Path>, geometry: Geometry) -> Result<Self> {
        let disk = FileDisk::open(path, geometry.total_blocks)?;
        if disk.fresh {
            info!(path = %disk.path().display(), "no file system found, formatting");
            Self::format(disk, geometry)
        } else {
            Self::mount(disk, geometry)
        }
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// 写入一个全新的镜像：超级块、inode 表、位图、清零的数据区
    pub fn format(disk: D, geometry: Geometry) -> Result<Self> {
        if disk.block_count() < geometry.total_blocks {
            return Err(FsError::InvalidGeometry(format!(
                "device holds {} blocks, geometry needs {}",
                disk.block_count(),
                geometry.total_blocks
            )));
        }
        let super_block = SuperBlock::new(&geometry)?;
        let fs = Self {
            disk,
            super_block,
            bitmap: BlockBitmap::new(&geometry),
            inode_table: InodeTable::new(&geometry),
        };
        fs.write_fresh_image()?;
        info!(
            total_blocks = geometry.total_blocks,
            max_inodes = geometry.max_inodes,
            data_start = fs.super_block.data_start,
            "formatted file system"
        );
        Ok(fs)
    }

    /// 按当前几何参数重新格式化，丢弃所有文件
    pub fn reformat(&mut self) -> Result<()> {
        let geometry = self.geometry();
        self.super_block = SuperBlock::new(&geometry)?;
        self.bitmap = BlockBitmap::new(&geometry);
        self.inode_table = InodeTable::new(&geometry);
        self.write_fresh_image()?;
        info!("re-formatted file system");
        Ok(())
    }

    fn write_fresh_image(&self) -> Result<()> {
        self.flush(Regions::all())?;
        let zero: Block = [0; BLOCK_SIZE];
        for block in self.super_block.data_start..self.super_block.total_blocks {
            self.disk.write_block(block, &zero)?;
        }
        self.disk.sync()?;
        Ok(())
    }

    /// 读取已有镜像，几何参数必须与 `geometry` 一致
    pub fn mount(disk: D, geometry: Geometry) -> Result<Self> {
        let super_block = SuperBlock::load(&disk)?;
        super_block.validate(&geometry)?;
        if disk.block_count() < super_block.total_blocks {
            return Err(FsError::IncompatibleImage(format!(
                "image declares {} blocks but device holds {}",
                super_block.total_blocks,
                disk.block_count()
            )));
        }

        let bitmap = BlockBitmap::load(&disk, &geometry)?;
        let inode_table = InodeTable::load(&disk, &geometry)?;

        let expected_free = super_block.total_blocks - bitmap.used_count();
        if super_block.free_blocks != expected_free {
            return Err(FsError::Corrupted(format!(
                "superblock counts {} free blocks, bitmap has {expected_free}",
                super_block.free_blocks
            )));
        }
        for (slot, inode) in inode_table.occupied() {
            verify_inode(slot, inode, &super_block, &bitmap)?;
        }

        info!(
            files = inode_table.occupied().count(),
            free_blocks = super_block.free_blocks,
            "mounted file system"
        );
        Ok(Self {
            disk,
            super_block,
            bitmap,
            inode_table,
        })
    }

    /// 写回全部元数据并交还底层设备
    pub fn close(self) -> Result<D> {
        self.flush(Regions::all())?;
        self.disk.sync()?;
        info!("closed file system");
        Ok(self.disk)
    }

    pub fn geometry(&self) -> Geometry {
        self.super_block.geometry()
    }

    pub fn super_block(&self) -> &SuperBlock {
        &self.super_block
    }

    pub fn bitmap(&self) -> &BlockBitmap {
        &self.bitmap
    }

    pub fn inode_table(&self) -> &InodeTable {
        &self.inode_table
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.inode_table.lookup(name)
    }

    pub fn create(&mut self, name: &str) -> Result<FileHandle> {
        let slot = self.inode_table.alloc_inode(name)?;
        self.flush(Regions::INODE_TABLE)?;

        let inode = self.inode(slot)?;
        debug!(file = name, slot, "created file");
        Ok(FileHandle {
            slot,
            id: inode.id,
            name: inode.name.clone(),
        })
    }

    /// 分配编号最小的空闲数据块，并把位图和超级块写回
    pub fn alloc_block(&mut self) -> Result<BlockId> {
        let block = self
            .bitmap
            .alloc(self.super_block.data_start)
            .ok_or(FsError::NoSpace)?;
        self.super_block.free_blocks -= 1;
        if let Err(e) = self.flush(Regions::BITMAP | Regions::SUPER_BLOCK) {
            // 没写下去就撤回，内存里不能留下无主的块
            self.bitmap.free(block);
            self.super_block.free_blocks += 1;
            return Err(e);
        }
        debug!(block, free_blocks = self.super_block.free_blocks, "allocated block");
        Ok(block)
    }

    pub fn release_block(&mut self, block: BlockId) -> Result<()> {
        let in_data_region =
            (self.super_block.data_start..self.super_block.total_blocks).contains(&block);
        if !in_data_region || !self.bitmap.free(block) {
            return Err(FsError::InvalidBlock(block));
        }
        self.super_block.free_blocks += 1;
        self.flush(Regions::BITMAP | Regions::SUPER_BLOCK)?;
        debug!(block, free_blocks = self.super_block.free_blocks, "released block");
        Ok(())
    }

    /// 整体替换文件内容。已有的块按顺序复用，不够时再分配；
    /// 变短时尾部多出来的块保持分配状态，不会回收。
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let slot = self
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;

        let blocks_needed = ceil_div(data.len(), BLOCK_SIZE);
        if blocks_needed > MAX_FILE_BLOCKS {
            return Err(FsError::FileTooLarge {
                size: data.len(),
                max: MAX_FILE_SIZE,
            });
        }

        // 先确认空间够用，避免分配到一半失败
        let missing = self.inode(slot)?.blocks[..blocks_needed]
            .iter()
            .filter(|b| b.is_none())
            .count();
        if missing > self.super_block.free_blocks as usize {
            return Err(FsError::NoSpace);
        }

        for (i, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            let assigned = self.inode(slot)?.blocks[i];
            let block = match assigned {
                Some(block) => block,
                None => {
                    let block = self.alloc_block()?;
                    self.inode_mut(slot)?.blocks[i] = Some(block);
                    block
                }
            };

            let mut block_buf: Block = [0; BLOCK_SIZE];
            block_buf[..chunk.len()].copy_from_slice(chunk);
            self.write_data_block(block, &block_buf)?;
        }

        let inode = self.inode_mut(slot)?;
        let orphaned: Vec<BlockId> = inode.blocks[blocks_needed..]
            .iter()
            .flatten()
            .copied()
            .collect();
        inode.size = data.len() as u64;
        inode.touch();
        self.flush(Regions::INODE_TABLE)?;

        if !orphaned.is_empty() {
            warn!(file = name, ?orphaned, "shrinking write leaves trailing blocks allocated");
        }
        debug!(file = name, size = data.len(), blocks = blocks_needed, "wrote file");
        Ok(())
    }

    /// 按块顺序拼接文件内容，返回长度恰好等于 size
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let slot = self
            .lookup(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))?;
        let inode = self.inode(slot)?;

        let size = inode.size as usize;
        let mut data = Vec::with_capacity(size);
        let mut block_buf: Block = [0; BLOCK_SIZE];

        for i in 0..ceil_div(size, BLOCK_SIZE) {
            let block = inode.blocks.get(i).copied().flatten().ok_or_else(|| {
                FsError::Corrupted(format!("'{name}' has {size} bytes but no block at index {i}"))
            })?;
            self.disk.read_block(block, &mut block_buf)?;
            let take = (size - data.len()).min(BLOCK_SIZE);
            data.extend_from_slice(&block_buf[..take]);
        }
        Ok(data)
    }

    pub fn usage(&self) -> Usage {
        let sb = &self.super_block;
        Usage {
            total_blocks: sb.total_blocks,
            data_blocks: sb.total_blocks - sb.data_start,
            free_blocks: sb.free_blocks,
            used_inodes: self.inode_table.occupied().count(),
            max_inodes: self.inode_table.capacity(),
        }
    }

    /// 检查内存中的元数据是否自洽：空闲计数、元数据区占用、块归属唯一、位图与 inode 一致
    pub fn check(&self) -> Result<()> {
        let sb = &self.super_block;
        let expected_free = sb.total_blocks - self.bitmap.used_count();
        if sb.free_blocks != expected_free {
            return Err(FsError::Corrupted(format!(
                "free_blocks is {}, bitmap says {expected_free}",
                sb.free_blocks
            )));
        }
        if let Some(block) = (0..sb.data_start).find(|&b| !self.bitmap.is_used(b)) {
            return Err(FsError::Corrupted(format!("metadata block {block} marked free")));
        }

        let mut owned = HashSet::new();
        for (slot, inode) in self.inode_table.occupied() {
            verify_inode(slot, inode, sb, &self.bitmap)?;
            for block in inode.assigned_blocks() {
                if !owned.insert(block) {
                    return Err(FsError::Corrupted(format!(
                        "block {block} is referenced more than once"
                    )));
                }
            }
        }

        let leaked = (sb.data_start..sb.total_blocks)
            .find(|b| self.bitmap.is_used(*b) && !owned.contains(b));
        if let Some(block) = leaked {
            return Err(FsError::Corrupted(format!(
                "block {block} is marked used but no file references it"
            )));
        }
        Ok(())
    }

    fn inode(&self, slot: usize) -> Result<&Inode> {
        self.inode_table
            .get_inode(slot)
            .ok_or_else(|| FsError::Corrupted(format!("inode slot {slot} is empty")))
    }

    fn inode_mut(&mut self, slot: usize) -> Result<&mut Inode> {
        self.inode_table
            .get_inode_mut(slot)
            .ok_or_else(|| FsError::Corrupted(format!("inode slot {slot} is empty")))
    }
}

/// 单个 inode 自身的约束：大小不超过上限，`size` 覆盖的块都已分配，
/// 持有的块都在数据区内并在位图中置位。
fn verify_inode(
    slot: usize,
    inode: &Inode,
    sb: &SuperBlock,
    bitmap: &BlockBitmap,
) -> Result<()> {
    if inode.size > MAX_FILE_SIZE as u64 {
        return Err(FsError::Corrupted(format!(
            "inode {slot} claims {} bytes, limit is {MAX_FILE_SIZE}",
            inode.size
        )));
    }
    let needed = ceil_div(inode.size as usize, BLOCK_SIZE);
    if inode.blocks[..needed].iter().any(Option::is_none) {
        return Err(FsError::Corrupted(format!(
            "inode {slot} of {} bytes is missing blocks",
            inode.size
        )));
    }
    for block in inode.assigned_blocks() {
        if !(sb.data_start..sb.total_blocks).contains(&block) {
            return Err(FsError::Corrupted(format!(
                "inode {slot} points outside the data region: {block}"
            )));
        }
        if !bitmap.is_used(block) {
            return Err(FsError::Corrupted(format!(
                "inode {slot} holds block {block} which is marked free"
            )));
        }
    }
    Ok(())
}
