use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Result, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use tracing::debug;

use crate::disk::{
    block_device::BlockDevice,
    types::{image_len, Block, BlockId, BLOCK_SIZE},
};

/// 以宿主机上的普通文件作为虚拟磁盘
#[derive(Debug)]
pub struct FileDisk {
    path: PathBuf,
    file: Mutex<File>,
    block_count: u32,
    /// 打开前文件不存在或长度为 0，里面没有可信的文件系统
    pub fresh: bool,
}

impl FileDisk {
    /// 打开（必要时创建）镜像文件。新镜像预分配 `block_count` 个块；
    /// 已有镜像保持原样，块数按文件长度计算，由挂载去判断是否匹配。
    pub fn open(path: impl AsRef<Path>, block_count: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existed = path.exists();
        let file = Self::open_rw(&path)?;

        let prev_len = file.metadata()?.len();
        let fresh = !existed || prev_len == 0;
        let block_count = if fresh {
            Self::resize(&file, &path, block_count)?;
            block_count
        } else {
            u32::try_from(prev_len / BLOCK_SIZE as u64).unwrap_or(u32::MAX)
        };

        Ok(Self {
            path,
            file: Mutex::new(file),
            block_count,
            fresh,
        })
    }

    /// 打开镜像并强制调整为 `block_count` 个块，供显式格式化使用
    pub fn create(path: impl AsRef<Path>, block_count: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = Self::open_rw(&path)?;
        Self::resize(&file, &path, block_count)?;

        Ok(Self {
            path,
            file: Mutex::new(file),
            block_count,
            fresh: true,
        })
    }

    fn open_rw(path: &Path) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
    }

    fn resize(file: &File, path: &Path, block_count: u32) -> Result<()> {
        let prev_len = file.metadata()?.len();
        let wanted = image_len(block_count);
        if prev_len != wanted {
            debug!(path = %path.display(), prev_len, wanted, "sizing disk image");
            file.set_len(wanted)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "disk image lock poisoned"))
    }

    fn check_range(&self, block_id: BlockId) -> Result<()> {
        if block_id >= self.block_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block {block_id} out of range (disk has {} blocks)", self.block_count),
            ));
        }
        Ok(())
    }
}

impl BlockDevice for FileDisk {
    fn read_block(&self, block_id: BlockId, buf: &mut Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&self, block_id: BlockId, buf: &Block) -> Result<()> {
        self.check_range(block_id)?;
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn sync(&self) -> Result<()> {
        let mut file = self.lock()?;
        file.flush()?;
        file.sync_all()
    }
}
