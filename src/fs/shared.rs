use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    disk::{BlockDevice, FileDisk},
    fs::{
        error::{FsError, Result},
        listing::FileInfo,
        FileHandle, FileSystem, Usage,
    },
};

/// 多线程共享同一个镜像时使用。整个文件系统只有一把锁：
/// 位图、空闲计数和 inode 表是互相关联的，不能分开加锁。
#[derive(Debug)]
pub struct SharedFileSystem<D: BlockDevice = FileDisk> {
    inner: Arc<Mutex<FileSystem<D>>>,
}

impl<D: BlockDevice> Clone for SharedFileSystem<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: BlockDevice> SharedFileSystem<D> {
    pub fn new(fs: FileSystem<D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(fs)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileSystem<D>>> {
        self.inner
            .lock()
            .map_err(|_| FsError::Corrupted("file system lock poisoned mid-operation".into()))
    }

    /// 持锁执行任意操作
    pub fn with<T>(&self, f: impl FnOnce(&mut FileSystem<D>) -> Result<T>) -> Result<T> {
        let mut fs = self.lock()?;
        f(&mut fs)
    }

    pub fn create(&self, name: &str) -> Result<FileHandle> {
        self.lock()?.create(name)
    }

    pub fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.lock()?.write(name, data)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.lock()?.read(name)
    }

    pub fn list(&self) -> Result<Vec<FileInfo>> {
        Ok(self.lock()?.list())
    }

    pub fn usage(&self) -> Result<Usage> {
        Ok(self.lock()?.usage())
    }

    /// 最后一个持有者取回文件系统；仍有其他克隆存在时返回 None
    pub fn into_inner(self) -> Option<FileSystem<D>> {
        Arc::try_unwrap(self.inner).ok()?.into_inner().ok()
    }
}
