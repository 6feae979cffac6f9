use thiserror::Error;

use crate::disk::BlockId;

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("File name '{name}' is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },

    // 空文件名是空闲 inode 的标记，不能用作文件名
    #[error("File name must not be empty")]
    InvalidName,

    #[error("No free inode available")]
    NoFreeInode,

    #[error("Disk space is full")]
    NoSpace,

    #[error("File of {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: usize, max: usize },

    #[error("Block {0} is not an allocated data block")]
    InvalidBlock(BlockId),

    #[error("Incompatible disk image: {0}")]
    IncompatibleImage(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("File system corrupted: {0}")]
    Corrupted(String),

    #[error("Disk I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FsError>;
