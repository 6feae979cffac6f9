pub mod disk;
pub mod fs;
pub mod utils;

pub use disk::{BlockDevice, FileDisk, MemDisk};
pub use fs::{
    FileHandle, FileInfo, FileSystem, FsError, Geometry, Result, SharedFileSystem, Usage,
};
