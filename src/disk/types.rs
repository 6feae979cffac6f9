/// 每个逻辑块（Block）的大小：4KB
/// 文件系统以“块”为最小读写单位，整个镜像只使用这一种块大小。
pub const BLOCK_SIZE: usize = 4096;

/// 定义一个逻辑块类型（每块 4KB 的字节数组）
/// 所有磁盘读写都以 Block 为单位进行。
pub type Block = [u8; BLOCK_SIZE];

/// 块号，从 0 开始；0 号块永远是超级块。
pub type BlockId = u32;

/// 镜像字节长度
pub const fn image_len(total_blocks: u32) -> u64 {
    total_blocks as u64 * BLOCK_SIZE as u64
}
