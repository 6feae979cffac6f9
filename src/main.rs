use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use minifs::{
    fs::config::{DEFAULT_MAX_INODES, DEFAULT_TOTAL_BLOCKS},
    FileDisk, FileSystem, Geometry,
};
use tracing_subscriber::EnvFilter;

use crate::shell::start_shell;

mod shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive shell over a single-image block file system")]
struct Args {
    /// Disk image backing the file system
    #[arg(long, env = "MINIFS_IMAGE", default_value = "disk.img")]
    image: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TOTAL_BLOCKS)]
    total_blocks: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_INODES)]
    max_inodes: u32,

    /// Format the image even if it already holds a file system
    #[arg(long)]
    format: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minifs=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let geometry = Geometry::new(args.total_blocks, args.max_inodes);

    // 格式化或挂载失败时无法继续
    let opened = if args.format {
        FileDisk::create(&args.image, geometry.total_blocks)
            .map_err(Into::into)
            .and_then(|disk| FileSystem::format(disk, geometry))
    } else {
        FileSystem::open_or_format(&args.image, geometry)
    };
    let mut fs =
        opened.with_context(|| format!("cannot open disk image {}", args.image.display()))?;

    start_shell(&mut fs)?;

    fs.close().context("failed to flush disk image")?;
    Ok(())
}
