use chrono::{DateTime, Local, Utc};
use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use minifs::{FileDisk, FileSystem};
use std::{error::Error, time::Duration};

#[derive(Debug)]
pub enum Command {
    Help,
    Ls,
    Create(String),
    Read(String),
    Write(String, String),
    Stat(String),
    Df,
    Check,
    Format,
    Exit,
}

/// 命令执行后 shell 是否继续
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn execute_command(
    cmd: &Command,
    fs: &mut FileSystem<FileDisk>,
) -> Result<Flow, Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Ls => {
            let files = fs.list();
            if files.is_empty() {
                println!("{}", "(no files)".bright_black());
            }
            for info in files {
                println!(
                    "📄  {:<32} {:>8} bytes  created {}  modified {}",
                    info.name.cyan(),
                    info.size,
                    local_time(&info.created),
                    local_time(&info.modified)
                );
            }
        }
        Command::Create(name) => {
            let handle = fs.create(name)?;
            println!("📝 Created file: {} (inode {})", name.green(), handle.slot);
        }
        Command::Read(name) => {
            let data = fs.read(name)?;
            println!("📖 {} ({} bytes):", name.cyan(), data.len());
            println!("{}", String::from_utf8_lossy(&data));
        }
        Command::Write(name, content) => {
            fs.write(name, content.as_bytes())?;
            println!("✏️  Wrote {} bytes to {}", content.len(), name.cyan());
        }
        Command::Stat(name) => {
            let info = fs.stat(name)?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {}\n{}: {}\n",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                info.name,
                "Inode".blue(),
                info.slot,
                "Size".blue(),
                info.size,
                "Blocks".blue(),
                info.blocks,
                "Created".blue(),
                local_time(&info.created),
                "Modified".blue(),
                local_time(&info.modified)
            );
        }
        Command::Df => {
            let usage = fs.usage();
            println!(
                "{}\n  blocks: {} total, {} data, {} free\n  inodes: {}/{} used",
                "💽 Disk usage".bright_yellow().bold(),
                usage.total_blocks,
                usage.data_blocks,
                usage.free_blocks,
                usage.used_inodes,
                usage.max_inodes
            );
        }
        Command::Check => {
            fs.check()?;
            println!("{}", "✅ File system is consistent".green());
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt("Erase every file on this disk image?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Format cancelled.".bright_black());
                return Ok(Flow::Continue);
            }

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.set_message("Formatting virtual disk...");
            pb.enable_steady_tick(Duration::from_millis(80));
            let result = fs.reformat();
            match &result {
                Ok(_) => pb.finish_with_message("✅ Disk formatted successfully!"),
                Err(_) => pb.abandon_with_message("Format failed"),
            }
            result?;
        }
        Command::Exit => {
            println!("{}", "👋 Exiting MiniFS shell...".yellow().bold());
            return Ok(Flow::Exit);
        }
    }

    Ok(Flow::Continue)
}

fn print_help() {
    println!("{}", "📘 MiniFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls                  List files
  create <file>       Create an empty file
  write <file> <str>  Replace file content with a string
  read <file>         Print file content
  stat <file>         Show file info
  df                  Show block and inode usage
  check               Verify metadata consistency
  format              Erase and re-format the disk image
  help                Show this help message
  exit                Quit the shell
"
        .bright_black()
    );
}
