pub mod command;
pub mod parse;

use crate::shell::{
    command::{execute_command, Flow},
    parse::{parse_command, COMMANDS},
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use minifs::{FileDisk, FileSystem};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{io::stdout, path::PathBuf};
use tracing::warn;

pub fn start_shell(fs: &mut FileSystem<FileDisk>) -> anyhow::Result<()> {
    boot_banner(fs)?;

    let username = whoami::username();
    let hostname = whoami::devicename();

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".minifs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path.clone()) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => warn!(path = %history_path.display(), "history disabled: {e}"),
    }

    // 命令补全
    let commands = COMMANDS.iter().map(|c| c.to_string()).collect();
    let completer = DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(format!("{}@{}", username, hostname).green().to_string()),
        DefaultPromptSegment::Basic("MiniFS".bright_blue().bold().to_string()),
    );

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                if buffer.trim().is_empty() {
                    continue;
                }

                // 原样交给解析器，write 的内容不能被裁掉
                match parse_command(&buffer) {
                    Some(cmd) => match execute_command(&cmd, fs) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Exit) => break,
                        Err(e) => println!("{} {}", "❌ Error:".red().bold(), e),
                    },
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or missing argument. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniFS...".yellow());
                break;
            }
            // Ctrl-C 只清掉当前行
            Ok(_) => {
                println!();
                continue;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}

/// 清屏并打印挂载信息
fn boot_banner(fs: &FileSystem<FileDisk>) -> anyhow::Result<()> {
    let mut stdout = stdout();
    execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to MiniFS v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    )?;

    let usage = fs.usage();
    println!(
        "{} {} files, {}/{} data blocks free",
        "💾 Mounted:".bright_yellow().bold(),
        usage.used_inodes,
        usage.free_blocks,
        usage.data_blocks
    );
    Ok(())
}
