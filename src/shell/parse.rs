use crate::shell::command::Command;

pub const COMMANDS: &[&str] = &[
    "help", "ls", "create", "write", "read", "stat", "df", "check", "format", "exit",
];

pub fn parse_command(input: &str) -> Option<Command> {
    let line = input.trim_end_matches(['\r', '\n']).trim_start();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls),
        "create" => args.first().map(|&name| Command::Create(name.to_string())),
        "write" => parse_write(line),
        "read" => args.first().map(|&name| Command::Read(name.to_string())),
        "stat" => args.first().map(|&name| Command::Stat(name.to_string())),
        "df" => Some(Command::Df),
        "check" => Some(Command::Check),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}

/// write <file> [text...]：文件名之后只去掉一个分隔符，其余内容原样保留；
/// 不带内容时把文件写成空
fn parse_write(line: &str) -> Option<Command> {
    let rest = line.strip_prefix("write")?.trim_start();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().filter(|n| !n.is_empty())?;
    let content = parts.next().unwrap_or("");
    Some(Command::Write(name.to_string(), content.to_string()))
}
