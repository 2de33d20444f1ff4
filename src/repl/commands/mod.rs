//! REPL meta-commands
//!
//! Input starting with the command prefix (default `/`) is a meta-command.
//! The command table is ordered: when an abbreviation fits several entries
//! the earliest one wins. Registration order is
//!
//! | command          | shortest form |
//! |------------------|---------------|
//! | `lua [EXPR]`     | `l`           |
//! | `vim [EXPR]`     | `v`           |
//! | `buffer [B]`     | `b`           |
//! | `window [N]`     | `w`           |
//! | `indent [N]`     | `i`           |
//! | `clear`          | `c`           |
//! | `quit`           | `q`           |
//! | `help`           | `h`           |

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::continuation::strip_marker;
use super::error::{ReplError, ReplResult};

/// Default command prefix
pub const DEFAULT_PREFIX: char = '/';

/// Which handler a command runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Lua,
    Vim,
    Buffer,
    Window,
    Indent,
    Clear,
    Quit,
    Help,
}

/// One command table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Canonical name
    pub name: &'static str,
    /// Shortest accepted abbreviation
    pub min_prefix: usize,
    /// Handler
    pub kind: CommandKind,
    /// Arguments are source text rather than values
    pub raw: bool,
    /// Whether arguments are accepted at all
    pub takes_args: bool,
    /// Argument placeholder for help output
    pub usage: &'static str,
    /// One-line description for help output
    pub summary: &'static str,
}

/// The command table, in priority order
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "lua",
        min_prefix: 1,
        kind: CommandKind::Lua,
        raw: true,
        takes_args: true,
        usage: "[EXPR]",
        summary: "evaluate EXPR as lua, or switch to lua mode",
    },
    CommandSpec {
        name: "vim",
        min_prefix: 1,
        kind: CommandKind::Vim,
        raw: true,
        takes_args: true,
        usage: "[EXPR]",
        summary: "evaluate EXPR as vim commands, or switch to vim mode",
    },
    CommandSpec {
        name: "buffer",
        min_prefix: 1,
        kind: CommandKind::Buffer,
        raw: false,
        takes_args: true,
        usage: "[B]",
        summary: "evaluate as if buffer B were current (0 = none)",
    },
    CommandSpec {
        name: "window",
        min_prefix: 1,
        kind: CommandKind::Window,
        raw: false,
        takes_args: true,
        usage: "[N]",
        summary: "evaluate as if window N were current (0 = none)",
    },
    CommandSpec {
        name: "indent",
        min_prefix: 1,
        kind: CommandKind::Indent,
        raw: false,
        takes_args: true,
        usage: "[N]",
        summary: "indent output by N spaces (0-32)",
    },
    CommandSpec {
        name: "clear",
        min_prefix: 1,
        kind: CommandKind::Clear,
        raw: false,
        takes_args: false,
        usage: "",
        summary: "clear the buffer",
    },
    CommandSpec {
        name: "quit",
        min_prefix: 1,
        kind: CommandKind::Quit,
        raw: false,
        takes_args: false,
        usage: "",
        summary: "close the REPL",
    },
    CommandSpec {
        name: "help",
        min_prefix: 1,
        kind: CommandKind::Help,
        raw: false,
        takes_args: false,
        usage: "",
        summary: "show this help",
    },
];

impl CommandSpec {
    /// `l[ua]`-style rendering of the name
    pub fn abbreviated(&self) -> String {
        let (required, optional) = self.name.split_at(self.min_prefix.min(self.name.len()));
        if optional.is_empty() {
            required.to_string()
        } else {
            format!("{}[{}]", required, optional)
        }
    }
}

/// What a handler asks the session to do afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Append a fresh input line
    Continue,
    /// Leave the buffer as the handler left it
    Hold,
    /// The session is over
    Exit,
}

static COMMAND_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]*)\s*(.*)$").expect("command pattern is valid"));

/// Whether `typed` abbreviates `name`: a non-empty prefix at least `min`
/// characters long. Case-sensitive.
pub fn abbrev_matches(
    typed: &str,
    name: &str,
    min: usize,
) -> bool {
    !typed.is_empty() && typed.len() >= min && name.starts_with(typed)
}

/// First table entry `typed` abbreviates
pub fn lookup(typed: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|spec| abbrev_matches(typed, spec.name, spec.min_prefix))
}

/// Command argument, shaped by the entry's `raw` flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Source lines, markers stripped
    Source(Vec<String>),
    /// All lines joined into one trimmed value
    Value(String),
}

impl Argument {
    fn new(
        raw: bool,
        lines: Vec<String>,
    ) -> Self {
        if raw {
            Argument::Source(lines)
        } else {
            Argument::Value(lines.join(" ").trim().to_string())
        }
    }

    /// Argument as program lines
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Argument::Source(lines) => lines,
            Argument::Value(value) => vec![value],
        }
    }

    /// Argument as a single trimmed value
    pub fn into_value(self) -> String {
        match self {
            Argument::Source(lines) => lines.join(" ").trim().to_string(),
            Argument::Value(value) => value,
        }
    }
}

/// A parsed meta-command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Matched table entry
    pub spec: &'static CommandSpec,
    /// `None` when every argument line is blank
    pub args: Option<Argument>,
}

/// A submitted statement, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Meta-command
    Command(ParsedCommand),
    /// Source for the active language, markers stripped
    Program(Vec<String>),
}

/// Classify a statement by its first line.
///
/// Fails with [`ReplError::InvalidCommand`] for a prefixed line that does
/// not parse or match the table.
pub fn classify(
    lines: &[String],
    prefix: char,
    marker: char,
) -> ReplResult<Input> {
    let Some((first, rest)) = lines.split_first() else {
        return Ok(Input::Program(Vec::new()));
    };
    let continuation = rest.iter().map(|l| strip_marker(l, marker).to_string());

    let Some(command_line) = first.strip_prefix(prefix) else {
        let program = std::iter::once(first.clone()).chain(continuation).collect();
        return Ok(Input::Program(program));
    };

    let caps = COMMAND_LINE
        .captures(command_line)
        .ok_or(ReplError::InvalidCommand)?;
    let name = caps.get(1).map_or("", |m| m.as_str());
    let spec = lookup(name).ok_or(ReplError::InvalidCommand)?;
    let head = caps.get(2).map_or("", |m| m.as_str());
    debug!(name, command = spec.name, "meta-command");

    let mut args: Vec<String> = std::iter::once(head.to_string()).chain(continuation).collect();
    if args.len() == 1 {
        args[0] = args[0].trim_end().to_string();
    }
    let args = if args.iter().all(|a| a.trim().is_empty()) {
        None
    } else {
        Some(Argument::new(spec.raw, args))
    };

    Ok(Input::Command(ParsedCommand { spec, args }))
}

/// Help text, one line per command
pub fn help_lines(prefix: char) -> Vec<String> {
    COMMANDS
        .iter()
        .map(|spec| {
            let synopsis = format!("{}{} {}", prefix, spec.abbreviated(), spec.usage);
            format!("{:<18}{}", synopsis.trim_end(), spec.summary)
        })
        .collect()
}
