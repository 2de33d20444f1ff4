//! REPL session
//!
//! A [`Session`] owns one REPL buffer: it resolves the statement under the
//! cursor, routes it to a meta-command or an evaluator, and writes the
//! output back into the buffer as highlighted ranges.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use super::backend_trait::{
    Completion, ContextGuard, EvalContext, EvalResult, Language, OutputChunk, OutputSink,
    ReplBackend,
};
use super::commands::{
    self, help_lines, Argument, CommandKind, CommandResult, Input, ParsedCommand,
};
use super::completion::CompletionBroker;
use super::continuation::{self, is_continuation, Statement};
use super::engine::{CommandBackend, ScriptBackend};
use super::error::{ReplError, ReplResult};
use super::history::{Direction, History};
use super::host::{BufferId, Host, WindowId};
use super::ranges::{HighlightClass, OutputTracker};
use crate::util::config::{ReplConfig, MAX_INDENT};

/// What the caller should do after a submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Line to put the cursor on (1-based)
    pub cursor_line: usize,
    /// Re-render the buffer
    pub redraw: bool,
    /// The session ended; its buffer is gone
    pub quit: bool,
}

/// Output and follow-up of one dispatched statement
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Lines to insert, grouped by class
    pub output: Vec<OutputChunk>,
    /// Follow-up requested by the handler or evaluator
    pub result: CommandResult,
}

/// One REPL instance bound to a buffer
pub struct Session {
    buf: BufferId,
    context_buffer: BufferId,
    context_window: WindowId,
    lang: Language,
    indent: usize,
    redraw: bool,
    inspect: bool,
    marker: char,
    prefix: char,
    history: History,
    tracker: OutputTracker,
    lua: Box<dyn ReplBackend>,
    vim: Box<dyn ReplBackend>,
}

impl fmt::Debug for Session {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Session")
            .field("buf", &self.buf)
            .field("context_buffer", &self.context_buffer)
            .field("context_window", &self.context_window)
            .field("lang", &self.lang)
            .field("indent", &self.indent)
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session on `buf` with the built-in evaluators
    pub fn new(
        buf: BufferId,
        config: &ReplConfig,
    ) -> Self {
        Self::with_backends(
            buf,
            config,
            Box::new(ScriptBackend::new()),
            Box::new(CommandBackend::new()),
        )
    }

    /// Session on `buf` with custom evaluators
    pub fn with_backends(
        buf: BufferId,
        config: &ReplConfig,
        lua: Box<dyn ReplBackend>,
        vim: Box<dyn ReplBackend>,
    ) -> Self {
        debug!(buf, lang = %config.lang, "session start");
        Self {
            buf,
            context_buffer: config.buffer,
            context_window: config.window,
            lang: config.lang,
            indent: config.indent.min(MAX_INDENT),
            redraw: config.redraw,
            inspect: config.inspect,
            marker: config.marker,
            prefix: config.prefix,
            history: History::new(config.history_size),
            tracker: OutputTracker::new(),
            lua,
            vim,
        }
    }

    pub fn buffer(&self) -> BufferId {
        self.buf
    }

    /// Active language for plain input
    pub fn language(&self) -> Language {
        self.lang
    }

    /// Evaluation context overrides, `0` meaning none
    pub fn context(&self) -> (BufferId, WindowId) {
        (self.context_buffer, self.context_window)
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Continuation marker
    pub fn marker(&self) -> char {
        self.marker
    }

    /// Meta-command prefix
    pub fn prefix(&self) -> char {
        self.prefix
    }

    pub fn inspect(&self) -> bool {
        self.inspect
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tracker(&self) -> &OutputTracker {
        &self.tracker
    }

    /// Whether the backing buffer still exists
    pub fn is_alive(
        &self,
        host: &dyn Host,
    ) -> bool {
        host.buffer_valid(self.buf)
    }

    fn ensure_alive(
        &self,
        host: &dyn Host,
    ) -> ReplResult<()> {
        if self.is_alive(host) {
            Ok(())
        } else {
            Err(ReplError::SessionClosed(self.buf))
        }
    }

    fn all_lines(
        &self,
        host: &dyn Host,
    ) -> Vec<String> {
        host.get_lines(self.buf, 0..host.line_count(self.buf))
    }

    fn resolve(
        &self,
        host: &dyn Host,
        cursor_line: usize,
    ) -> ReplResult<Statement> {
        continuation::resolve(&self.all_lines(host), cursor_line, self.marker)
    }

    /// Submit the statement under `cursor_line`.
    ///
    /// Diagnostics (bad continuation, unknown command, bad argument) are
    /// written into the buffer; only a vanished buffer is an `Err`.
    pub fn submit(
        &mut self,
        host: &mut dyn Host,
        cursor_line: usize,
    ) -> ReplResult<SubmitOutcome> {
        self.ensure_alive(host)?;

        let statement = match self.resolve(host, cursor_line) {
            Ok(statement) => statement,
            Err(err @ ReplError::MalformedContinuation) => {
                debug!(cursor_line, "malformed continuation");
                let block_end =
                    continuation::block_end(&self.all_lines(host), cursor_line, self.marker);
                let after = self.tracker.insertion_point(host, self.buf, block_end);
                let mut sink = OutputSink::default();
                sink.push(HighlightClass::Error, &err.to_string());
                let end = self.insert_output(host, after, sink.into_chunks());
                return Ok(self.outcome(self.open_line(host, end)));
            }
            Err(err) => return Err(err),
        };

        if statement.is_blank(self.marker) {
            let after = self.tracker.insertion_point(host, self.buf, statement.end);
            return Ok(self.outcome(self.open_line(host, after)));
        }

        self.history.append(statement.lines.clone());
        let dispatch = self.dispatch(host, &statement.lines);

        if dispatch.result == CommandResult::Exit {
            return Ok(SubmitOutcome {
                cursor_line: 0,
                redraw: false,
                quit: true,
            });
        }
        if !self.is_alive(host) {
            return Err(ReplError::SessionClosed(self.buf));
        }

        // a handler may have rewritten the buffer
        let after = statement.end.min(host.line_count(self.buf));
        let after = self.tracker.insertion_point(host, self.buf, after);
        let end = self.insert_output(host, after, dispatch.output);
        let cursor = match dispatch.result {
            CommandResult::Continue => self.open_line(host, end),
            _ => end.max(1),
        };
        Ok(self.outcome(cursor))
    }

    fn outcome(
        &self,
        cursor_line: usize,
    ) -> SubmitOutcome {
        SubmitOutcome {
            cursor_line,
            redraw: self.redraw,
            quit: false,
        }
    }

    /// Insert an empty line after `after`; returns its line number
    fn open_line(
        &self,
        host: &mut dyn Host,
        after: usize,
    ) -> usize {
        host.set_lines(self.buf, after..after, vec![String::new()]);
        after + 1
    }

    /// Insert chunks after line `after`, one range each; returns the last
    /// line written
    fn insert_output(
        &mut self,
        host: &mut dyn Host,
        after: usize,
        chunks: Vec<OutputChunk>,
    ) -> usize {
        let pad = " ".repeat(self.indent);
        let mut at = after;
        for chunk in chunks {
            if chunk.lines.is_empty() {
                continue;
            }
            let lines: Vec<String> = chunk
                .lines
                .iter()
                .map(|line| format!("{}{}", pad, line))
                .collect();
            let count = lines.len();
            host.set_lines(self.buf, at..at, lines);
            self.tracker
                .put(host, self.buf, at + 1, at + count, chunk.class);
            at += count;
        }
        at
    }

    /// Route a statement (raw lines, markers included) to a meta-command or
    /// the active evaluator, collecting its output.
    pub fn dispatch(
        &mut self,
        host: &mut dyn Host,
        lines: &[String],
    ) -> Dispatch {
        let mut sink = OutputSink::default();
        let result = match commands::classify(lines, self.prefix, self.marker) {
            Ok(Input::Program(program)) => self.evaluate(host, self.lang, &program, &mut sink),
            Ok(Input::Command(command)) => self.run_command(host, command, &mut sink),
            Err(err) => {
                sink.push(HighlightClass::Error, &err.to_string());
                CommandResult::Continue
            }
        };
        Dispatch {
            output: sink.into_chunks(),
            result,
        }
    }

    fn run_command(
        &mut self,
        host: &mut dyn Host,
        command: ParsedCommand,
        sink: &mut OutputSink,
    ) -> CommandResult {
        let ParsedCommand { spec, args } = command;
        if !spec.takes_args && args.is_some() {
            sink.push(HighlightClass::Error, &ReplError::ArgumentsNotAllowed.to_string());
            return CommandResult::Continue;
        }

        match spec.kind {
            CommandKind::Lua | CommandKind::Vim => {
                let lang = if spec.kind == CommandKind::Lua {
                    Language::Lua
                } else {
                    Language::Vim
                };
                match args {
                    Some(Argument::Source(program)) => self.evaluate(host, lang, &program, sink),
                    Some(value @ Argument::Value(_)) => {
                        self.evaluate(host, lang, &value.into_lines(), sink)
                    }
                    None => {
                        self.lang = lang;
                        sink.push(HighlightClass::Info, &format!("{} mode", lang));
                        CommandResult::Continue
                    }
                }
            }
            CommandKind::Buffer => {
                let current = self.context_buffer;
                let value = self.set_context(host, "buffer", current, args, sink);
                self.context_buffer = value;
                CommandResult::Continue
            }
            CommandKind::Window => {
                let current = self.context_window;
                let value = self.set_context(host, "window", current, args, sink);
                self.context_window = value;
                CommandResult::Continue
            }
            CommandKind::Indent => {
                match args {
                    None => sink.push(HighlightClass::Info, &format!("indent: {}", self.indent)),
                    Some(arg) => {
                        let value = arg.into_value();
                        match value.parse::<usize>() {
                            Ok(indent) if indent <= MAX_INDENT => {
                                self.indent = indent;
                                sink.push(HighlightClass::Info, &format!("indent set to {}", indent));
                            }
                            _ => sink.push(
                                HighlightClass::Error,
                                &ReplError::InvalidArgument {
                                    what: "indent",
                                    value,
                                }
                                .to_string(),
                            ),
                        }
                    }
                }
                CommandResult::Continue
            }
            CommandKind::Clear => {
                self.clear(host);
                CommandResult::Hold
            }
            CommandKind::Quit => {
                debug!(buf = self.buf, "session quit");
                self.tracker.clear(host, self.buf);
                host.delete_buffer(self.buf);
                CommandResult::Exit
            }
            CommandKind::Help => {
                sink.push(HighlightClass::Info, &help_lines(self.prefix).join("\n"));
                CommandResult::Continue
            }
        }
    }

    /// Shared handler for `/buffer` and `/window`; returns the new override
    fn set_context(
        &self,
        host: &dyn Host,
        what: &'static str,
        current: u32,
        arg: Option<Argument>,
        sink: &mut OutputSink,
    ) -> u32 {
        let Some(arg) = arg else {
            let shown = if current == 0 {
                "none".to_string()
            } else {
                current.to_string()
            };
            sink.push(HighlightClass::Info, &format!("{} context: {}", what, shown));
            return current;
        };

        let value = arg.into_value();
        let valid = |handle: u32| match what {
            "buffer" => host.buffer_valid(handle),
            _ => host.window_valid(handle),
        };
        match value.parse::<u32>() {
            Ok(0) => {
                sink.push(HighlightClass::Info, &format!("{} context reset to none", what));
                0
            }
            Ok(handle) if valid(handle) => {
                sink.push(HighlightClass::Info, &format!("{} context set to {}", what, handle));
                handle
            }
            _ => {
                sink.push(
                    HighlightClass::Error,
                    &ReplError::InvalidArgument { what, value }.to_string(),
                );
                current
            }
        }
    }

    /// Drop a context override whose target vanished
    fn check_context(
        &mut self,
        host: &dyn Host,
        sink: &mut OutputSink,
    ) -> bool {
        let mut fresh = true;
        if self.context_buffer != 0 && !host.buffer_valid(self.context_buffer) {
            warn!(buf = self.context_buffer, "stale buffer context");
            self.context_buffer = 0;
            sink.push(
                HighlightClass::Error,
                &ReplError::StaleContext { what: "buffer" }.to_string(),
            );
            fresh = false;
        }
        if self.context_window != 0 && !host.window_valid(self.context_window) {
            warn!(win = self.context_window, "stale window context");
            self.context_window = 0;
            sink.push(
                HighlightClass::Error,
                &ReplError::StaleContext { what: "window" }.to_string(),
            );
            fresh = false;
        }
        fresh
    }

    fn evaluate(
        &mut self,
        host: &mut dyn Host,
        lang: Language,
        program: &[String],
        sink: &mut OutputSink,
    ) -> CommandResult {
        if !self.check_context(host, sink) {
            return CommandResult::Continue;
        }

        let inspect = self.inspect;
        let (buf, win) = (self.context_buffer, self.context_window);
        let backend = match lang {
            Language::Lua => &mut self.lua,
            Language::Vim => &mut self.vim,
        };
        debug!(%lang, lines = program.len(), buf, win, "evaluate");

        let (result, output) = {
            let mut guard = ContextGuard::enter(host, buf, win);
            let mut ctx = EvalContext::new(&mut *guard, inspect);
            let result = panic::catch_unwind(AssertUnwindSafe(|| backend.eval(program, &mut ctx)));
            (result, ctx.into_output())
        };
        sink.extend(output);

        match result {
            Ok(EvalResult::Ok) => CommandResult::Continue,
            Ok(EvalResult::Value(value)) => {
                sink.push(HighlightClass::Value, &value);
                CommandResult::Continue
            }
            Ok(EvalResult::Hold) => CommandResult::Hold,
            Ok(EvalResult::Error(message)) => {
                debug!(%message, "evaluation failed");
                sink.push(HighlightClass::Error, &backend.clean_error(&message));
                CommandResult::Continue
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "evaluator panicked".to_string());
                warn!(%message, "evaluator panicked");
                sink.push(HighlightClass::Error, &message);
                CommandResult::Continue
            }
        }
    }

    /// Empty the buffer and forget all output ranges
    pub fn clear(
        &mut self,
        host: &mut dyn Host,
    ) {
        let count = host.line_count(self.buf);
        host.set_lines(self.buf, 0..count, vec![String::new()]);
        self.tracker.clear(host, self.buf);
    }

    /// Replace the statement under the cursor with the previous (`backward`)
    /// or next history entry; returns the new cursor line.
    pub fn history_move(
        &mut self,
        host: &mut dyn Host,
        cursor_line: usize,
        backward: bool,
    ) -> ReplResult<usize> {
        self.ensure_alive(host)?;
        let (start, end, current) = match self.resolve(host, cursor_line) {
            Ok(statement) => (statement.start, statement.end, statement.lines),
            Err(_) => {
                let line = cursor_line.clamp(1, host.line_count(self.buf));
                (line, line, host.get_lines(self.buf, line - 1..line))
            }
        };
        let direction = if backward {
            Direction::Backward
        } else {
            Direction::Forward
        };
        let replacement = self.history.move_cursor(direction, &current);
        let count = replacement.len().max(1);
        host.set_lines(self.buf, start - 1..end, replacement);
        Ok(start + count - 1)
    }

    /// Break `line` at byte `col` (0-based); the new line starts with the
    /// continuation marker. Returns the new line's number.
    pub fn break_line(
        &mut self,
        host: &mut dyn Host,
        line: usize,
        col: usize,
    ) -> ReplResult<usize> {
        self.ensure_alive(host)?;
        let line = line.clamp(1, host.line_count(self.buf));
        let text = host
            .get_lines(self.buf, line - 1..line)
            .pop()
            .unwrap_or_default();
        let mut col = col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        let (head, tail) = text.split_at(col);
        let continued = format!("{}{}", self.marker, tail);
        host.set_lines(self.buf, line - 1..line, vec![head.to_string(), continued]);
        Ok(line + 1)
    }

    /// Move among output ranges; see [`OutputTracker::goto`]
    pub fn goto_output(
        &self,
        host: &dyn Host,
        backward: bool,
        to_end: bool,
        count: usize,
        current_line: usize,
    ) -> ReplResult<usize> {
        self.ensure_alive(host)?;
        Ok(self
            .tracker
            .goto(host, self.buf, backward, to_end, count, current_line))
    }

    /// Completion for `line` with the cursor at byte `col`
    pub fn complete_at(
        &self,
        line: &str,
        col: usize,
    ) -> Completion {
        CompletionBroker {
            prefix: self.prefix,
            active: self.lang,
            lua: self.lua.as_ref(),
            vim: self.vim.as_ref(),
        }
        .complete_at(line, col)
    }

    /// Highlight class for each styled line (1-based): output ranges by
    /// their class, other continuation lines as `LineCont`.
    pub fn line_highlights(
        &self,
        host: &dyn Host,
    ) -> ReplResult<Vec<(usize, HighlightClass)>> {
        self.ensure_alive(host)?;
        let ranges = self.tracker.ranges(host, self.buf);
        let lines = self.all_lines(host);
        let highlights = lines
            .iter()
            .enumerate()
            .filter_map(|(i, text)| {
                let line = i + 1;
                ranges
                    .iter()
                    .find(|r| r.start <= line && line <= r.end)
                    .map(|r| (line, r.class))
                    .or_else(|| {
                        is_continuation(text, self.marker).then_some((line, HighlightClass::LineCont))
                    })
            })
            .collect();
        Ok(highlights)
    }
}
