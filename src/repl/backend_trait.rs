//! REPL Backend Trait
//!
//! Defines the contract every pluggable evaluator satisfies, and the
//! scoped execution context an evaluation runs in.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::host::{BufferId, Host, WindowId};
use super::ranges::HighlightClass;

/// Which evaluator handles plain (non-command) input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// The scripting language
    #[default]
    Lua,
    /// The vim-like command language
    Vim,
}

impl fmt::Display for Language {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Language::Lua => write!(f, "lua"),
            Language::Vim => write!(f, "vim"),
        }
    }
}

/// Evaluation result
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// Finished; output (if any) went through the context
    Ok,
    /// Finished with a value to show in the value style
    Value(String),
    /// Finished, and no fresh input line should follow
    Hold,
    /// Evaluation failed
    Error(String),
}

/// Completion answer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// 1-based column where the replacement starts
    pub offset: usize,
    /// Candidate replacements
    pub candidates: Vec<String>,
}

impl Completion {
    /// No completion
    pub fn none() -> Self {
        Self::default()
    }

    /// Candidates replacing text from `offset`
    pub fn new(
        offset: usize,
        candidates: Vec<String>,
    ) -> Self {
        Self { offset, candidates }
    }

    /// Whether there is nothing to offer
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A run of output lines sharing one highlight class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Display style
    pub class: HighlightClass,
    /// Lines, without indentation
    pub lines: Vec<String>,
}

/// Collects output in emission order, merging consecutive lines of the
/// same class into one chunk.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    chunks: Vec<OutputChunk>,
}

impl OutputSink {
    /// Append `text`, split on newlines
    pub fn push(
        &mut self,
        class: HighlightClass,
        text: &str,
    ) {
        let lines = text.split('\n').map(|l| l.trim_end_matches('\r').to_string());
        match self.chunks.last_mut() {
            Some(chunk) if chunk.class == class => chunk.lines.extend(lines),
            _ => self.chunks.push(OutputChunk {
                class,
                lines: lines.collect(),
            }),
        }
    }

    /// Append everything `other` collected
    pub fn extend(
        &mut self,
        other: OutputSink,
    ) {
        for chunk in other.chunks {
            self.push(chunk.class, &chunk.lines.join("\n"));
        }
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The collected chunks
    pub fn into_chunks(self) -> Vec<OutputChunk> {
        self.chunks
    }
}

/// Makes a buffer/window current for the guard's lifetime and restores the
/// previous pair when dropped, whichever way the evaluation exits.
pub struct ContextGuard<'a> {
    host: &'a mut dyn Host,
    saved: (BufferId, WindowId),
}

impl<'a> ContextGuard<'a> {
    /// Redirect to `buf`/`win`; `0` keeps the current one
    pub fn enter(
        host: &'a mut dyn Host,
        buf: BufferId,
        win: WindowId,
    ) -> Self {
        let saved = host.current();
        if buf != 0 || win != 0 {
            trace!(buf, win, ?saved, "enter eval context");
            host.set_current(buf, win);
        }
        Self { host, saved }
    }
}

impl<'a> Deref for ContextGuard<'a> {
    type Target = dyn Host + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.host
    }
}

impl<'a> DerefMut for ContextGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.host
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if self.host.current() != self.saved {
            trace!(saved = ?self.saved, "restore eval context");
            self.host.set_current(self.saved.0, self.saved.1);
        }
    }
}

/// What an evaluator sees while it runs
pub struct EvalContext<'a> {
    host: &'a mut dyn Host,
    output: OutputSink,
    inspect: bool,
}

impl<'a> EvalContext<'a> {
    /// Wrap an (already redirected) host
    pub fn new(
        host: &'a mut dyn Host,
        inspect: bool,
    ) -> Self {
        Self {
            host,
            output: OutputSink::default(),
            inspect,
        }
    }

    /// Emit printed output
    pub fn print(
        &mut self,
        text: &str,
    ) {
        self.output.push(HighlightClass::Output, text);
    }

    /// Emit output in a specific style
    pub fn emit(
        &mut self,
        class: HighlightClass,
        text: &str,
    ) {
        self.output.push(class, text);
    }

    /// Whether intermediate values should be shown
    pub fn inspect(&self) -> bool {
        self.inspect
    }

    /// Buffer that is current for this evaluation
    pub fn current_buffer(&self) -> BufferId {
        self.host.current().0
    }

    /// Window that is current for this evaluation
    pub fn current_window(&self) -> WindowId {
        self.host.current().1
    }

    /// Collected output
    pub fn into_output(self) -> OutputSink {
        self.output
    }
}

/// REPL Backend Trait
///
/// Implemented by each language evaluator the session can route to.
pub trait ReplBackend {
    /// Language this backend evaluates
    fn language(&self) -> Language;

    /// Run `program` (continuation markers already stripped)
    fn eval(
        &mut self,
        program: &[String],
        ctx: &mut EvalContext<'_>,
    ) -> EvalResult;

    /// Complete `text`, the line up to the cursor
    fn complete(
        &self,
        text: &str,
    ) -> Completion;

    /// Remove evaluator-internal location noise from an error message
    fn clean_error(
        &self,
        message: &str,
    ) -> String {
        message.to_string()
    }
}
