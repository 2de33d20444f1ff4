//! Line-based REPL with rustyline
//!
//! Drives a [`Session`] over an in-memory buffer from a terminal. Typed
//! lines are written into the buffer; a line ending in the continuation
//! marker continues the statement on the next prompt.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use owo_colors::OwoColorize;
use rustyline::config::Config;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{CompletionType, EditMode, Editor};
use thiserror::Error;
use tracing::debug;

use crate::repl::error::{ReplError, ReplResult};
use crate::repl::host::{BufferId, Host, MemoryHost};
use crate::repl::ranges::HighlightClass;
use crate::repl::session::Session;
use crate::util::config::ReplConfig;

mod completer;
pub use completer::ReplCompleter;

/// Line REPL configuration
#[derive(Debug, Clone)]
pub struct LineReplConfig {
    /// Prompt to display
    pub prompt: String,
    /// Prompt for continued statements
    pub continuation_prompt: String,
    /// Enable VI mode
    pub vi_mode: bool,
    /// History file path
    pub history_file: Option<PathBuf>,
    /// Colour output by highlight class
    pub colors: bool,
}

impl Default for LineReplConfig {
    fn default() -> Self {
        Self {
            prompt: ">> ".into(),
            continuation_prompt: ".. ".into(),
            vi_mode: false,
            history_file: None,
            colors: true,
        }
    }
}

/// Line REPL errors
#[derive(Debug, Error)]
pub enum LineError {
    #[error("readline error: {0}")]
    Readline(#[from] ReadlineError),
    #[error(transparent)]
    Session(#[from] ReplError),
}

/// Result of feeding one typed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The statement continues on the next line
    More,
    /// The statement ran; styled output lines in order
    Output(Vec<(HighlightClass, String)>),
    /// The session ended
    Quit,
}

/// Applies typed lines to a session buffer, independent of the terminal
pub struct LineDriver {
    host: MemoryHost,
    session: Rc<RefCell<Session>>,
    buf: BufferId,
    /// First line of the statement being typed
    start: usize,
    /// Line receiving input
    cursor: usize,
}

impl LineDriver {
    /// Start a session on a fresh in-memory buffer
    pub fn new(config: &ReplConfig) -> Self {
        let host = MemoryHost::new();
        let buf = host.current().0;
        let session = Session::new(buf, config);
        Self {
            host,
            session: Rc::new(RefCell::new(session)),
            buf,
            start: 1,
            cursor: 1,
        }
    }

    /// Shared handle to the session
    pub fn session(&self) -> Rc<RefCell<Session>> {
        Rc::clone(&self.session)
    }

    pub fn host(&self) -> &MemoryHost {
        &self.host
    }

    /// Whether a statement is partially typed
    pub fn is_continuing(&self) -> bool {
        self.cursor > self.start
    }

    /// Append `text` to the input line and submit unless it ends with the
    /// continuation marker.
    pub fn feed(
        &mut self,
        text: &str,
    ) -> ReplResult<Step> {
        let mut session = self.session.borrow_mut();
        let (body, more) = match text.strip_suffix(session.marker()) {
            Some(body) => (body, true),
            None => (text, false),
        };

        let existing = self
            .host
            .get_lines(self.buf, self.cursor - 1..self.cursor)
            .pop()
            .unwrap_or_default();
        let line = format!("{}{}", existing, body);
        let col = line.len();
        self.host
            .set_lines(self.buf, self.cursor - 1..self.cursor, vec![line]);

        if more {
            self.cursor = session.break_line(&mut self.host, self.cursor, col)?;
            return Ok(Step::More);
        }

        let submitted = self.cursor;
        let outcome = session.submit(&mut self.host, submitted)?;
        if outcome.quit {
            debug!("line driver quit");
            return Ok(Step::Quit);
        }

        let lines = self.host.lines(self.buf);
        let output = session
            .line_highlights(&self.host)?
            .into_iter()
            .filter(|&(line, class)| line > submitted && class != HighlightClass::LineCont)
            .map(|(line, class)| (class, lines[line - 1].clone()))
            .collect();

        // continue typing on an empty last line
        let count = self.host.line_count(self.buf);
        let last_blank = self.host.lines(self.buf).last().map_or(true, String::is_empty);
        self.cursor = if outcome.cursor_line == count && last_blank {
            count
        } else {
            self.host
                .set_lines(self.buf, count..count, vec![String::new()]);
            count + 1
        };
        self.start = self.cursor;
        Ok(Step::Output(output))
    }

    /// Discard the statement being typed
    pub fn cancel(&mut self) {
        let count = self.host.line_count(self.buf);
        self.host
            .set_lines(self.buf, self.start - 1..count, vec![String::new()]);
        self.cursor = self.start;
    }
}

/// Render `text` in the style of `class`
pub fn paint(
    class: HighlightClass,
    text: &str,
    colors: bool,
) -> String {
    if !colors {
        return text.to_string();
    }
    match class {
        HighlightClass::Error => text.red().to_string(),
        HighlightClass::Value => text.green().to_string(),
        HighlightClass::Info => text.cyan().to_string(),
        HighlightClass::LineCont => text.dimmed().to_string(),
        HighlightClass::Output => text.to_string(),
    }
}

/// Line REPL
///
/// A terminal front end with rustyline editing and history.
pub struct LineRepl {
    /// Configuration
    config: LineReplConfig,
    /// rustyline editor
    editor: Editor<ReplCompleter, FileHistory>,
    /// Buffer and session state
    driver: LineDriver,
}

impl LineRepl {
    /// Create a line REPL.
    ///
    /// Tab completion is bound unless `repl.no_defaults` is set.
    pub fn new(
        repl: &ReplConfig,
        config: LineReplConfig,
    ) -> Result<Self, LineError> {
        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(if config.vi_mode {
                EditMode::Vi
            } else {
                EditMode::Emacs
            })
            .build();

        let driver = LineDriver::new(repl);
        let mut editor = Editor::with_config(rl_config)?;
        if !repl.no_defaults {
            editor.set_helper(Some(ReplCompleter::new(driver.session())));
        }

        // Load history if file exists
        if let Some(ref history_file) = config.history_file {
            if history_file.exists() {
                let _ = editor.load_history(history_file);
            }
        }

        Ok(Self {
            config,
            editor,
            driver,
        })
    }

    /// Run the REPL
    pub fn run(&mut self) -> Result<(), LineError> {
        let prefix = self.driver.session.borrow().prefix();
        println!("{} {} - Type {}help for assistance", crate::NAME, crate::VERSION, prefix);
        println!("Press Ctrl+D or {}quit to exit\n", prefix);

        loop {
            let prompt = if self.driver.is_continuing() {
                &self.config.continuation_prompt
            } else {
                &self.config.prompt
            };

            match self.editor.readline(prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    match self.driver.feed(&line)? {
                        Step::More => continue,
                        Step::Quit => break,
                        Step::Output(lines) => {
                            for (class, text) in lines {
                                println!("{}", paint(class, &text, self.config.colors));
                            }
                        }
                    }
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl-D pressed
                    break;
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl-C pressed
                    println!("(Interrupted)");
                    self.driver.cancel();
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Save history
        if let Some(ref history_file) = self.config.history_file {
            let _ = self.editor.save_history(history_file);
        }

        Ok(())
    }

    pub fn driver(&self) -> &LineDriver {
        &self.driver
    }
}
