//! REPL Completer
//!
//! Bridges rustyline's completion request to the session's completion
//! broker.

use std::cell::RefCell;
use std::rc::Rc;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use crate::repl::session::Session;

/// REPL Completer
///
/// Shares the session with the line driver; completion only borrows it
/// between reads.
pub struct ReplCompleter {
    session: Rc<RefCell<Session>>,
}

impl ReplCompleter {
    /// Create a completer for `session`
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        Self { session }
    }

    /// Candidates for `line` with the cursor at byte `pos`, as a 0-based
    /// replacement start
    pub fn candidates(
        &self,
        line: &str,
        pos: usize,
    ) -> (usize, Vec<Pair>) {
        let completion = self.session.borrow().complete_at(line, pos);
        if completion.is_empty() {
            return (pos, Vec::new());
        }
        let start = completion.offset.saturating_sub(1);
        let pairs = completion
            .candidates
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        (start, pairs)
    }
}

impl Completer for ReplCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Helper for ReplCompleter {}

impl Highlighter for ReplCompleter {}

impl Validator for ReplCompleter {}

impl Hinter for ReplCompleter {
    type Hint = String;
}
