//! bufrepl - a buffer-backed REPL engine
//!
//! The REPL transcript lives in an editor buffer. Statements may span
//! several lines joined by a continuation marker; output is written back
//! into the buffer as highlighted ranges that can be navigated, and input
//! goes either to a `/command` or to one of two evaluators (a Lua-flavoured
//! scripting language and a vim-like command language).
//!
//! # Example
//!
//! ```
//! use bufrepl::repl::{Host, MemoryHost, Session};
//! use bufrepl::util::config::ReplConfig;
//!
//! let mut host = MemoryHost::new();
//! let mut session = Session::new(1, &ReplConfig::default());
//! host.set_lines(1, 0..1, vec!["1 + 2".to_string()]);
//! session.submit(&mut host, 1).unwrap();
//! assert_eq!(host.lines(1), &["1 + 2", "3", ""]);
//! ```

#![warn(rust_2018_idioms)]

pub mod repl;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};

use tracing::debug;

use crate::repl::line::{LineDriver, Step};
use crate::repl::ranges::HighlightClass;
use crate::util::config::ReplConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name
pub const NAME: &str = "bufrepl";

/// Feed `source` line by line through a fresh session and collect the
/// styled output.
///
/// # Example
///
/// ```
/// use bufrepl::{run, util::config::ReplConfig};
///
/// let output = run("x = 2\nprint(x * 3)", &ReplConfig::default()).unwrap();
/// assert_eq!(output[0].1, "6");
/// ```
pub fn run(
    source: &str,
    config: &ReplConfig,
) -> Result<Vec<(HighlightClass, String)>> {
    debug!(lines = source.lines().count(), "run source");
    let mut driver = LineDriver::new(config);
    let mut output = Vec::new();
    for line in source.lines() {
        match driver.feed(line)? {
            Step::More => {}
            Step::Output(lines) => output.extend(lines),
            Step::Quit => break,
        }
    }
    if driver.is_continuing() {
        anyhow::bail!("source ends inside a continued statement");
    }
    Ok(output)
}
