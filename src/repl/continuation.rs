//! Line-continuation resolver
//!
//! A logical statement is a head line followed by any number of
//! continuation lines, each starting with the continuation marker.

use super::error::{ReplError, ReplResult};

/// Default continuation marker
pub const DEFAULT_MARKER: char = '\\';

/// One logical statement, as found in the buffer.
///
/// `lines` are raw: markers are still present on continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Raw lines, head first
    pub lines: Vec<String>,
    /// First line (1-based)
    pub start: usize,
    /// Last line (1-based, inclusive)
    pub end: usize,
}

impl Statement {
    /// Whether every line is whitespace once markers are removed
    pub fn is_blank(
        &self,
        marker: char,
    ) -> bool {
        self.lines
            .iter()
            .all(|l| strip_marker(l, marker).trim().is_empty())
    }
}

/// Whether `line` continues the previous line
#[inline]
pub fn is_continuation(
    line: &str,
    marker: char,
) -> bool {
    line.starts_with(marker)
}

/// Remove a leading marker, if any
pub fn strip_marker(
    line: &str,
    marker: char,
) -> &str {
    line.strip_prefix(marker).unwrap_or(line)
}

/// Last line (1-based) of the run of continuation lines following
/// `cursor_line`, or `cursor_line` itself when none follow. `0` for an empty
/// buffer.
pub fn block_end(
    lines: &[String],
    cursor_line: usize,
    marker: char,
) -> usize {
    if lines.is_empty() {
        return 0;
    }
    let mut end = cursor_line.clamp(1, lines.len()) - 1;
    while end + 1 < lines.len() && is_continuation(&lines[end + 1], marker) {
        end += 1;
    }
    end + 1
}

/// Find the statement containing `cursor_line` (1-based).
///
/// `lines` is the whole buffer. Fails with
/// [`ReplError::MalformedContinuation`] when the walk backwards reaches the
/// top of the buffer without finding a head line.
pub fn resolve(
    lines: &[String],
    cursor_line: usize,
    marker: char,
) -> ReplResult<Statement> {
    if lines.is_empty() {
        return Ok(Statement {
            lines: vec![String::new()],
            start: 1,
            end: 1,
        });
    }
    let cursor = cursor_line.clamp(1, lines.len()) - 1;

    let mut start = cursor;
    while is_continuation(&lines[start], marker) {
        if start == 0 {
            return Err(ReplError::MalformedContinuation);
        }
        start -= 1;
    }

    let end = block_end(lines, cursor_line, marker);
    Ok(Statement {
        lines: lines[start..end].to_vec(),
        start: start + 1,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_line() {
        let lines = buf(&["print(1)"]);
        let stmt = resolve(&lines, 1, DEFAULT_MARKER).unwrap();
        assert_eq!(stmt.lines, lines);
        assert_eq!((stmt.start, stmt.end), (1, 1));
    }

    #[test]
    fn test_headless_continuation_is_malformed() {
        let lines = buf(&["\\abc"]);
        assert!(matches!(
            resolve(&lines, 1, DEFAULT_MARKER),
            Err(ReplError::MalformedContinuation)
        ));
    }

    #[test]
    fn test_cursor_on_continuation_line() {
        let lines = buf(&["x = 1", "\\+ 2"]);
        let stmt = resolve(&lines, 2, DEFAULT_MARKER).unwrap();
        assert_eq!(stmt.lines, buf(&["x = 1", "\\+ 2"]));
        assert_eq!((stmt.start, stmt.end), (1, 2));
    }

    #[test]
    fn test_cursor_on_head_walks_forward() {
        let lines = buf(&["out", "a", "\\b", "\\c", "d"]);
        let stmt = resolve(&lines, 2, DEFAULT_MARKER).unwrap();
        assert_eq!(stmt.lines, buf(&["a", "\\b", "\\c"]));
        assert_eq!((stmt.start, stmt.end), (2, 4));
    }

    #[test]
    fn test_block_end() {
        let lines = buf(&["\\a", "\\b", "c", "\\d"]);
        assert_eq!(block_end(&lines, 1, DEFAULT_MARKER), 2);
        assert_eq!(block_end(&lines, 2, DEFAULT_MARKER), 2);
        assert_eq!(block_end(&lines, 3, DEFAULT_MARKER), 4);
        assert_eq!(block_end(&[], 1, DEFAULT_MARKER), 0);
    }

    #[test]
    fn test_custom_marker() {
        let lines = buf(&["a", "|b"]);
        let stmt = resolve(&lines, 1, '|').unwrap();
        assert_eq!((stmt.start, stmt.end), (1, 2));
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("\\+ 2", DEFAULT_MARKER), "+ 2");
        assert_eq!(strip_marker("x", DEFAULT_MARKER), "x");
    }

    #[test]
    fn test_blank_statement() {
        let lines = buf(&["  ", "\\ "]);
        let stmt = resolve(&lines, 1, DEFAULT_MARKER).unwrap();
        assert!(stmt.is_blank(DEFAULT_MARKER));
        let lines = buf(&["  ", "\\ x"]);
        let stmt = resolve(&lines, 1, DEFAULT_MARKER).unwrap();
        assert!(!stmt.is_blank(DEFAULT_MARKER));
    }
}
