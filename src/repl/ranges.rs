//! Output range tracker
//!
//! Every chunk of output an evaluation appends is recorded as a tagged line
//! range in the host's mark store. The store gives no ordering guarantee, so
//! every query sorts before it reasons about neighbours.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::host::{BufferId, Host};

/// Display style of an output chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightClass {
    /// Errors and diagnostics
    Error,
    /// Printed output
    Output,
    /// The value an expression produced
    Value,
    /// Informational messages from meta-commands
    Info,
    /// The continuation marker at the start of a line
    LineCont,
}

impl HighlightClass {
    /// Highlight group name an editor would link to
    pub fn group(self) -> &'static str {
        match self {
            HighlightClass::Error => "ReplError",
            HighlightClass::Output => "ReplOutput",
            HighlightClass::Value => "ReplValue",
            HighlightClass::Info => "ReplInfo",
            HighlightClass::LineCont => "ReplLineCont",
        }
    }
}

/// A registered output range (1-based, inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputRange {
    /// Unique id, never 0
    pub id: u32,
    /// First line
    pub start: usize,
    /// Last line
    pub end: usize,
    /// Display style
    pub class: HighlightClass,
}

/// One piece of the buffer partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Lines between outputs. May be zero-width (`start == end + 1`).
    Gap {
        /// First line
        start: usize,
        /// Last line
        end: usize,
    },
    /// A registered output range
    Output(OutputRange),
}

impl Segment {
    /// First line
    pub fn start(&self) -> usize {
        match self {
            Segment::Gap { start, .. } => *start,
            Segment::Output(r) => r.start,
        }
    }

    /// Last line
    pub fn end(&self) -> usize {
        match self {
            Segment::Gap { end, .. } => *end,
            Segment::Output(r) => r.end,
        }
    }

    /// Whether `line` falls inside this segment
    pub fn contains(
        &self,
        line: usize,
    ) -> bool {
        self.start() <= line && line <= self.end()
    }
}

/// Issues mark ids and answers navigation queries.
#[derive(Debug, Clone)]
pub struct OutputTracker {
    next_id: u32,
}

impl Default for OutputTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTracker {
    /// Create a tracker whose first id is 1
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// The id the next registration will receive
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Register lines `start..=end` of `buf` as output of `class`
    pub fn put(
        &mut self,
        host: &mut dyn Host,
        buf: BufferId,
        start: usize,
        end: usize,
        class: HighlightClass,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        host.put_mark(
            buf,
            OutputRange {
                id,
                start,
                end,
                class,
            },
        );
        id
    }

    /// Drop every range and restart ids at 1
    pub fn clear(
        &mut self,
        host: &mut dyn Host,
        buf: BufferId,
    ) {
        host.clear_marks(buf);
        self.next_id = 1;
    }

    /// Registered ranges in ascending line order
    pub fn ranges(
        &self,
        host: &dyn Host,
        buf: BufferId,
    ) -> Vec<OutputRange> {
        let mut ranges = host.marks(buf);
        ranges.sort_by_key(|r| (r.start, r.end, r.id));
        ranges
    }

    /// Line below which new text can go without landing inside a range.
    ///
    /// A line inside a range, other than its last, moves to that range's
    /// last line.
    pub fn insertion_point(
        &self,
        host: &dyn Host,
        buf: BufferId,
        after: usize,
    ) -> usize {
        self.ranges(host, buf)
            .iter()
            .find(|r| r.start <= after && after < r.end)
            .map_or(after, |r| r.end)
    }

    /// Split lines `1..=last_line` into alternating gaps and outputs,
    /// starting and ending with a gap.
    pub fn partition(
        &self,
        host: &dyn Host,
        buf: BufferId,
    ) -> Vec<Segment> {
        let last_line = host.line_count(buf);
        let mut segments = Vec::new();
        let mut next = 1;
        for range in self.ranges(host, buf) {
            segments.push(Segment::Gap {
                start: next,
                end: range.start.saturating_sub(1),
            });
            segments.push(Segment::Output(range));
            next = range.end + 1;
        }
        segments.push(Segment::Gap {
            start: next,
            end: last_line,
        });
        segments
    }

    /// Line to jump to when moving `count` output blocks.
    ///
    /// Lands on the start of the target block, or its end with `to_end`.
    /// When the cursor sits inside a block and that block's edge in the
    /// travel direction is still ahead, the edge itself is the first step.
    /// Targets are clamped to the first/last block and never move against
    /// the travel direction.
    pub fn goto(
        &self,
        host: &dyn Host,
        buf: BufferId,
        backward: bool,
        to_end: bool,
        count: usize,
        current_line: usize,
    ) -> usize {
        let count = count.max(1);
        let last_line = host.line_count(buf).max(1);
        let outputs: Vec<OutputRange> = self
            .partition(host, buf)
            .into_iter()
            .filter_map(|seg| match seg {
                Segment::Output(r) => Some(r),
                Segment::Gap { .. } => None,
            })
            .collect();

        if outputs.is_empty() {
            return if backward { 1 } else { last_line };
        }

        let edge = |r: &OutputRange| if to_end { r.end } else { r.start };
        let inside = outputs.iter().position(|r| r.start <= current_line && current_line <= r.end);
        // outputs entirely above the cursor
        let above = outputs.iter().filter(|r| r.end < current_line).count() as isize;
        let count = count as isize;

        let target = match (inside, backward) {
            (Some(i), false) => {
                let i = i as isize;
                if to_end && current_line < outputs[i as usize].end {
                    i + count - 1
                } else {
                    i + count
                }
            }
            (Some(i), true) => {
                let i = i as isize;
                if !to_end && current_line > outputs[i as usize].start {
                    i - (count - 1)
                } else {
                    i - count
                }
            }
            (None, false) => above + count - 1,
            (None, true) => above - count,
        };

        let target = target.clamp(0, outputs.len() as isize - 1) as usize;
        let line = edge(&outputs[target]);
        debug!(backward, to_end, count, current_line, line, "goto output");

        let against_travel = if backward {
            line > current_line
        } else {
            line < current_line
        };
        if against_travel { current_line } else { line }
    }
}
