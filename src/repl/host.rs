//! Host editor surface
//!
//! The session engine never owns text. It reads and writes lines, marks and
//! the "current" buffer/window through [`Host`], which an embedding editor
//! implements. [`MemoryHost`] is a self-contained implementation used by the
//! line REPL and by tests.

use std::collections::HashMap;
use std::ops::Range;

use super::ranges::OutputRange;

/// Opaque buffer handle. `0` means "none".
pub type BufferId = u32;

/// Opaque window handle. `0` means "none".
pub type WindowId = u32;

/// Editor operations the session engine depends on.
///
/// Line ranges are 0-based and half-open, mirroring how editors usually
/// expose line storage. Marks use 1-based inclusive lines.
pub trait Host {
    /// Whether `buf` still refers to a live buffer
    fn buffer_valid(
        &self,
        buf: BufferId,
    ) -> bool;

    /// Whether `win` still refers to a live window
    fn window_valid(
        &self,
        win: WindowId,
    ) -> bool;

    /// Number of lines in `buf` (0 for an invalid buffer)
    fn line_count(
        &self,
        buf: BufferId,
    ) -> usize;

    /// Lines in `range`, clamped to the buffer
    fn get_lines(
        &self,
        buf: BufferId,
        range: Range<usize>,
    ) -> Vec<String>;

    /// Replace the lines in `range` with `lines`.
    ///
    /// Marks fully inside a replaced region are dropped; marks after it move
    /// by the line delta.
    fn set_lines(
        &mut self,
        buf: BufferId,
        range: Range<usize>,
        lines: Vec<String>,
    );

    /// The current buffer and window
    fn current(&self) -> (BufferId, WindowId);

    /// Make `buf` and `win` current. `0` leaves that half unchanged.
    fn set_current(
        &mut self,
        buf: BufferId,
        win: WindowId,
    );

    /// Store an output mark
    fn put_mark(
        &mut self,
        buf: BufferId,
        mark: OutputRange,
    );

    /// All marks of `buf`, in no particular order
    fn marks(
        &self,
        buf: BufferId,
    ) -> Vec<OutputRange>;

    /// Remove every mark of `buf`
    fn clear_marks(
        &mut self,
        buf: BufferId,
    );

    /// Destroy `buf`
    fn delete_buffer(
        &mut self,
        buf: BufferId,
    );
}

#[derive(Debug, Clone)]
struct MemBuffer {
    lines: Vec<String>,
    marks: Vec<OutputRange>,
}

impl MemBuffer {
    fn new(lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        Self {
            lines,
            marks: Vec::new(),
        }
    }

    /// Extmark-style adjustment after `removed` rows starting at `at` were
    /// replaced by `inserted` rows.
    fn shift_marks(
        &mut self,
        at: usize,
        removed: usize,
        inserted: usize,
    ) {
        let delta = inserted as isize - removed as isize;
        let region_end = at + removed;
        let shift = |line: usize| (line as isize + delta).max(1) as usize;

        self.marks.retain_mut(|mark| {
            let start = mark.start - 1;
            let end = mark.end - 1;

            if removed == 0 {
                if start >= at {
                    mark.start = shift(mark.start);
                    mark.end = shift(mark.end);
                } else if end >= at {
                    mark.end = shift(mark.end);
                }
                return true;
            }

            if start >= at && end < region_end {
                return false;
            }
            if start >= region_end {
                mark.start = shift(mark.start);
                mark.end = shift(mark.end);
            } else if start < at && end >= region_end {
                mark.end = shift(mark.end);
            } else if start < at {
                // tail of the mark was overwritten
                mark.end = at;
            } else {
                // head of the mark was overwritten
                mark.start = at + inserted + 1;
                mark.end = shift(mark.end);
            }
            mark.start <= mark.end
        });
    }
}

/// In-memory [`Host`].
///
/// Starts with buffer 1 (one empty line) shown in window 1.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    buffers: HashMap<BufferId, MemBuffer>,
    windows: HashMap<WindowId, BufferId>,
    current: (BufferId, WindowId),
    next_buffer: BufferId,
    next_window: WindowId,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Create a host with one buffer and one window
    pub fn new() -> Self {
        let mut host = Self {
            buffers: HashMap::new(),
            windows: HashMap::new(),
            current: (0, 0),
            next_buffer: 1,
            next_window: 1,
        };
        let buf = host.create_buffer(Vec::new());
        let win = host.create_window(buf);
        host.current = (buf, win);
        host
    }

    /// Create a buffer holding `lines`
    pub fn create_buffer(
        &mut self,
        lines: Vec<String>,
    ) -> BufferId {
        let id = self.next_buffer;
        self.next_buffer += 1;
        self.buffers.insert(id, MemBuffer::new(lines));
        id
    }

    /// Open a window on `buf`
    pub fn create_window(
        &mut self,
        buf: BufferId,
    ) -> WindowId {
        let id = self.next_window;
        self.next_window += 1;
        self.windows.insert(id, buf);
        id
    }

    /// Close `win`
    pub fn close_window(
        &mut self,
        win: WindowId,
    ) {
        self.windows.remove(&win);
    }

    /// All lines of `buf`
    pub fn lines(
        &self,
        buf: BufferId,
    ) -> &[String] {
        self.buffers
            .get(&buf)
            .map(|b| b.lines.as_slice())
            .unwrap_or(&[])
    }
}

impl Host for MemoryHost {
    fn buffer_valid(
        &self,
        buf: BufferId,
    ) -> bool {
        self.buffers.contains_key(&buf)
    }

    fn window_valid(
        &self,
        win: WindowId,
    ) -> bool {
        self.windows.contains_key(&win)
    }

    fn line_count(
        &self,
        buf: BufferId,
    ) -> usize {
        self.lines(buf).len()
    }

    fn get_lines(
        &self,
        buf: BufferId,
        range: Range<usize>,
    ) -> Vec<String> {
        let lines = self.lines(buf);
        let end = range.end.min(lines.len());
        let start = range.start.min(end);
        lines[start..end].to_vec()
    }

    fn set_lines(
        &mut self,
        buf: BufferId,
        range: Range<usize>,
        lines: Vec<String>,
    ) {
        let Some(buffer) = self.buffers.get_mut(&buf) else {
            return;
        };
        let end = range.end.min(buffer.lines.len());
        let start = range.start.min(end);
        let inserted = lines.len();
        buffer.lines.splice(start..end, lines);
        buffer.shift_marks(start, end - start, inserted);
        if buffer.lines.is_empty() {
            buffer.lines.push(String::new());
        }
    }

    fn current(&self) -> (BufferId, WindowId) {
        self.current
    }

    fn set_current(
        &mut self,
        buf: BufferId,
        win: WindowId,
    ) {
        if win != 0 && self.window_valid(win) {
            self.current.1 = win;
        }
        if buf != 0 && self.buffer_valid(buf) {
            self.current.0 = buf;
            if let Some(shown) = self.windows.get_mut(&self.current.1) {
                *shown = buf;
            }
        }
    }

    fn put_mark(
        &mut self,
        buf: BufferId,
        mark: OutputRange,
    ) {
        if let Some(buffer) = self.buffers.get_mut(&buf) {
            buffer.marks.push(mark);
        }
    }

    fn marks(
        &self,
        buf: BufferId,
    ) -> Vec<OutputRange> {
        self.buffers
            .get(&buf)
            .map(|b| b.marks.clone())
            .unwrap_or_default()
    }

    fn clear_marks(
        &mut self,
        buf: BufferId,
    ) {
        if let Some(buffer) = self.buffers.get_mut(&buf) {
            buffer.marks.clear();
        }
    }

    fn delete_buffer(
        &mut self,
        buf: BufferId,
    ) {
        self.buffers.remove(&buf);
        self.windows.retain(|_, shown| *shown != buf);
        if self.current.0 == buf {
            self.current.0 = 0;
        }
        if !self.windows.contains_key(&self.current.1) {
            self.current.1 = 0;
        }
    }
}
