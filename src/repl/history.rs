//! History ring
//!
//! Fixed-capacity log of submitted statements with chronological recall.
//! Navigating away from an unsubmitted edit saves it, so walking back and
//! forward again restores exactly what was typed.

use std::collections::VecDeque;

use tracing::trace;

/// Default ring capacity
pub const DEFAULT_HISTORY_SIZE: usize = 1000;

/// Navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards older entries
    Backward,
    /// Towards newer entries and finally the live edit
    Forward,
}

/// History ring of logical statements
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Vec<String>>,
    capacity: usize,
    /// Index into `entries` while navigating; `None` at the live edit
    pos: Option<usize>,
    /// The live edit saved when navigation started
    saved: Option<Vec<String>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl History {
    /// Create a ring holding at most `capacity` entries (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            pos: None,
            saved: None,
        }
    }

    /// Record a submitted statement, evicting the oldest entries if full
    pub fn append(
        &mut self,
        statement: Vec<String>,
    ) {
        self.entries.push_back(statement);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.reset_pos();
    }

    /// Step through the ring.
    ///
    /// `current` is what the caller currently displays for the statement
    /// under the cursor. The returned lines always replace it wholesale.
    pub fn move_cursor(
        &mut self,
        direction: Direction,
        current: &[String],
    ) -> Vec<String> {
        let next = match (direction, self.pos) {
            (Direction::Backward, None) => {
                if self.entries.is_empty() {
                    return current.to_vec();
                }
                self.saved = Some(current.to_vec());
                Some(self.entries.len() - 1)
            }
            (Direction::Backward, Some(0)) => return current.to_vec(),
            (Direction::Backward, Some(i)) => Some(i - 1),
            (Direction::Forward, None) => return current.to_vec(),
            (Direction::Forward, Some(i)) if i + 1 < self.entries.len() => Some(i + 1),
            (Direction::Forward, Some(_)) => None,
        };

        trace!(?direction, from = ?self.pos, to = ?next, "history move");
        self.pos = next;
        match next {
            Some(i) => self.entries[i].clone(),
            None => self.saved.take().unwrap_or_else(|| vec![String::new()]),
        }
    }

    /// Forget the navigation cursor and the saved edit
    pub fn reset_pos(&mut self) {
        self.pos = None;
        self.saved = None;
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ring is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the user is currently browsing history
    pub fn is_navigating(&self) -> bool {
        self.pos.is_some()
    }

    /// Stored entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &[String]> {
        self.entries.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stmt(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_back_then_forward_restores_live_edit() {
        let mut history = History::new(10);
        history.append(stmt(&["a = 1"]));
        history.append(stmt(&["print(a)", "\\, 2"]));

        let live = stmt(&["half typed"]);
        assert_eq!(
            history.move_cursor(Direction::Backward, &live),
            stmt(&["print(a)", "\\, 2"])
        );
        assert_eq!(
            history.move_cursor(Direction::Backward, &[]),
            stmt(&["a = 1"])
        );
        let shown = stmt(&["a = 1"]);
        assert_eq!(history.move_cursor(Direction::Backward, &shown), shown);
        assert_eq!(
            history.move_cursor(Direction::Forward, &shown),
            stmt(&["print(a)", "\\, 2"])
        );
        assert_eq!(history.move_cursor(Direction::Forward, &shown), live);
        assert!(!history.is_navigating());
    }

    #[test]
    fn test_forward_without_navigation_is_noop() {
        let mut history = History::new(10);
        history.append(stmt(&["x"]));
        let live = stmt(&["y"]);
        assert_eq!(history.move_cursor(Direction::Forward, &live), live);
    }

    #[test]
    fn test_empty_ring_backward_is_noop() {
        let mut history = History::new(10);
        let live = stmt(&["y"]);
        assert_eq!(history.move_cursor(Direction::Backward, &live), live);
        assert!(!history.is_navigating());
    }

    #[test]
    fn test_append_resets_navigation() {
        let mut history = History::new(10);
        history.append(stmt(&["x"]));
        history.move_cursor(Direction::Backward, &stmt(&[""]));
        history.append(stmt(&["z"]));
        assert!(!history.is_navigating());
        assert_eq!(
            history.move_cursor(Direction::Backward, &stmt(&[""])),
            stmt(&["z"])
        );
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = History::new(2);
        history.append(stmt(&["1"]));
        history.append(stmt(&["2"]));
        history.append(stmt(&["3"]));
        assert_eq!(history.len(), 2);
        let first: Vec<_> = history.entries().map(|e| e.to_vec()).collect();
        assert_eq!(first, vec![stmt(&["2"]), stmt(&["3"])]);
    }

    proptest! {
        #[test]
        fn prop_len_bounded_by_capacity(capacity in 1usize..20, count in 0usize..50) {
            let mut history = History::new(capacity);
            for i in 0..count {
                history.append(vec![i.to_string()]);
            }
            prop_assert_eq!(history.len(), count.min(capacity));
        }

        #[test]
        fn prop_round_trip_restores_edit(
            entries in prop::collection::vec(prop::collection::vec(".{0,8}", 1..4), 1..10),
            live in prop::collection::vec(".{0,8}", 1..4),
        ) {
            let mut history = History::new(5);
            for entry in entries {
                history.append(entry);
            }
            history.move_cursor(Direction::Backward, &live);
            let shown = history.move_cursor(Direction::Forward, &[]);
            prop_assert_eq!(shown, live);
        }
    }
}
