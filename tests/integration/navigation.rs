//! Output navigation integration tests

use bufrepl::repl::{HighlightClass, Host, MemoryHost, OutputTracker, Segment};

/// Ranges [3,5] and [9,9] on a 12-line buffer
fn setup() -> (MemoryHost, OutputTracker) {
    let mut host = MemoryHost::new();
    host.set_lines(1, 0..1, (1..=12).map(|i| format!("line {}", i)).collect());
    let mut tracker = OutputTracker::new();
    tracker.put(&mut host, 1, 3, 5, HighlightClass::Output);
    tracker.put(&mut host, 1, 9, 9, HighlightClass::Value);
    (host, tracker)
}

#[test]
fn test_forward_to_first_output() {
    let (host, tracker) = setup();
    assert_eq!(tracker.goto(&host, 1, false, false, 1, 1), 3);
}

#[test]
fn test_forward_to_end_of_current() {
    let (host, tracker) = setup();
    assert_eq!(tracker.goto(&host, 1, false, true, 1, 4), 5);
    assert_eq!(tracker.goto(&host, 1, false, true, 1, 5), 9);
}

#[test]
fn test_count_clamps() {
    let (host, tracker) = setup();
    assert_eq!(tracker.goto(&host, 1, false, false, 10, 1), 9);
    assert_eq!(tracker.goto(&host, 1, true, false, 10, 12), 3);
}

#[test]
fn test_backward() {
    let (host, tracker) = setup();
    assert_eq!(tracker.goto(&host, 1, true, false, 1, 12), 9);
    assert_eq!(tracker.goto(&host, 1, true, false, 1, 4), 3);
    assert_eq!(tracker.goto(&host, 1, true, false, 1, 3), 3);
}

#[test]
fn test_partition_alternates() {
    let (host, tracker) = setup();
    let segments = tracker.partition(&host, 1);
    assert_eq!(segments.len(), 5);
    assert_eq!(segments[0], Segment::Gap { start: 1, end: 2 });
    assert!(matches!(segments[3], Segment::Output(r) if r.start == 9));
    assert_eq!(segments[4], Segment::Gap { start: 10, end: 12 });
}

#[test]
fn test_ranges_follow_edits() {
    let (mut host, tracker) = setup();
    // two lines inserted above the first range
    host.set_lines(1, 0..0, vec!["a".to_string(), "b".to_string()]);
    let ranges = tracker.ranges(&host, 1);
    assert_eq!((ranges[0].start, ranges[0].end), (5, 7));
    assert_eq!((ranges[1].start, ranges[1].end), (11, 11));
    assert_eq!(tracker.goto(&host, 1, false, false, 1, 1), 5);
}
