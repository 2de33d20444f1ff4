//! History recall through the session

use bufrepl::repl::{Host, MemoryHost, Session};
use bufrepl::util::config::ReplConfig;

fn submit(
    session: &mut Session,
    host: &mut MemoryHost,
    line: usize,
    text: &[&str],
) -> usize {
    host.set_lines(1, line - 1..line, text.iter().map(|s| s.to_string()).collect());
    let last = line + text.len() - 1;
    session.submit(host, last).unwrap().cursor_line
}

#[test]
fn test_recall_and_restore_live_edit() {
    let mut host = MemoryHost::new();
    let mut session = Session::new(1, &ReplConfig::default());
    let line = submit(&mut session, &mut host, 1, &["x = 1", "\\+ 1"]);
    let line = submit(&mut session, &mut host, line, &["print(x)"]);

    host.set_lines(1, line - 1..line, vec!["half typed".to_string()]);
    let cursor = session.history_move(&mut host, line, true).unwrap();
    assert_eq!(host.lines(1)[line - 1], "print(x)");
    assert_eq!(cursor, line);

    // the older entry spans two lines; cursor lands on its last line
    let cursor = session.history_move(&mut host, cursor, true).unwrap();
    assert_eq!(host.lines(1)[line - 1..line + 1], ["x = 1", "\\+ 1"]);
    assert_eq!(cursor, line + 1);

    // walking past the oldest entry changes nothing
    let same = session.history_move(&mut host, cursor, true).unwrap();
    assert_eq!(same, cursor);

    let cursor = session.history_move(&mut host, cursor, false).unwrap();
    assert_eq!(host.lines(1)[cursor - 1], "print(x)");
    let cursor = session.history_move(&mut host, cursor, false).unwrap();
    assert_eq!(host.lines(1)[cursor - 1], "half typed");
    assert_eq!(host.lines(1).len(), line);
}

#[test]
fn test_capacity_from_config() {
    let mut host = MemoryHost::new();
    let config = ReplConfig {
        history_size: 2,
        ..ReplConfig::default()
    };
    let mut session = Session::new(1, &config);
    let mut line = 1;
    for text in ["1", "2", "3"] {
        line = submit(&mut session, &mut host, line, &[text]);
    }
    let entries: Vec<&[String]> = session.history().entries().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], ["2"]);
}

#[test]
fn test_blank_and_malformed_statements_are_not_recorded() {
    let mut host = MemoryHost::new();
    let mut session = Session::new(1, &ReplConfig::default());
    submit(&mut session, &mut host, 1, &["  "]);
    assert!(session.history().is_empty());

    let mut host = MemoryHost::new();
    submit(&mut session, &mut host, 1, &["\\orphan"]);
    assert!(session.history().is_empty());
    assert_eq!(host.lines(1)[1], "illegal line continuation");
}
