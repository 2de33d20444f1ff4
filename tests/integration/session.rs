//! Session integration tests
//!
//! Submitting statements through a session over an in-memory host.

use bufrepl::repl::{HighlightClass, Host, MemoryHost, ReplError, Session};
use bufrepl::util::config::ReplConfig;

fn session_with(lines: &[&str]) -> (MemoryHost, Session) {
    let mut host = MemoryHost::new();
    host.set_lines(1, 0..1, lines.iter().map(|s| s.to_string()).collect());
    (host, Session::new(1, &ReplConfig::default()))
}

#[test]
fn test_multiline_statement_output_follows_block() {
    let (mut host, mut session) = session_with(&["x = 1", "\\+ 2", "print(x)"]);
    session.submit(&mut host, 1).unwrap();
    // statement is lines 1-2; output goes after line 2
    assert_eq!(host.lines(1)[..3], ["x = 1", "\\+ 2", ""]);
    let outcome = session.submit(&mut host, 4).unwrap();
    assert_eq!(host.lines(1)[4], "3");
    assert_eq!(outcome.cursor_line, 6);
}

#[test]
fn test_evaluator_failure_keeps_state() {
    let (mut host, mut session) = session_with(&["1"]);
    let outcome = session.submit(&mut host, 1).unwrap();
    let ranges_before = session.tracker().ranges(&host, 1).len();

    host.set_lines(1, outcome.cursor_line - 1..outcome.cursor_line, vec!["nope(".to_string()]);
    let outcome = session.submit(&mut host, outcome.cursor_line).unwrap();
    assert_eq!(session.history().len(), 2);
    let ranges = session.tracker().ranges(&host, 1);
    assert_eq!(ranges.len(), ranges_before + 1);
    assert_eq!(ranges.last().map(|r| r.class), Some(HighlightClass::Error));
    let error_line = &host.lines(1)[ranges[1].start - 1];
    assert!(!error_line.starts_with("[string"), "location not stripped: {}", error_line);

    host.set_lines(1, outcome.cursor_line - 1..outcome.cursor_line, vec!["2 * 21".to_string()]);
    let outcome = session.submit(&mut host, outcome.cursor_line).unwrap();
    assert_eq!(host.lines(1)[outcome.cursor_line - 2], "42");
    let ids: Vec<u32> = session.tracker().ranges(&host, 1).iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_context_redirection_is_restored() {
    let mut host = MemoryHost::new();
    let other = host.create_buffer(vec!["other".to_string()]);
    let config = ReplConfig {
        buffer: other,
        ..ReplConfig::default()
    };
    let mut session = Session::new(1, &config);
    host.set_lines(1, 0..1, vec!["bufnr()".to_string()]);
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], other.to_string());
    assert_eq!(host.current(), (1, 1));
}

#[test]
fn test_stale_context_resets_to_none() {
    let mut host = MemoryHost::new();
    let other = host.create_buffer(Vec::new());
    let config = ReplConfig {
        buffer: other,
        ..ReplConfig::default()
    };
    let mut session = Session::new(1, &config);
    host.delete_buffer(other);

    host.set_lines(1, 0..1, vec!["print('x')".to_string()]);
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "invalid buffer context, reset to none");
    assert_eq!(session.context(), (0, 0));

    // the next evaluation runs normally
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "x");
}

#[test]
fn test_stale_window_context_resets_to_none() {
    let mut host = MemoryHost::new();
    let other = host.create_buffer(Vec::new());
    let win = host.create_window(other);
    let config = ReplConfig {
        window: win,
        ..ReplConfig::default()
    };
    let mut session = Session::new(1, &config);
    assert_eq!(session.context(), (0, win));
    host.close_window(win);

    host.set_lines(1, 0..1, vec!["print(winnr())".to_string()]);
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "invalid window context, reset to none");
    assert_eq!(session.context(), (0, 0));
    assert_eq!(host.current(), (1, 1));

    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "1");
}

#[test]
fn test_vim_mode_switch_and_errors() {
    let (mut host, mut session) = session_with(&["/vim"]);
    let outcome = session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "vim mode");

    let line = outcome.cursor_line;
    host.set_lines(1, line - 1..line, vec!["echo undefined_thing".to_string()]);
    session.submit(&mut host, line).unwrap();
    assert_eq!(host.lines(1)[line], "E121: Undefined variable: undefined_thing");
}

#[test]
fn test_one_shot_language_override() {
    let (mut host, mut session) = session_with(&["/v let g:n = 5 | echo g:n"]);
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "5");
    assert_eq!(session.language(), bufrepl::repl::Language::Lua);
}

#[test]
fn test_closed_session_rejects_operations() {
    let (mut host, mut session) = session_with(&["1"]);
    host.delete_buffer(1);
    assert!(matches!(session.submit(&mut host, 1), Err(ReplError::SessionClosed(1))));
    assert!(session.history_move(&mut host, 1, true).is_err());
    assert!(session.break_line(&mut host, 1, 0).is_err());
    assert!(session.goto_output(&host, false, false, 1, 1).is_err());
}

#[test]
fn test_run_collects_output() {
    let output = bufrepl::run(
        "x = 4\nprint(x,\\\nx * 2)\n/vim\necho 'done'",
        &ReplConfig::default(),
    ).unwrap();
    let text: Vec<&str> = output.iter().map(|(_, t)| t.as_str()).collect();
    assert_eq!(text, vec!["4\t8", "vim mode", "done"]);
}
