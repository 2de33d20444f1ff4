//! Command dispatch integration tests

use bufrepl::repl::{CommandResult, HighlightClass, Host, MemoryHost, Session};
use bufrepl::util::config::ReplConfig;

fn dispatch(
    session: &mut Session,
    host: &mut MemoryHost,
    lines: &[&str],
) -> (CommandResult, Vec<(HighlightClass, Vec<String>)>) {
    let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    let dispatch = session.dispatch(host, &lines);
    let output = dispatch
        .output
        .into_iter()
        .map(|chunk| (chunk.class, chunk.lines))
        .collect();
    (dispatch.result, output)
}

fn setup() -> (MemoryHost, Session) {
    (MemoryHost::new(), Session::new(1, &ReplConfig::default()))
}

#[test]
fn test_clear_abbreviations_dispatch() {
    for typed in ["/c", "/cl", "/clear"] {
        let (mut host, mut session) = setup();
        host.set_lines(1, 0..1, vec!["old".to_string(), "text".to_string()]);
        let (result, output) = dispatch(&mut session, &mut host, &[typed]);
        assert_eq!(result, CommandResult::Hold, "{}", typed);
        assert!(output.is_empty());
        assert_eq!(host.lines(1), &[""]);
    }
}

#[test]
fn test_invalid_command() {
    let (mut host, mut session) = setup();
    let (result, output) = dispatch(&mut session, &mut host, &["/xyz"]);
    assert_eq!(result, CommandResult::Continue);
    assert_eq!(
        output,
        vec![(HighlightClass::Error, vec!["invalid command".to_string()])]
    );
}

#[test]
fn test_buffer_zero_resets_context() {
    let mut host = MemoryHost::new();
    let other = host.create_buffer(Vec::new());
    let config = ReplConfig {
        buffer: other,
        ..ReplConfig::default()
    };
    let mut session = Session::new(1, &config);
    let (_, output) = dispatch(&mut session, &mut host, &["/buffer 0"]);
    assert_eq!(session.context().0, 0);
    assert_eq!(output[0].0, HighlightClass::Info);
}

#[test]
fn test_nonexistent_buffer_is_rejected() {
    let (mut host, mut session) = setup();
    let (_, output) = dispatch(&mut session, &mut host, &["/b 99999"]);
    assert_eq!(session.context(), (0, 0));
    assert_eq!(output[0].0, HighlightClass::Error);
    assert!(output[0].1[0].starts_with("invalid buffer"));
}

#[test]
fn test_buffer_and_window_set_and_show() {
    let mut host = MemoryHost::new();
    let other = host.create_buffer(Vec::new());
    let win = host.create_window(other);
    let mut session = Session::new(1, &ReplConfig::default());

    dispatch(&mut session, &mut host, &["/buffer", &format!("\\{}", other)]);
    dispatch(&mut session, &mut host, &[&format!("/w {}", win)]);
    assert_eq!(session.context(), (other, win));

    let (_, output) = dispatch(&mut session, &mut host, &["/window"]);
    assert_eq!(output[0].1, vec![format!("window context: {}", win)]);
    let (_, output) = dispatch(&mut session, &mut host, &["/window x"]);
    assert_eq!(output[0].1, vec!["invalid window: x".to_string()]);
    assert_eq!(session.context(), (other, win));
}

#[test]
fn test_indent_bounds() {
    let (mut host, mut session) = setup();
    dispatch(&mut session, &mut host, &["/indent 32"]);
    assert_eq!(session.indent(), 32);
    let (_, output) = dispatch(&mut session, &mut host, &["/indent 33"]);
    assert_eq!(output[0].1, vec!["invalid indent: 33".to_string()]);
    assert_eq!(session.indent(), 32);
    dispatch(&mut session, &mut host, &["/i 0"]);
    assert_eq!(session.indent(), 0);
}

#[test]
fn test_commands_without_arguments() {
    let (mut host, mut session) = setup();
    for typed in ["/clear now", "/quit 1", "/help x"] {
        let (result, output) = dispatch(&mut session, &mut host, &[typed]);
        assert_eq!(result, CommandResult::Continue);
        assert_eq!(output[0].1, vec!["arguments not allowed".to_string()]);
    }
    // a blank continuation is not an argument
    let (result, _) = dispatch(&mut session, &mut host, &["/help", "\\   "]);
    assert_eq!(result, CommandResult::Continue);
    assert!(session.is_alive(&host));
}

#[test]
fn test_help_lists_every_command() {
    let (mut host, mut session) = setup();
    let (_, output) = dispatch(&mut session, &mut host, &["/h"]);
    assert_eq!(output[0].0, HighlightClass::Info);
    assert_eq!(output[0].1.len(), bufrepl::repl::COMMANDS.len());
}
