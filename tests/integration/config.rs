//! Configuration loading

use std::fs;

use bufrepl::repl::{Language, MemoryHost, Host, Session};
use bufrepl::util::config::{load_from_path, ConfigError};
use bufrepl::util::logger::LogLevel;

#[test]
fn test_file_settings_reach_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[repl]\nlang = \"vim\"\nindent = 3\nmarker = \"+\"\nprefix = \":\"\n\n[log]\nlevel = \"info\"\n",
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.log.level, LogLevel::Info);

    let mut session = Session::new(1, &config.repl);
    assert_eq!(session.language(), Language::Vim);
    let mut host = MemoryHost::new();
    host.set_lines(1, 0..1, vec!["echo 1".to_string(), "+ + 1".to_string()]);
    session.submit(&mut host, 2).unwrap();
    assert_eq!(host.lines(1)[2], "   2");

    host.set_lines(1, 0..0, vec![":l 7".to_string()]);
    session.submit(&mut host, 1).unwrap();
    assert_eq!(host.lines(1)[1], "   7");
}

#[test]
fn test_invalid_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[repl]\nhistory_size = 0\n").unwrap();
    assert!(matches!(
        load_from_path(&path),
        Err(ConfigError::Invalid { key: "history_size", .. })
    ));
}
