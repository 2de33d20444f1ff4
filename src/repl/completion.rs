//! Completion broker
//!
//! Decides whether the text before the cursor completes a meta-command name,
//! source passed to `/lua` or `/vim`, or source for the active language.

use once_cell::sync::Lazy;
use regex::Regex;

use super::backend_trait::{Completion, Language, ReplBackend};
use super::commands::{lookup, CommandKind, COMMANDS};

static SUB_DISPATCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\s+").expect("sub-dispatch pattern is valid"));

/// Borrowed view of a session's completion sources
pub struct CompletionBroker<'a> {
    /// Command prefix
    pub prefix: char,
    /// Language plain input goes to
    pub active: Language,
    /// Scripting evaluator
    pub lua: &'a dyn ReplBackend,
    /// Command evaluator
    pub vim: &'a dyn ReplBackend,
}

impl CompletionBroker<'_> {
    fn backend(
        &self,
        lang: Language,
    ) -> &dyn ReplBackend {
        match lang {
            Language::Lua => self.lua,
            Language::Vim => self.vim,
        }
    }

    /// Complete `line` with the cursor at byte `cursor_col` (0-based).
    ///
    /// The returned offset is a 1-based column into `line`.
    pub fn complete_at(
        &self,
        line: &str,
        cursor_col: usize,
    ) -> Completion {
        let mut col = cursor_col.min(line.len());
        while !line.is_char_boundary(col) {
            col -= 1;
        }
        let before = &line[..col];

        let completion = match before.strip_prefix(self.prefix) {
            Some(command) if !command.contains(char::is_whitespace) => {
                let candidates = COMMANDS
                    .iter()
                    .filter(|spec| spec.name.starts_with(command))
                    .map(|spec| spec.name.to_string())
                    .collect();
                Completion::new(self.prefix.len_utf8() + 1, candidates)
            }
            Some(command) => {
                let Some(caps) = SUB_DISPATCH.captures(command) else {
                    return Completion::none();
                };
                let lang = match lookup(&caps[1]).map(|spec| spec.kind) {
                    Some(CommandKind::Lua) => Language::Lua,
                    Some(CommandKind::Vim) => Language::Vim,
                    _ => return Completion::none(),
                };
                let matched = self.prefix.len_utf8() + caps[0].len();
                let inner = self.backend(lang).complete(&command[caps[0].len()..]);
                Completion::new(inner.offset + matched, inner.candidates)
            }
            None => self.backend(self.active).complete(before),
        };

        if completion.is_empty() {
            Completion::none()
        } else {
            completion
        }
    }
}
