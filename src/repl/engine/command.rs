//! Vim-like command evaluator (`vim` slot)
//!
//! A statement is one command line: continuation lines are concatenated
//! onto the head, then `|` separates commands. Supported commands are
//! `ec[ho]`, `let`, `unl[et]` and `cal[l]`; a line starting with `"` is a
//! comment.


use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::env::Environment;
use super::expr::{evaluate, Expr, ExprError, Parser, Scope};
use super::value::Value;
use super::{call_builtin, complete_word, BUILTINS};
use crate::repl::backend_trait::{Completion, EvalContext, EvalResult, Language, ReplBackend};
use crate::repl::commands::abbrev_matches;

/// (canonical name, minimum abbreviation)
const COMMANDS: &[(&str, usize)] = &[("call", 3), ("echo", 2), ("let", 3), ("unlet", 3)];

static VIM_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Vim(\([A-Za-z]+\))?:").expect("prefix pattern is valid"));

/// Vim-like command evaluator
#[derive(Debug, Default)]
pub struct CommandBackend {
    env: Environment,
}

struct CommandScope<'s, 'c> {
    env: &'s mut Environment,
    ctx: &'s mut EvalContext<'c>,
}

impl Scope for CommandScope<'_, '_> {
    fn lookup(
        &mut self,
        name: &str,
    ) -> Result<Value, ExprError> {
        self.env
            .get_var(name)
            .cloned()
            .ok_or_else(|| ExprError::UndefinedVariable(name.to_string()))
    }

    fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExprError> {
        call_builtin(name, &args, self.ctx)
            .unwrap_or_else(|| Err(ExprError::UnknownFunction(name.to_string())))
    }
}

/// Split on `|` outside of string literals
fn split_bar(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '|') => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}

/// Vim-style message for an expression error
fn vim_message(
    err: &ExprError,
    source: &str,
) -> String {
    match err {
        ExprError::UndefinedVariable(_) => format!("E121: {}", err),
        ExprError::UnknownFunction(_) => format!("E117: {}", err),
        ExprError::Syntax(_) | ExprError::UnfinishedString => {
            format!("E15: Invalid expression: \"{}\"", source.trim())
        }
        other => other.to_string(),
    }
}

impl CommandBackend {
    /// Create an evaluator with no variables
    pub fn new() -> Self {
        Self::default()
    }

    /// The evaluator's variables
    pub fn env(&self) -> &Environment {
        &self.env
    }

    fn execute(
        &mut self,
        line: &str,
        ctx: &mut EvalContext<'_>,
    ) -> Result<(), String> {
        let line = line.trim_start_matches([' ', '\t', ':']);
        if line.is_empty() || line.starts_with('"') {
            return Ok(());
        }

        let word_len = line
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(line.len());
        let (word, rest) = line.split_at(word_len);
        let Some(&(name, _)) = COMMANDS
            .iter()
            .find(|(name, min)| abbrev_matches(word, name, *min))
        else {
            return Err(format!("Vim:E492: Not an editor command: {}", line.trim_end()));
        };

        let mut scope = CommandScope {
            env: &mut self.env,
            ctx,
        };
        let fail = |e: ExprError| format!("Vim({}):{}", name, vim_message(&e, rest));
        let mut parser = Parser::from_source(rest).map_err(fail)?;

        match name {
            "echo" => {
                let mut values = Vec::new();
                while !parser.at_end() {
                    let expr = parser.expr().map_err(fail)?;
                    values.push(evaluate(&expr, &mut scope).map_err(fail)?.to_string());
                }
                scope.ctx.print(&values.join(" "));
            }
            "let" => {
                let target = parser.name().map_err(fail)?;
                parser.expect_sym("=").map_err(fail)?;
                let expr = parser.expr().map_err(fail)?;
                parser.expect_end().map_err(fail)?;
                let value = evaluate(&expr, &mut scope).map_err(fail)?;
                scope.env.define_var(target, value);
            }
            "unlet" => {
                for target in rest.split_whitespace() {
                    if !scope.env.remove_var(target) {
                        return Err(format!("Vim(unlet):E108: No such variable: \"{}\"", target));
                    }
                }
            }
            _ => {
                let expr = parser.expr().map_err(fail)?;
                parser.expect_end().map_err(fail)?;
                if !matches!(expr, Expr::Call(..)) {
                    return Err("Vim(call):E129: Function name required".to_string());
                }
                evaluate(&expr, &mut scope).map_err(fail)?;
            }
        }
        Ok(())
    }
}

impl ReplBackend for CommandBackend {
    fn language(&self) -> Language {
        Language::Vim
    }

    fn eval(
        &mut self,
        program: &[String],
        ctx: &mut EvalContext<'_>,
    ) -> EvalResult {
        let line = program.concat();
        debug!(%line, "command eval");

        let mut result = EvalResult::Ok;
        for command in split_bar(&line) {
            if let Err(message) = self.execute(command, ctx) {
                result = EvalResult::Error(message);
                break;
            }
        }
        result
    }

    fn complete(
        &self,
        text: &str,
    ) -> Completion {
        let segment_start = text.rfind('|').map_or(0, |i| i + 1);
        let segment = &text[segment_start..];
        let trimmed = segment.trim_start_matches([' ', '\t', ':']);
        if !trimmed.contains(char::is_whitespace) {
            let offset = text.len() - trimmed.len() + 1;
            let candidates: Vec<String> = COMMANDS
                .iter()
                .map(|(name, _)| *name)
                .filter(|name| name.starts_with(trimmed))
                .map(str::to_string)
                .collect();
            return Completion::new(offset, candidates);
        }
        let names = self
            .env
            .names()
            .chain(BUILTINS.iter().copied())
            .chain(std::iter::once("string"));
        complete_word(text, names)
    }

    fn clean_error(
        &self,
        message: &str,
    ) -> String {
        VIM_PREFIX.replace(message, "").into_owned()
    }
}
