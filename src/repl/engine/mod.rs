//! Reference evaluators
//!
//! Two small languages sharing one expression core:
//! - [`ScriptBackend`] - the scripting language (`lua` slot)
//! - [`CommandBackend`] - the vim-like command language (`vim` slot)

pub mod command;
pub mod env;
pub mod expr;
pub mod script;
pub mod value;

pub use command::CommandBackend;
pub use env::Environment;
pub use expr::ExprError;
pub use script::ScriptBackend;
pub use value::Value;

use super::backend_trait::{Completion, EvalContext};

/// Functions available in both languages
pub const BUILTINS: &[&str] = &["bufnr", "len", "tonumber", "tostring", "type", "winnr"];

/// Call a shared builtin, or `None` if `name` is not one
pub fn call_builtin(
    name: &str,
    args: &[Value],
    ctx: &EvalContext<'_>,
) -> Option<Result<Value, ExprError>> {
    let first = args.first().cloned().unwrap_or_default();
    let value = match name {
        "tostring" | "string" => Value::Str(first.to_string()),
        "tonumber" => first.as_number().map(Value::Number).unwrap_or_default(),
        "type" => Value::from(first.type_name()),
        "len" => match first {
            Value::Str(s) => Value::Number(s.chars().count() as f64),
            other => {
                return Some(Err(ExprError::BadArgument {
                    name: name.to_string(),
                    index: 1,
                    reason: format!("string expected, got {}", other.type_name()),
                }))
            }
        },
        "bufnr" => Value::Number(f64::from(ctx.current_buffer())),
        "winnr" => Value::Number(f64::from(ctx.current_window())),
        _ => return None,
    };
    Some(Ok(value))
}

/// Complete the identifier ending at the end of `text` against `names`.
///
/// The offset is the 1-based byte column where the identifier starts.
pub fn complete_word<I>(
    text: &str,
    names: I,
) -> Completion
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let start = text
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .map(|i| i + text[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let word = &text[start..];
    if word.is_empty() {
        return Completion::none();
    }

    let mut candidates: Vec<String> = names
        .into_iter()
        .filter(|n| n.as_ref().starts_with(word))
        .map(|n| n.as_ref().to_string())
        .collect();
    candidates.sort();
    candidates.dedup();
    Completion::new(start + 1, candidates)
}
