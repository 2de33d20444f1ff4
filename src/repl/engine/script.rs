//! Scripting evaluator (`lua` slot)
//!
//! Programs are Lua-flavoured: `[local] name = expr`, `return expr`, calls,
//! optional `;` separators. Newlines are plain whitespace, so a continued
//! statement parses as one.


use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::env::Environment;
use super::expr::{evaluate, ExprError, Expr, Parser, Scope, TokenKind};
use super::value::Value;
use super::{call_builtin, complete_word, BUILTINS};
use crate::repl::backend_trait::{Completion, EvalContext, EvalResult, Language, ReplBackend};
use crate::repl::ranges::HighlightClass;

/// Chunk name used in error locations
const CHUNK: &str = "repl";

const KEYWORDS: &[&str] = &["and", "false", "local", "nil", "not", "or", "return", "true"];

static LOCATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[string "[^"]*"\]:\d+: "#).expect("location pattern is valid"));

/// Scripting-language evaluator
#[derive(Debug, Default)]
pub struct ScriptBackend {
    env: Environment,
}

/// Outcome of one statement
enum Flow {
    Next,
    Return(Option<Value>),
}

struct ScriptScope<'s, 'c> {
    env: &'s mut Environment,
    ctx: &'s mut EvalContext<'c>,
}

impl Scope for ScriptScope<'_, '_> {
    fn lookup(
        &mut self,
        name: &str,
    ) -> Result<Value, ExprError> {
        Ok(self.env.get_var(name).cloned().unwrap_or_default())
    }

    fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExprError> {
        if name == "print" {
            let text: Vec<String> = args.iter().map(Value::to_string).collect();
            self.ctx.print(&text.join("\t"));
            return Ok(Value::Nil);
        }
        call_builtin(name, &args, self.ctx)
            .unwrap_or_else(|| Err(ExprError::UnknownFunction(name.to_string())))
    }
}

impl ScriptBackend {
    /// Create an evaluator with an empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// The evaluator's variables
    pub fn env(&self) -> &Environment {
        &self.env
    }

    fn render(
        value: &Value,
        ctx: &EvalContext<'_>,
    ) -> String {
        if ctx.inspect() {
            value.inspect()
        } else {
            value.to_string()
        }
    }

    /// Run `source`, returning the value to display, if any
    fn run(
        &mut self,
        source: &str,
        ctx: &mut EvalContext<'_>,
    ) -> Result<Option<Value>, (usize, ExprError)> {
        let mut parser = Parser::from_source(source).map_err(|e| (1, e))?;

        // a lone expression is shown as a value
        let mut lookahead = parser.clone();
        if let Ok(expr) = lookahead.expr() {
            if lookahead.at_end() {
                let mut scope = ScriptScope {
                    env: &mut self.env,
                    ctx: &mut *ctx,
                };
                let value = evaluate(&expr, &mut scope).map_err(|e| (1, e))?;
                let silent = matches!(expr, Expr::Call(..)) && value == Value::Nil;
                return Ok((!silent).then_some(value));
            }
        }

        while !parser.at_end() {
            if parser.eat_sym(";") {
                continue;
            }
            let line = parser.line();
            match self.statement(&mut parser, ctx).map_err(|e| (line, e))? {
                Flow::Next => {}
                Flow::Return(value) => {
                    while parser.eat_sym(";") {}
                    parser.expect_end().map_err(|e| (parser.line(), e))?;
                    return Ok(value);
                }
            }
        }
        Ok(None)
    }

    fn statement(
        &mut self,
        parser: &mut Parser,
        ctx: &mut EvalContext<'_>,
    ) -> Result<Flow, ExprError> {
        let mut scope = ScriptScope {
            env: &mut self.env,
            ctx,
        };

        if parser.eat_keyword("return") {
            if parser.at_end() || parser.peek() == Some(&TokenKind::Sym(";")) {
                return Ok(Flow::Return(None));
            }
            let expr = parser.expr()?;
            return Ok(Flow::Return(Some(evaluate(&expr, &mut scope)?)));
        }

        let local = parser.eat_keyword("local");
        if local || parser.peek_second() == Some(&TokenKind::Sym("=")) {
            let name = parser.name()?;
            parser.expect_sym("=")?;
            let expr = parser.expr()?;
            let value = evaluate(&expr, &mut scope)?;
            scope.env.define_var(name, value);
            return Ok(Flow::Next);
        }

        let near = parser.peek().map(TokenKind::describe);
        let expr = parser.expr()?;
        let is_call = matches!(expr, Expr::Call(..));
        if !is_call && !scope.ctx.inspect() {
            return Err(ExprError::Syntax(near.unwrap_or_default()));
        }
        let value = evaluate(&expr, &mut scope)?;
        if scope.ctx.inspect() && (value != Value::Nil || !is_call) {
            let text = Self::render(&value, scope.ctx);
            scope.ctx.emit(HighlightClass::Value, &text);
        }
        Ok(Flow::Next)
    }
}

impl ReplBackend for ScriptBackend {
    fn language(&self) -> Language {
        Language::Lua
    }

    fn eval(
        &mut self,
        program: &[String],
        ctx: &mut EvalContext<'_>,
    ) -> EvalResult {
        let source = program.join("\n");
        debug!(lines = program.len(), "script eval");

        let result = self.run(&source, ctx);
        match result {
            Ok(Some(value)) => EvalResult::Value(Self::render(&value, ctx)),
            Ok(None) => EvalResult::Ok,
            Err((line, e)) => EvalResult::Error(format!("[string \"{}\"]:{}: {}", CHUNK, line, e)),
        }
    }

    fn complete(
        &self,
        text: &str,
    ) -> Completion {
        let names = self
            .env
            .names()
            .chain(BUILTINS.iter().copied())
            .chain(std::iter::once("print"))
            .chain(KEYWORDS.iter().copied());
        complete_word(text, names)
    }

    fn clean_error(
        &self,
        message: &str,
    ) -> String {
        LOCATION.replace(message, "").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::host::MemoryHost;

    fn program(src: &str) -> Vec<String> {
        src.lines().map(str::to_string).collect()
    }

    fn run(
        backend: &mut ScriptBackend,
        src: &str,
        inspect: bool,
    ) -> (EvalResult, Vec<(HighlightClass, Vec<String>)>) {
        let mut host = MemoryHost::new();
        let mut ctx = EvalContext::new(&mut host, inspect);
        let result = backend.eval(&program(src), &mut ctx);
        let output = ctx
            .into_output()
            .into_chunks()
            .into_iter()
            .map(|c| (c.class, c.lines))
            .collect();
        (result, output)
    }

    #[test]
    fn test_expression_is_value() {
        let mut backend = ScriptBackend::new();
        let (result, output) = run(&mut backend, "1 + 2", false);
        assert_eq!(result, EvalResult::Value("3".to_string()));
        assert!(output.is_empty());
    }

    #[test]
    fn test_assignment_and_print() {
        let mut backend = ScriptBackend::new();
        run(&mut backend, "x = 20\nlocal y = x + 1", false);
        let (result, output) = run(&mut backend, "print(x, y); print('done')", false);
        assert_eq!(result, EvalResult::Ok);
        assert_eq!(
            output,
            vec![(
                HighlightClass::Output,
                vec!["20\t21".to_string(), "done".to_string()]
            )]
        );
    }

    #[test]
    fn test_continued_expression() {
        let mut backend = ScriptBackend::new();
        let (result, _) = run(&mut backend, "return 1\n+ 2", false);
        assert_eq!(result, EvalResult::Value("3".to_string()));
    }

    #[test]
    fn test_inspect_shows_intermediate_values() {
        let mut backend = ScriptBackend::new();
        let (result, output) = run(&mut backend, "'a' .. 'b'\nx = 1\nx + 1", true);
        assert_eq!(result, EvalResult::Ok);
        assert_eq!(
            output,
            vec![(
                HighlightClass::Value,
                vec!["\"ab\"".to_string(), "2".to_string()]
            )]
        );
    }

    #[test]
    fn test_bare_expression_statement_is_syntax_error() {
        let mut backend = ScriptBackend::new();
        let (result, _) = run(&mut backend, "x = 1\nx + 1", false);
        assert_eq!(
            result,
            EvalResult::Error("[string \"repl\"]:2: syntax error near 'x'".to_string())
        );
    }

    #[test]
    fn test_runtime_error_location_is_cleaned() {
        let mut backend = ScriptBackend::new();
        let (result, _) = run(&mut backend, "y = nil + 1", false);
        let EvalResult::Error(message) = result else {
            panic!("expected error, got {:?}", result);
        };
        assert_eq!(
            backend.clean_error(&message),
            "attempt to perform arithmetic on a nil value"
        );
    }

    #[test]
    fn test_complete_globals_and_builtins() {
        let mut backend = ScriptBackend::new();
        run(&mut backend, "total = 1", false);
        let completion = backend.complete("print(to");
        assert_eq!(completion.offset, 7);
        assert_eq!(
            completion.candidates,
            vec!["tonumber", "tostring", "total"]
        );
    }
}
