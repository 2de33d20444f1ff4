//! Expression core shared by the reference evaluators
//!
//! A small tokenizer and precedence-climbing parser. Statement forms live in
//! the evaluators; this module only knows expressions.

use thiserror::Error;

use super::value::Value;

/// Expression errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Input that does not parse
    #[error("syntax error near {0}")]
    Syntax(String),

    /// String literal without a closing quote
    #[error("unfinished string")]
    UnfinishedString,

    /// Reference to a name that has no value
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    /// Call of a name that is not a function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Arithmetic on a non-number
    #[error("attempt to perform arithmetic on a {0} value")]
    Arithmetic(&'static str),

    /// Concatenation of a non-string, non-number
    #[error("attempt to concatenate a {0} value")]
    Concat(&'static str),

    /// Ordering of incompatible values
    #[error("attempt to compare {0} with {1}")]
    Compare(&'static str, &'static str),

    /// Wrong argument passed to a builtin
    #[error("bad argument #{index} to '{name}' ({reason})")]
    BadArgument {
        /// Function name
        name: String,
        /// 1-based argument position
        index: usize,
        /// What was wrong
        reason: String,
    },

    /// Nesting beyond [`MAX_DEPTH`]
    #[error("expression too deeply nested")]
    TooDeep,
}

/// Token payload
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Numeric literal
    Number(f64),
    /// String literal, escapes resolved
    Str(String),
    /// Identifier or keyword
    Ident(String),
    /// Operator or punctuation
    Sym(&'static str),
}

impl TokenKind {
    /// Short quoted rendering for error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("'{}'", Value::Number(*n)),
            TokenKind::Str(s) => format!("{:?}", s),
            TokenKind::Ident(s) => format!("'{}'", s),
            TokenKind::Sym(s) => format!("'{}'", s),
        }
    }
}

/// A token and the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Payload
    pub kind: TokenKind,
    /// Source line
    pub line: usize,
}

const SYMBOLS: &[&str] = &[
    "..", "==", "~=", "!=", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "(", ")", ",", "=",
    ";",
];

const KEYWORDS: &[&str] = &["and", "or", "not", "nil", "true", "false", "local", "return"];

/// Split `src` into tokens. `--` starts a comment running to end of line.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        let start_line = line;
        let kind = if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                // `1..2` is concatenation, not a malformed number
                if chars[i] == '.' && chars.get(i + 1) == Some(&'.') {
                    break;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse()
                .map_err(|_| ExprError::Syntax(format!("'{}'", text)))?;
            TokenKind::Number(n)
        } else if c == '"' || c == '\'' {
            i += 1;
            let mut s = String::new();
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(ExprError::UnfinishedString);
                };
                i += 1;
                match ch {
                    '\n' => return Err(ExprError::UnfinishedString),
                    '\\' => {
                        let Some(&esc) = chars.get(i) else {
                            return Err(ExprError::UnfinishedString);
                        };
                        i += 1;
                        s.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                    ch if ch == c => break,
                    ch => s.push(ch),
                }
            }
            TokenKind::Str(s)
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == ':') {
                i += 1;
            }
            TokenKind::Ident(chars[start..i].iter().collect())
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let sym = SYMBOLS
                .iter()
                .find(|s| rest.starts_with(**s))
                .ok_or_else(|| ExprError::Syntax(format!("'{}'", c)))?;
            i += sym.chars().count();
            TokenKind::Sym(*sym)
        };
        tokens.push(Token {
            kind,
            line: start_line,
        });
    }
    Ok(tokens)
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Call(String, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

/// (operator, precedence, right associative)
fn binop(kind: &TokenKind) -> Option<(BinOp, u8, bool)> {
    let op = match kind {
        TokenKind::Ident(s) if s == "or" => (BinOp::Or, 1, false),
        TokenKind::Ident(s) if s == "and" => (BinOp::And, 2, false),
        TokenKind::Sym("==") => (BinOp::Eq, 3, false),
        TokenKind::Sym("~=") | TokenKind::Sym("!=") => (BinOp::Ne, 3, false),
        TokenKind::Sym("<") => (BinOp::Lt, 3, false),
        TokenKind::Sym("<=") => (BinOp::Le, 3, false),
        TokenKind::Sym(">") => (BinOp::Gt, 3, false),
        TokenKind::Sym(">=") => (BinOp::Ge, 3, false),
        TokenKind::Sym("..") => (BinOp::Concat, 4, true),
        TokenKind::Sym("+") => (BinOp::Add, 5, false),
        TokenKind::Sym("-") => (BinOp::Sub, 5, false),
        TokenKind::Sym("*") => (BinOp::Mul, 6, false),
        TokenKind::Sym("/") => (BinOp::Div, 6, false),
        TokenKind::Sym("%") => (BinOp::Mod, 6, false),
        _ => return None,
    };
    Some(op)
}

const UNARY_PRECEDENCE: u8 = 7;

/// Deepest nesting the parser accepts, both in recursion and in tree height
pub const MAX_DEPTH: usize = 200;

/// An expression and the height of its tree
type Parsed = Result<(Expr, usize), ExprError>;

fn checked_height(height: usize) -> Result<usize, ExprError> {
    if height > MAX_DEPTH {
        Err(ExprError::TooDeep)
    } else {
        Ok(height)
    }
}

/// Cursor over a token list
#[derive(Debug, Clone)]
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Parser over already produced tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Tokenize and wrap `src`
    pub fn from_source(src: &str) -> Result<Self, ExprError> {
        Ok(Self::new(tokenize(src)?))
    }

    /// Next token, if any
    pub fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    /// Token after the next one
    pub fn peek_second(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    /// Line of the next token (or of the last token at end of input)
    pub fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    /// Whether all tokens were consumed
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self) -> ExprError {
        match self.peek() {
            Some(kind) => ExprError::Syntax(kind.describe()),
            None => ExprError::Syntax("<eof>".to_string()),
        }
    }

    /// Consume `sym` if it is next
    pub fn eat_sym(
        &mut self,
        sym: &str,
    ) -> bool {
        if matches!(self.peek(), Some(TokenKind::Sym(s)) if *s == sym) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume keyword `kw` if it is next
    pub fn eat_keyword(
        &mut self,
        kw: &str,
    ) -> bool {
        if matches!(self.peek(), Some(TokenKind::Ident(s)) if s == kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Require `sym`
    pub fn expect_sym(
        &mut self,
        sym: &str,
    ) -> Result<(), ExprError> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Require a non-keyword identifier
    pub fn name(&mut self) -> Result<String, ExprError> {
        match self.peek() {
            Some(TokenKind::Ident(s)) if !KEYWORDS.contains(&s.as_str()) => {
                let name = s.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Require end of input
    pub fn expect_end(&self) -> Result<(), ExprError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Parse one expression.
    ///
    /// Fails with [`ExprError::TooDeep`] past [`MAX_DEPTH`] levels of nesting.
    pub fn expr(&mut self) -> Result<Expr, ExprError> {
        self.binary(0).map(|(expr, _)| expr)
    }

    fn binary(
        &mut self,
        min_prec: u8,
    ) -> Parsed {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let parsed = self.fold(min_prec);
        self.depth -= 1;
        parsed
    }

    fn fold(
        &mut self,
        min_prec: u8,
    ) -> Parsed {
        let (mut lhs, mut height) = self.unary()?;
        while let Some((op, prec, right)) = self.peek().and_then(binop) {
            if prec <= min_prec {
                break;
            }
            self.pos += 1;
            let (rhs, rhs_height) = self.binary(if right { prec - 1 } else { prec })?;
            height = checked_height(height.max(rhs_height) + 1)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, height))
    }

    fn unary(&mut self) -> Parsed {
        let op = if self.eat_sym("-") {
            UnOp::Neg
        } else if self.eat_keyword("not") {
            UnOp::Not
        } else {
            return self.primary();
        };
        let (operand, height) = self.binary(UNARY_PRECEDENCE - 1)?;
        Ok((Expr::Unary(op, Box::new(operand)), checked_height(height + 1)?))
    }

    fn primary(&mut self) -> Parsed {
        let err = self.unexpected();
        let leaf = |expr: Expr| -> Parsed { Ok((expr, 1)) };
        match self.advance() {
            Some(TokenKind::Number(n)) => leaf(Expr::Literal(Value::Number(n))),
            Some(TokenKind::Str(s)) => leaf(Expr::Literal(Value::Str(s))),
            Some(TokenKind::Ident(s)) => match s.as_str() {
                "nil" => leaf(Expr::Literal(Value::Nil)),
                "true" => leaf(Expr::Literal(Value::Bool(true))),
                "false" => leaf(Expr::Literal(Value::Bool(false))),
                kw if KEYWORDS.contains(&kw) => Err(err),
                _ if self.eat_sym("(") => {
                    let mut args = Vec::new();
                    let mut height = 0;
                    if !self.eat_sym(")") {
                        loop {
                            let (arg, arg_height) = self.binary(0)?;
                            args.push(arg);
                            height = height.max(arg_height);
                            if self.eat_sym(")") {
                                break;
                            }
                            self.expect_sym(",")?;
                        }
                    }
                    Ok((Expr::Call(s, args), checked_height(height + 1)?))
                }
                _ => leaf(Expr::Var(s)),
            },
            Some(TokenKind::Sym("(")) => {
                let inner = self.binary(0)?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            _ => Err(err),
        }
    }
}

/// Name resolution and calls, supplied by each evaluator
pub trait Scope {
    /// Value of variable `name`
    fn lookup(
        &mut self,
        name: &str,
    ) -> Result<Value, ExprError>;

    /// Call function `name`
    fn call(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExprError>;
}

/// Evaluate `expr` against `scope`
pub fn evaluate(
    expr: &Expr,
    scope: &mut dyn Scope,
) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => scope.lookup(name),
        Expr::Call(name, args) => {
            let args = args
                .iter()
                .map(|a| evaluate(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            scope.call(name, args)
        }
        Expr::Unary(UnOp::Not, e) => Ok(Value::Bool(!evaluate(e, scope)?.is_truthy())),
        Expr::Unary(UnOp::Neg, e) => {
            let v = evaluate(e, scope)?;
            v.as_number()
                .map(|n| Value::Number(-n))
                .ok_or(ExprError::Arithmetic(v.type_name()))
        }
        Expr::Binary(BinOp::And, l, r) => {
            let lhs = evaluate(l, scope)?;
            if lhs.is_truthy() {
                evaluate(r, scope)
            } else {
                Ok(lhs)
            }
        }
        Expr::Binary(BinOp::Or, l, r) => {
            let lhs = evaluate(l, scope)?;
            if lhs.is_truthy() {
                Ok(lhs)
            } else {
                evaluate(r, scope)
            }
        }
        Expr::Binary(op, l, r) => {
            let lhs = evaluate(l, scope)?;
            let rhs = evaluate(r, scope)?;
            apply(*op, lhs, rhs)
        }
    }
}

fn apply(
    op: BinOp,
    lhs: Value,
    rhs: Value,
) -> Result<Value, ExprError> {
    let arith = |f: fn(f64, f64) -> f64| -> Result<Value, ExprError> {
        let a = lhs.as_number().ok_or(ExprError::Arithmetic(lhs.type_name()))?;
        let b = rhs.as_number().ok_or(ExprError::Arithmetic(rhs.type_name()))?;
        Ok(Value::Number(f(a, b)))
    };
    match op {
        BinOp::Add => arith(|a, b| a + b),
        BinOp::Sub => arith(|a, b| a - b),
        BinOp::Mul => arith(|a, b| a * b),
        BinOp::Div => arith(|a, b| a / b),
        BinOp::Mod => arith(|a, b| a - (a / b).floor() * b),
        BinOp::Concat => {
            for v in [&lhs, &rhs] {
                if !matches!(v, Value::Str(_) | Value::Number(_)) {
                    return Err(ExprError::Concat(v.type_name()));
                }
            }
            Ok(Value::Str(format!("{}{}", lhs, rhs)))
        }
        BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinOp::Ne => Ok(Value::Bool(lhs != rhs)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or(ExprError::Compare(lhs.type_name(), rhs.type_name()))?;
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators are handled in evaluate"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapScope(HashMap<String, Value>);

    impl Scope for MapScope {
        fn lookup(
            &mut self,
            name: &str,
        ) -> Result<Value, ExprError> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UndefinedVariable(name.to_string()))
        }

        fn call(
            &mut self,
            name: &str,
            args: Vec<Value>,
        ) -> Result<Value, ExprError> {
            match name {
                "double" => Ok(Value::Number(args[0].as_number().unwrap_or(0.0) * 2.0)),
                _ => Err(ExprError::UnknownFunction(name.to_string())),
            }
        }
    }

    fn eval_str(src: &str) -> Result<Value, ExprError> {
        let mut parser = Parser::from_source(src)?;
        let expr = parser.expr()?;
        parser.expect_end()?;
        let mut scope = MapScope::default();
        scope.0.insert("x".to_string(), Value::Number(4.0));
        evaluate(&expr, &mut scope)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval_str("(1 + 2) * 3").unwrap(), Value::Number(9.0));
        assert_eq!(eval_str("-x + 1").unwrap(), Value::Number(-3.0));
        assert_eq!(eval_str("7 % 3").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_concat_and_compare() {
        assert_eq!(eval_str("'a' .. 1 .. \"b\"").unwrap(), Value::from("a1b"));
        assert_eq!(eval_str("x >= 4 and x ~= 5").unwrap(), Value::Bool(true));
        assert_eq!(eval_str("nil or 'dflt'").unwrap(), Value::from("dflt"));
        assert_eq!(eval_str("not nil").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_calls() {
        assert_eq!(eval_str("double(x) + 1").unwrap(), Value::Number(9.0));
        assert_eq!(
            eval_str("nope()"),
            Err(ExprError::UnknownFunction("nope".to_string()))
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(eval_str("nil + 1"), Err(ExprError::Arithmetic("nil")));
        assert_eq!(eval_str("1 < 'a'"), Err(ExprError::Compare("number", "string")));
        assert_eq!(eval_str("'open"), Err(ExprError::UnfinishedString));
        assert!(matches!(eval_str("1 +"), Err(ExprError::Syntax(_))));
        assert!(matches!(eval_str("1 2"), Err(ExprError::Syntax(_))));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(eval_str(&nested), Err(ExprError::TooDeep));

        let chain = vec!["1"; 10_000].join(" + ");
        assert_eq!(eval_str(&chain), Err(ExprError::TooDeep));

        let negations = format!("{}1", "- ".repeat(10_000));
        assert_eq!(eval_str(&negations), Err(ExprError::TooDeep));

        let calls = format!("{}x{}", "double(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(eval_str(&calls), Err(ExprError::TooDeep));

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(eval_str(&shallow).unwrap(), Value::Number(1.0));
        let sum = vec!["1"; 100].join(" + ");
        assert_eq!(eval_str(&sum).unwrap(), Value::Number(100.0));
    }

    #[test]
    fn test_token_lines_and_comments() {
        let tokens = tokenize("a -- note\n+ b").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].line, 2);
    }
}
