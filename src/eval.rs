//! Expression evaluator (`spec.md` §4.3, design note in §9: "choose an
//! explicit safe expression language ... reject others with a clear error.
//! The compiler must not execute arbitrary host code.").
//!
//! Supports arithmetic, comparisons, boolean logic, member/index access,
//! array literals, and calls to an allow-listed set of helper functions —
//! nothing else. There is no way to reach into the host process.

use std::fmt;

use crate::value::{Context, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct EvalError(pub String);

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EvalError {}

// ---------------------------------------------------------------- Lexing --

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Eof,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices().peekable(),
            src,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Tok>, EvalError> {
        let mut toks = Vec::new();
        loop {
            self.skip_ws();
            let Some(&(i, c)) = self.chars.peek() else {
                toks.push(Tok::Eof);
                break;
            };
            match c {
                '(' => { self.chars.next(); toks.push(Tok::LParen); }
                ')' => { self.chars.next(); toks.push(Tok::RParen); }
                '[' => { self.chars.next(); toks.push(Tok::LBracket); }
                ']' => { self.chars.next(); toks.push(Tok::RBracket); }
                ',' => { self.chars.next(); toks.push(Tok::Comma); }
                '.' => { self.chars.next(); toks.push(Tok::Dot); }
                '"' | '\'' => toks.push(self.read_string(c)?),
                '0'..='9' => toks.push(self.read_number(i)),
                c if c.is_alphabetic() || c == '_' => toks.push(self.read_ident(i)),
                '=' | '!' | '<' | '>' | '&' | '|' | '+' | '-' | '*' | '/' | '%' => {
                    toks.push(self.read_op())
                }
                other => {
                    return Err(EvalError(format!("unexpected character '{}' in expression", other)))
                }
            }
        }
        Ok(toks)
    }

    fn skip_ws(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Tok, EvalError> {
        self.chars.next();
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => {
                    if let Some((_, esc)) = self.chars.next() {
                        s.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                Some((_, c)) => s.push(c),
                None => return Err(EvalError("unterminated string literal".to_string())),
            }
        }
        Ok(Tok::Str(s))
    }

    fn read_number(&mut self, start: usize) -> Tok {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        let text = &self.src[start..end];
        Tok::Number(text.parse().unwrap_or(0.0))
    }

    fn read_ident(&mut self, start: usize) -> Tok {
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                end = i + c.len_utf8();
                self.chars.next();
            } else {
                break;
            }
        }
        Tok::Ident(self.src[start..end].to_string())
    }

    fn read_op(&mut self) -> Tok {
        let (_, c) = *self.chars.peek().unwrap();
        self.chars.next();
        let two = |this: &mut Self, expect: char, yes: &'static str, no: &'static str| -> &'static str {
            if this.chars.peek().map(|&(_, c)| c) == Some(expect) {
                this.chars.next();
                yes
            } else {
                no
            }
        };
        let op: &'static str = match c {
            '=' => two(self, '=', "==", "="),
            '!' => two(self, '=', "!=", "!"),
            '<' => two(self, '=', "<=", "<"),
            '>' => two(self, '=', ">=", ">"),
            '&' => two(self, '&', "&&", "&"),
            '|' => two(self, '|', "||", "|"),
            '+' => "+",
            '-' => "-",
            '*' => "*",
            '/' => "/",
            '%' => "%",
            _ => unreachable!(),
        };
        Tok::Op(op)
    }
}

// ----------------------------------------------------------------- AST --

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Tok {
        &self.toks[self.pos]
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, tok: &Tok) -> Result<(), EvalError> {
        if self.peek() == tok {
            self.bump();
            Ok(())
        } else {
            Err(EvalError(format!("expected {:?}, found {:?}", tok, self.peek())))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while let Tok::Op("||") = self.peek() {
            self.bump();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary("||", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_equality()?;
        while let Tok::Op("&&") = self.peek() {
            self.bump();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary("&&", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                Tok::Op(op @ ("==" | "!=")) => *op,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Tok::Op(op @ ("<" | "<=" | ">" | ">=")) => *op,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Tok::Op(op @ ("+" | "-")) => *op,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Op(op @ ("*" | "/" | "%")) => *op,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Tok::Op("!") => {
                self.bump();
                Ok(Expr::Unary("!", Box::new(self.parse_unary()?)))
            }
            Tok::Op("-") => {
                self.bump();
                Ok(Expr::Unary("-", Box::new(self.parse_unary()?)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Tok::Dot => {
                    self.bump();
                    let name = match self.bump() {
                        Tok::Ident(n) => n,
                        other => return Err(EvalError(format!("expected field name, found {:?}", other))),
                    };
                    expr = Expr::Member(Box::new(expr), name);
                }
                Tok::LBracket => {
                    self.bump();
                    let idx = self.parse_expr()?;
                    self.expect(&Tok::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(idx));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.bump() {
            Tok::Number(n) => Ok(Expr::Number(n)),
            Tok::Str(s) => Ok(Expr::Str(s)),
            Tok::Ident(name) => {
                if name == "true" {
                    return Ok(Expr::Bool(true));
                }
                if name == "false" {
                    return Ok(Expr::Bool(false));
                }
                if name == "null" {
                    return Ok(Expr::Null);
                }
                if self.peek() == &Tok::LParen {
                    self.bump();
                    let mut args = Vec::new();
                    if self.peek() != &Tok::RParen {
                        args.push(self.parse_expr()?);
                        while self.peek() == &Tok::Comma {
                            self.bump();
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.expect(&Tok::RParen)?;
                    return Ok(Expr::Call(name, args));
                }
                Ok(Expr::Ident(name))
            }
            Tok::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                if self.peek() != &Tok::RBracket {
                    items.push(self.parse_expr()?);
                    while self.peek() == &Tok::Comma {
                        self.bump();
                        items.push(self.parse_expr()?);
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Expr::Array(items))
            }
            other => Err(EvalError(format!("unexpected token {:?}", other))),
        }
    }
}

pub fn parse(src: &str) -> Result<Expr, EvalError> {
    let toks = Lexer::new(src).tokenize()?;
    let mut parser = Parser { toks, pos: 0 };
    let expr = parser.parse_expr()?;
    if parser.peek() != &Tok::Eof {
        return Err(EvalError(format!(
            "trailing tokens after expression: {:?}",
            parser.peek()
        )));
    }
    Ok(expr)
}

// ------------------------------------------------------------ Evaluate --

pub fn evaluate(expr: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(evaluate(item, ctx)?);
            }
            Ok(Value::Array(out))
        }
        Expr::Ident(name) => Ok(ctx.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Member(base, field) => {
            let v = evaluate(base, ctx)?;
            match v {
                Value::Object(map) => Ok(map.get(field).cloned().unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(EvalError(format!(
                    "cannot access field '{}' on non-object value {:?}",
                    field, other
                ))),
            }
        }
        Expr::Index(base, idx) => {
            let v = evaluate(base, ctx)?;
            let i = evaluate(idx, ctx)?;
            match (&v, &i) {
                (Value::Array(arr), Value::Number(n)) => {
                    let idx = *n as i64;
                    let idx = if idx < 0 { arr.len() as i64 + idx } else { idx };
                    Ok(arr.get(idx as usize).cloned().unwrap_or(Value::Null))
                }
                (Value::Object(map), Value::String(key)) => {
                    Ok(map.get(key).cloned().unwrap_or(Value::Null))
                }
                (Value::String(s), Value::Number(n)) => Ok(s
                    .chars()
                    .nth(*n as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null)),
                _ => Err(EvalError("unsupported index operation".to_string())),
            }
        }
        Expr::Unary(op, inner) => {
            let v = evaluate(inner, ctx)?;
            match *op {
                "!" => Ok(Value::Bool(!v.is_truthy())),
                "-" => Ok(Value::Number(-v.as_number().ok_or_else(|| {
                    EvalError("unary '-' requires a number".to_string())
                })?)),
                _ => unreachable!(),
            }
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(op, lhs, rhs, ctx),
        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for a in args {
                values.push(evaluate(a, ctx)?);
            }
            call_helper(name, values)
        }
    }
}

fn eval_binary(op: &str, lhs: &Expr, rhs: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    if op == "&&" {
        let l = evaluate(lhs, ctx)?;
        if !l.is_truthy() {
            return Ok(l);
        }
        return evaluate(rhs, ctx);
    }
    if op == "||" {
        let l = evaluate(lhs, ctx)?;
        if l.is_truthy() {
            return Ok(l);
        }
        return evaluate(rhs, ctx);
    }

    let l = evaluate(lhs, ctx)?;
    let r = evaluate(rhs, ctx)?;

    match op {
        "==" => Ok(Value::Bool(values_equal(&l, &r))),
        "!=" => Ok(Value::Bool(!values_equal(&l, &r))),
        "+" => match (&l, &r) {
            (Value::String(a), _) => Ok(Value::String(format!("{}{}", a, r.to_display_string()))),
            (_, Value::String(b)) => Ok(Value::String(format!("{}{}", l.to_display_string(), b))),
            _ => numeric_binop(op, &l, &r),
        },
        "-" | "*" | "/" | "%" => numeric_binop(op, &l, &r),
        "<" | "<=" | ">" | ">=" => {
            let a = l
                .as_number()
                .ok_or_else(|| EvalError("comparison requires numbers".to_string()))?;
            let b = r
                .as_number()
                .ok_or_else(|| EvalError("comparison requires numbers".to_string()))?;
            let result = match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                ">=" => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        _ => Err(EvalError(format!("unsupported operator '{}'", op))),
    }
}

fn numeric_binop(op: &str, l: &Value, r: &Value) -> Result<Value, EvalError> {
    let a = l
        .as_number()
        .ok_or_else(|| EvalError(format!("'{}' requires numeric operands", op)))?;
    let b = r
        .as_number()
        .ok_or_else(|| EvalError(format!("'{}' requires numeric operands", op)))?;
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" => a / b,
        "%" => a % b,
        _ => unreachable!(),
    };
    Ok(Value::Number(result))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

/// The only way to call "functions" from an expression: a small allow-list
/// of pure helpers. There is no path from here into host code.
fn call_helper(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match name {
        "len" => match args.first() {
            Some(Value::String(s)) => Ok(Value::Number(s.chars().count() as f64)),
            Some(Value::Array(a)) => Ok(Value::Number(a.len() as f64)),
            Some(Value::Object(o)) => Ok(Value::Number(o.len() as f64)),
            _ => Err(EvalError("len() requires a string, array, or object".to_string())),
        },
        "str" => Ok(Value::String(
            args.first().map(Value::to_display_string).unwrap_or_default(),
        )),
        "int" => Ok(Value::Number(
            args.first().and_then(Value::as_number).unwrap_or(0.0).trunc(),
        )),
        "float" => Ok(Value::Number(args.first().and_then(Value::as_number).unwrap_or(0.0))),
        "bool" => Ok(Value::Bool(args.first().map(Value::is_truthy).unwrap_or(false))),
        "keys" => match args.first() {
            Some(Value::Object(o)) => Ok(Value::Array(
                o.keys().map(|k| Value::String(k.clone())).collect(),
            )),
            _ => Err(EvalError("keys() requires an object".to_string())),
        },
        "values" => match args.first() {
            Some(Value::Object(o)) => Ok(Value::Array(o.values().cloned().collect())),
            _ => Err(EvalError("values() requires an object".to_string())),
        },
        "range" => {
            let n = args
                .first()
                .and_then(Value::as_number)
                .ok_or_else(|| EvalError("range() requires a number".to_string()))? as i64;
            Ok(Value::Array((0..n).map(|i| Value::Number(i as f64)).collect()))
        }
        "join" => {
            let arr = args
                .first()
                .and_then(Value::as_array)
                .ok_or_else(|| EvalError("join() requires an array".to_string()))?;
            let sep = args
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or(",")
                .to_string();
            let parts: Vec<String> = arr.iter().map(Value::to_display_string).collect();
            Ok(Value::String(parts.join(&sep)))
        }
        "contains" => match args.first() {
            Some(Value::Array(a)) => Ok(Value::Bool(
                args.get(1).map(|needle| a.contains(needle)).unwrap_or(false),
            )),
            Some(Value::String(s)) => Ok(Value::Bool(
                args.get(1)
                    .and_then(Value::as_str)
                    .map(|needle| s.contains(needle))
                    .unwrap_or(false),
            )),
            _ => Err(EvalError("contains() requires an array or string".to_string())),
        },
        "upper" => Ok(Value::String(
            args.first().map(Value::to_display_string).unwrap_or_default().to_uppercase(),
        )),
        "lower" => Ok(Value::String(
            args.first().map(Value::to_display_string).unwrap_or_default().to_lowercase(),
        )),
        other => Err(EvalError(format!("'{}' is not an allow-listed helper function", other))),
    }
}

/// Convenience used throughout the reader: parse and evaluate in one call.
pub fn eval_str(src: &str, ctx: &Context) -> Result<Value, EvalError> {
    evaluate(&parse(src)?, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(src: &str) -> f64 {
        eval_str(src, &Context::new()).unwrap().as_number().unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(num("2 + 3 * 4"), 14.0);
        assert_eq!(num("(2 + 3) * 4"), 20.0);
        assert_eq!(num("10 % 3"), 1.0);
    }

    #[test]
    fn comparisons_and_booleans() {
        let v = eval_str("1 < 2 && 3 >= 3", &Context::new()).unwrap();
        assert_eq!(v, Value::Bool(true));
        let v = eval_str("!(1 == 2)", &Context::new()).unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn string_concatenation_coerces_numbers() {
        let v = eval_str(r#""count: " + 3"#, &Context::new()).unwrap();
        assert_eq!(v, Value::String("count: 3".to_string()));
    }

    #[test]
    fn member_and_index_access() {
        let mut ctx = Context::new();
        ctx.set_global("xs", Value::Array(vec![Value::Number(10.0), Value::Number(20.0)]));
        assert_eq!(num("xs[1]"), 20.0);

        let mut obj = std::collections::BTreeMap::new();
        obj.insert("name".to_string(), Value::String("ok".to_string()));
        ctx.set_global("person", Value::Object(obj));
        let v = eval_str("person.name", &ctx).unwrap();
        assert_eq!(v, Value::String("ok".to_string()));
    }

    #[test]
    fn negative_index_wraps_from_the_end() {
        let mut ctx = Context::new();
        ctx.set_global(
            "xs",
            Value::Array(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]),
        );
        let v = eval_str("xs[-1]", &ctx).unwrap();
        assert_eq!(v, Value::Number(3.0));
    }

    #[test]
    fn allow_listed_helpers() {
        assert_eq!(num("len([1,2,3])"), 3.0);
        assert_eq!(eval_str("join([1,2,3], \"-\")", &Context::new()).unwrap(), Value::String("1-2-3".to_string()));
        assert_eq!(eval_str("upper(\"ok\")", &Context::new()).unwrap(), Value::String("OK".to_string()));
    }

    #[test]
    fn disallowed_function_is_rejected() {
        let err = eval_str("eval(\"1\")", &Context::new()).unwrap_err();
        assert!(err.0.contains("not an allow-listed helper"));
    }

    #[test]
    fn unknown_operator_character_is_rejected() {
        let err = eval_str("1 ~ 2", &Context::new()).unwrap_err();
        assert!(err.0.contains("unexpected character"));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        let err = parse("1 + 2 3").unwrap_err();
        assert!(err.0.contains("trailing tokens"));
    }
}
