//! Embedded expression language for rule filters and setting templates.
//!
//! Expressions are compiled once, against the fixed shape of
//! [`DeviceSnapshot`], and evaluated per device. Compilation performs full
//! syntax and type checking so a malformed or type-incompatible expression is
//! rejected when the definition is compiled rather than on every evaluation.
//!
//! ## Syntax
//!
//! ```text
//! 0x0006 in endpoint.in_clusters
//! has_product && product.manufacturer == "IKEA of Sweden"
//! device_has_in_cluster(0x0001) || node.manufacturer_code == 0x117C
//! self
//! ```
//!
//! Precedence, loosest to tightest: `||`, `&&`, comparison/`in`, `!`.
//! `&&` and `||` short-circuit, which is the supported way to guard the
//! strict `product.*` and `endpoint.*` lookups with `has_product` or a
//! cluster check.
//!
//! ## Context paths
//!
//! | Path | Type |
//! |------|------|
//! | `self` | Int |
//! | `node.manufacturer_code` | Int |
//! | `endpoint.profile`, `endpoint.device_type` | Int |
//! | `endpoint.in_clusters`, `endpoint.out_clusters` | List(Int) |
//! | `has_product` | Bool |
//! | `product.manufacturer`, `product.name`, `product.version` | Str |
//!
//! `endpoint.*` and `product.*` resolve against the snapshot's self endpoint
//! and fail evaluation when the corresponding facts are absent.

use std::fmt;

use meshcap_core::DeviceSnapshot;
use serde::{Deserialize, Serialize};

/// A value produced by expression evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// The static type of this value.
    pub fn value_type(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Str(_) => Type::Str,
            Value::List(items) => {
                let elem = items
                    .first()
                    .map(Value::value_type)
                    .unwrap_or(Type::Int);
                Type::List(Box::new(elem))
            }
        }
    }
}

/// Static expression types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    Str,
    List(Box<Type>),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Str => write!(f, "Str"),
            Type::List(elem) => write!(f, "List({})", elem),
        }
    }
}

/// Errors detected while compiling an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprCompileError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("function {name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}

/// Errors raised while evaluating a compiled expression against a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprEvalError {
    /// `endpoint.*` was referenced but the snapshot has no facts for the
    /// self endpoint.
    #[error("no endpoint facts for endpoint {0}")]
    MissingEndpointFacts(u8),

    /// `product.*` was referenced but the snapshot has no product identity
    /// for the self endpoint.
    #[error("no product facts for endpoint {0}")]
    MissingProductFacts(u8),

    /// An operand had a type the operator cannot handle. Unreachable for
    /// expressions produced by [`ExprLanguage`]; foreign
    /// [`CompiledExpression`] implementations may surface it.
    #[error("runtime type mismatch: {0}")]
    TypeMismatch(String),
}

/// An executable expression handle.
///
/// Everything reachable from a compiled engine must be shareable across
/// concurrent evaluations, hence the `Send + Sync` bound. Evaluation is pure:
/// the same snapshot always produces the same result.
pub trait CompiledExpression: fmt::Debug + Send + Sync {
    fn evaluate(&self, snapshot: &DeviceSnapshot) -> Result<Value, ExprEvalError>;
}

/// Compiles expression source into executable handles.
///
/// The engine consumes expressions through this trait so the concrete
/// grammar is swappable without touching the resolver, compiler, or
/// executor. [`ExprLanguage`] is the built-in implementation.
pub trait ExpressionCompiler: Send + Sync {
    /// Compile a boolean filter expression.
    fn compile_predicate(
        &self,
        source: &str,
    ) -> Result<Box<dyn CompiledExpression>, ExprCompileError>;

    /// Compile a setting-value expression of any type.
    fn compile_value(&self, source: &str)
        -> Result<Box<dyn CompiledExpression>, ExprCompileError>;
}

/// A pre-evaluated constant, used for literal setting templates.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstExpr(pub Value);

impl CompiledExpression for ConstExpr {
    fn evaluate(&self, _snapshot: &DeviceSnapshot) -> Result<Value, ExprEvalError> {
        Ok(self.0.clone())
    }
}

/// Context paths resolvable against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextPath {
    SelfEndpoint,
    ManufacturerCode,
    EndpointProfile,
    EndpointDeviceType,
    EndpointInClusters,
    EndpointOutClusters,
    HasProduct,
    ProductManufacturer,
    ProductName,
    ProductVersion,
}

impl ContextPath {
    fn lookup(path: &str) -> Option<Self> {
        match path {
            "self" => Some(Self::SelfEndpoint),
            "node.manufacturer_code" => Some(Self::ManufacturerCode),
            "endpoint.profile" => Some(Self::EndpointProfile),
            "endpoint.device_type" => Some(Self::EndpointDeviceType),
            "endpoint.in_clusters" => Some(Self::EndpointInClusters),
            "endpoint.out_clusters" => Some(Self::EndpointOutClusters),
            "has_product" => Some(Self::HasProduct),
            "product.manufacturer" => Some(Self::ProductManufacturer),
            "product.name" => Some(Self::ProductName),
            "product.version" => Some(Self::ProductVersion),
            _ => None,
        }
    }

    fn path_type(self) -> Type {
        match self {
            Self::SelfEndpoint
            | Self::ManufacturerCode
            | Self::EndpointProfile
            | Self::EndpointDeviceType => Type::Int,
            Self::EndpointInClusters | Self::EndpointOutClusters => {
                Type::List(Box::new(Type::Int))
            }
            Self::HasProduct => Type::Bool,
            Self::ProductManufacturer | Self::ProductName | Self::ProductVersion => Type::Str,
        }
    }
}

/// Built-in functions with fixed signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    DeviceHasInCluster,
    DeviceHasOutCluster,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "device_has_in_cluster" => Some(Self::DeviceHasInCluster),
            "device_has_out_cluster" => Some(Self::DeviceHasOutCluster),
            _ => None,
        }
    }

    fn arg_types(self) -> &'static [Type] {
        match self {
            Self::DeviceHasInCluster | Self::DeviceHasOutCluster => &[Type::Int],
        }
    }

    fn return_type(self) -> Type {
        match self {
            Self::DeviceHasInCluster | Self::DeviceHasOutCluster => Type::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Path(ContextPath),
    Call(Func, Vec<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

// ---- lexer ----

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Comma,
    AndAnd,
    OrOr,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn syntax(offset: usize, message: impl Into<String>) -> ExprCompileError {
    ExprCompileError::Syntax {
        offset,
        message: message.into(),
    }
}

fn lex(source: &str) -> Result<Vec<(usize, Token)>, ExprCompileError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push((i, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::RParen));
                i += 1;
            }
            ',' => {
                tokens.push((i, Token::Comma));
                i += 1;
            }
            '&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push((i, Token::AndAnd));
                    i += 2;
                } else {
                    return Err(syntax(i, "expected '&&'"));
                }
            }
            '|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push((i, Token::OrOr));
                    i += 2;
                } else {
                    return Err(syntax(i, "expected '||'"));
                }
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((i, Token::EqEq));
                    i += 2;
                } else {
                    return Err(syntax(i, "expected '=='"));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((i, Token::NotEq));
                    i += 2;
                } else {
                    tokens.push((i, Token::Bang));
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((i, Token::Le));
                    i += 2;
                } else {
                    tokens.push((i, Token::Lt));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push((i, Token::Ge));
                    i += 2;
                } else {
                    tokens.push((i, Token::Gt));
                    i += 1;
                }
            }
            '"' => {
                let start = i;
                i += 1;
                let mut s = String::new();
                loop {
                    let mut chars = source[i..].chars();
                    match chars.next() {
                        None => return Err(syntax(start, "unterminated string literal")),
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            match chars.next() {
                                Some('"') => s.push('"'),
                                Some('\\') => s.push('\\'),
                                _ => return Err(syntax(i, "invalid escape sequence")),
                            }
                            i += 2;
                        }
                        Some(c) => {
                            s.push(c);
                            i += c.len_utf8();
                        }
                    }
                }
                tokens.push((start, Token::Str(s)));
            }
            '0'..='9' => {
                let start = i;
                let (value, len) = lex_number(&source[i..])
                    .ok_or_else(|| syntax(start, "invalid numeric literal"))?;
                tokens.push((start, Token::Int(value)));
                i += len;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len() {
                    let b = bytes[i] as char;
                    if b.is_ascii_alphanumeric() || b == '_' || b == '.' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push((start, Token::Ident(source[start..i].to_string())));
            }
            _ => return Err(syntax(i, format!("unexpected character '{}'", c))),
        }
    }

    Ok(tokens)
}

/// Lex a decimal or `0x` hexadecimal integer. Returns the value and the
/// number of bytes consumed.
fn lex_number(s: &str) -> Option<(i64, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'0' && bytes[1] == b'x' {
        let mut end = 2;
        while end < bytes.len() && (bytes[end] as char).is_ascii_hexdigit() {
            end += 1;
        }
        if end == 2 {
            return None;
        }
        let value = i64::from_str_radix(&s[2..end], 16).ok()?;
        Some((value, end))
    } else {
        let mut end = 0;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let value = s[..end].parse().ok()?;
        Some((value, end))
    }
}

// ---- parser ----

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, ExprCompileError> {
        Ok(Self {
            tokens: lex(source)?,
            pos: 0,
            end: source.len(),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.end)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), ExprCompileError> {
        let offset = self.offset();
        match self.next() {
            Some((_, t)) if t == token => Ok(()),
            _ => Err(syntax(offset, format!("expected {}", what))),
        }
    }

    fn parse(mut self) -> Result<Expr, ExprCompileError> {
        let expr = self.parse_or()?;
        if self.peek().is_some() {
            return Err(syntax(self.offset(), "unexpected trailing input"));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ExprCompileError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::OrOr) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprCompileError> {
        let mut left = self.parse_comparison()?;
        while self.peek() == Some(&Token::AndAnd) {
            self.next();
            let right = self.parse_comparison()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprCompileError> {
        let left = self.parse_unary()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinOp::Eq,
            Some(Token::NotEq) => BinOp::Ne,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Le) => BinOp::Le,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::Ident(name)) if name == "in" => BinOp::In,
            _ => return Ok(left),
        };
        self.next();
        let right = self.parse_unary()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprCompileError> {
        if self.peek() == Some(&Token::Bang) {
            self.next();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprCompileError> {
        let offset = self.offset();
        match self.next() {
            Some((_, Token::Int(v))) => Ok(Expr::Literal(Value::Int(v))),
            Some((_, Token::Str(s))) => Ok(Expr::Literal(Value::Str(s))),
            Some((_, Token::LParen)) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some((_, Token::Ident(name))) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                _ => {
                    if self.peek() == Some(&Token::LParen) {
                        self.parse_call(&name)
                    } else if let Some(path) = ContextPath::lookup(&name) {
                        Ok(Expr::Path(path))
                    } else {
                        Err(ExprCompileError::UnknownIdentifier(name))
                    }
                }
            },
            _ => Err(syntax(offset, "expected expression")),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, ExprCompileError> {
        let func =
            Func::lookup(name).ok_or_else(|| ExprCompileError::UnknownFunction(name.to_string()))?;
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.peek() == Some(&Token::Comma) {
                    self.next();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen, "')'")?;

        if args.len() != func.arg_types().len() {
            return Err(ExprCompileError::Arity {
                name: name.to_string(),
                expected: func.arg_types().len(),
                got: args.len(),
            });
        }
        Ok(Expr::Call(func, args))
    }
}

// ---- type checker ----

fn mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> ExprCompileError {
    ExprCompileError::TypeMismatch {
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn check(expr: &Expr) -> Result<Type, ExprCompileError> {
    match expr {
        Expr::Literal(v) => Ok(v.value_type()),
        Expr::Path(path) => Ok(path.path_type()),
        Expr::Call(func, args) => {
            for (arg, expected) in args.iter().zip(func.arg_types()) {
                let found = check(arg)?;
                if found != *expected {
                    return Err(mismatch(expected, found));
                }
            }
            Ok(func.return_type())
        }
        Expr::Not(inner) => {
            let ty = check(inner)?;
            if ty != Type::Bool {
                return Err(mismatch(Type::Bool, ty));
            }
            Ok(Type::Bool)
        }
        Expr::Binary(op, left, right) => {
            let lt = check(left)?;
            let rt = check(right)?;
            match op {
                BinOp::And | BinOp::Or => {
                    if lt != Type::Bool {
                        return Err(mismatch(Type::Bool, lt));
                    }
                    if rt != Type::Bool {
                        return Err(mismatch(Type::Bool, rt));
                    }
                    Ok(Type::Bool)
                }
                BinOp::Eq | BinOp::Ne => {
                    if lt != rt {
                        return Err(mismatch(lt, rt));
                    }
                    Ok(Type::Bool)
                }
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    if lt != Type::Int {
                        return Err(mismatch(Type::Int, lt));
                    }
                    if rt != Type::Int {
                        return Err(mismatch(Type::Int, rt));
                    }
                    Ok(Type::Bool)
                }
                BinOp::In => match rt {
                    Type::List(elem) => {
                        if lt != *elem {
                            return Err(mismatch(*elem, lt));
                        }
                        Ok(Type::Bool)
                    }
                    other => Err(mismatch("List", other)),
                },
            }
        }
    }
}

// ---- evaluator ----

fn eval(expr: &Expr, snapshot: &DeviceSnapshot) -> Result<Value, ExprEvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(path) => eval_path(*path, snapshot),
        Expr::Call(func, args) => {
            let cluster = match eval(&args[0], snapshot)? {
                Value::Int(v) => v,
                other => {
                    return Err(ExprEvalError::TypeMismatch(format!(
                        "function argument must be Int, got {}",
                        other.value_type()
                    )))
                }
            };
            let cluster = u16::try_from(cluster).map_err(|_| {
                ExprEvalError::TypeMismatch(format!("cluster id {} out of range", cluster))
            })?;
            let found = match func {
                Func::DeviceHasInCluster => snapshot.has_in_cluster(cluster),
                Func::DeviceHasOutCluster => snapshot.has_out_cluster(cluster),
            };
            Ok(Value::Bool(found))
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval_bool(inner, snapshot)?)),
        Expr::Binary(op, left, right) => match op {
            // Short-circuit: the right side is not evaluated when the left
            // side decides, so strict lookups can be guarded.
            BinOp::And => {
                if !eval_bool(left, snapshot)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval_bool(right, snapshot)?))
            }
            BinOp::Or => {
                if eval_bool(left, snapshot)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval_bool(right, snapshot)?))
            }
            BinOp::Eq => Ok(Value::Bool(eval(left, snapshot)? == eval(right, snapshot)?)),
            BinOp::Ne => Ok(Value::Bool(eval(left, snapshot)? != eval(right, snapshot)?)),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let l = eval_int(left, snapshot)?;
                let r = eval_int(right, snapshot)?;
                let result = match op {
                    BinOp::Lt => l < r,
                    BinOp::Le => l <= r,
                    BinOp::Gt => l > r,
                    BinOp::Ge => l >= r,
                    _ => unreachable!(),
                };
                Ok(Value::Bool(result))
            }
            BinOp::In => {
                let needle = eval(left, snapshot)?;
                match eval(right, snapshot)? {
                    Value::List(items) => Ok(Value::Bool(items.contains(&needle))),
                    other => Err(ExprEvalError::TypeMismatch(format!(
                        "'in' requires a list, got {}",
                        other.value_type()
                    ))),
                }
            }
        },
    }
}

fn eval_bool(expr: &Expr, snapshot: &DeviceSnapshot) -> Result<bool, ExprEvalError> {
    match eval(expr, snapshot)? {
        Value::Bool(b) => Ok(b),
        other => Err(ExprEvalError::TypeMismatch(format!(
            "expected Bool, got {}",
            other.value_type()
        ))),
    }
}

fn eval_int(expr: &Expr, snapshot: &DeviceSnapshot) -> Result<i64, ExprEvalError> {
    match eval(expr, snapshot)? {
        Value::Int(v) => Ok(v),
        other => Err(ExprEvalError::TypeMismatch(format!(
            "expected Int, got {}",
            other.value_type()
        ))),
    }
}

fn eval_path(path: ContextPath, snapshot: &DeviceSnapshot) -> Result<Value, ExprEvalError> {
    let endpoint_facts = || {
        snapshot
            .self_facts()
            .ok_or(ExprEvalError::MissingEndpointFacts(snapshot.self_endpoint))
    };
    let product_facts = || {
        snapshot
            .self_product()
            .ok_or(ExprEvalError::MissingProductFacts(snapshot.self_endpoint))
    };
    let cluster_list =
        |clusters: &[u16]| Value::List(clusters.iter().map(|c| Value::Int(*c as i64)).collect());

    match path {
        ContextPath::SelfEndpoint => Ok(Value::Int(snapshot.self_endpoint as i64)),
        ContextPath::ManufacturerCode => Ok(Value::Int(snapshot.node.manufacturer_code as i64)),
        ContextPath::EndpointProfile => Ok(Value::Int(endpoint_facts()?.profile as i64)),
        ContextPath::EndpointDeviceType => Ok(Value::Int(endpoint_facts()?.device_type as i64)),
        ContextPath::EndpointInClusters => Ok(cluster_list(&endpoint_facts()?.in_clusters)),
        ContextPath::EndpointOutClusters => Ok(cluster_list(&endpoint_facts()?.out_clusters)),
        ContextPath::HasProduct => Ok(Value::Bool(snapshot.self_product().is_some())),
        ContextPath::ProductManufacturer => {
            Ok(Value::Str(product_facts()?.manufacturer.clone()))
        }
        ContextPath::ProductName => Ok(Value::Str(product_facts()?.name.clone())),
        ContextPath::ProductVersion => Ok(Value::Str(product_facts()?.version.clone())),
    }
}

// ---- compiler ----

/// A compiled expression: source retained for diagnostics, checked AST for
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
struct Compiled {
    source: String,
    ast: Expr,
}

impl CompiledExpression for Compiled {
    fn evaluate(&self, snapshot: &DeviceSnapshot) -> Result<Value, ExprEvalError> {
        eval(&self.ast, snapshot)
    }
}

/// The built-in expression language.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprLanguage;

impl ExprLanguage {
    fn compile(&self, source: &str) -> Result<(Expr, Type), ExprCompileError> {
        let ast = Parser::new(source)?.parse()?;
        let ty = check(&ast)?;
        Ok((ast, ty))
    }
}

impl ExpressionCompiler for ExprLanguage {
    fn compile_predicate(
        &self,
        source: &str,
    ) -> Result<Box<dyn CompiledExpression>, ExprCompileError> {
        let (ast, ty) = self.compile(source)?;
        if ty != Type::Bool {
            return Err(mismatch(Type::Bool, ty));
        }
        Ok(Box::new(Compiled {
            source: source.to_string(),
            ast,
        }))
    }

    fn compile_value(
        &self,
        source: &str,
    ) -> Result<Box<dyn CompiledExpression>, ExprCompileError> {
        let (ast, _) = self.compile(source)?;
        Ok(Box::new(Compiled {
            source: source.to_string(),
            ast,
        }))
    }
}
