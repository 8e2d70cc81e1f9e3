//! Literal evaluator: turns an extracted `OPTS` fragment into plain data.
//!
//! Only a narrow expression subset is understood and nothing is executed.
//! Free identifiers resolve against the invocation [`Context`] and nowhere
//! else. Two failure classes are kept apart:
//!
//! - loud: an unknown identifier ([`CompileError`]) or an unsupported node
//!   ([`GenerationError`]); discovery stops.
//! - soft: a runtime failure inside a computed sub-expression, e.g. reading a
//!   member of `undefined`. It is logged and the enclosing property value or
//!   array element becomes `undefined`.

use std::path::Path;

use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ChainElement, Expression, ObjectProperty,
    ObjectPropertyKind, PropertyKind, TemplateLiteral,
};
use oxc_span::{GetSpan, Span};
use oxc_syntax::operator::{BinaryOperator, LogicalOperator, UnaryOperator};

use super::codegen::{self, expression_kind};
use super::errors::{CompileError, DiscoveryError, GenerationError};
use super::extractor::CommandFragment;
use super::parser::line_of;
use super::value::{Builtin, Object, Value};
use crate::context::Context;

/// Property injected into every evaluated fragment.
pub const FILE_PATH_KEY: &str = "filePath";

enum Fault {
    Soft(String),
    Unresolved { name: String, line: usize },
    Unsupported { node: &'static str, line: usize },
    /// An optional chain hit `null`/`undefined`; the whole chain is `undefined`.
    ShortCircuit,
}

/// Evaluate `fragment` to an object, with `filePath` injected last.
pub fn evaluate(fragment: &CommandFragment<'_>, ctx: &Context) -> Result<Value, DiscoveryError> {
    let evaluator = Evaluator {
        path: &fragment.file_path,
        source_text: fragment.source_text,
        ctx,
    };
    let mut object = evaluator
        .properties(&fragment.properties)
        .map_err(|fault| evaluator.fail(fault, || codegen::generate(fragment).ok()))?;
    object.insert(
        FILE_PATH_KEY,
        Value::String(fragment.file_path.to_string_lossy().into_owned()),
    );
    Ok(Value::Object(object))
}

/// Evaluate a standalone expression taken from `source_text`.
pub fn evaluate_expression(
    expr: &Expression<'_>,
    path: &Path,
    source_text: &str,
    ctx: &Context,
) -> Result<Value, DiscoveryError> {
    let evaluator = Evaluator {
        path,
        source_text,
        ctx,
    };
    evaluator
        .guarded(expr)
        .map_err(|fault| evaluator.fail(fault, || None))
}

struct Evaluator<'e> {
    path: &'e Path,
    source_text: &'e str,
    ctx: &'e Context,
}

impl Evaluator<'_> {
    fn fail(&self, fault: Fault, generated: impl FnOnce() -> Option<String>) -> DiscoveryError {
        match fault {
            Fault::Unresolved { name, line } => CompileError::new(
                self.path,
                format!("{name} is not defined (line {line})"),
            )
            .with_generated(generated())
            .into(),
            Fault::Unsupported { node, line } => GenerationError {
                path: self.path.to_path_buf(),
                node,
                line,
            }
            .into(),
            Fault::Soft(message) => CompileError::new(self.path, message)
                .with_generated(generated())
                .into(),
            Fault::ShortCircuit => {
                CompileError::new(self.path, "optional chain escaped its expression")
                    .with_generated(generated())
                    .into()
            }
        }
    }

    fn line(&self, span: Span) -> usize {
        line_of(self.source_text, span.start as usize)
    }

    fn slice(&self, span: Span) -> &str {
        self.source_text
            .get(span.start as usize..span.end as usize)
            .unwrap_or_default()
    }

    fn unsupported(&self, node: &'static str, span: Span) -> Fault {
        Fault::Unsupported {
            node,
            line: self.line(span),
        }
    }

    /// Evaluate with soft failures downgraded to `undefined`.
    fn guarded(&self, expr: &Expression<'_>) -> Result<Value, Fault> {
        match self.expression(expr) {
            Err(Fault::Soft(message)) => {
                tracing::warn!(
                    "{} (line {}): {message}; using undefined",
                    self.path.display(),
                    self.line(expr.span())
                );
                Ok(Value::Undefined)
            }
            Err(Fault::ShortCircuit) => Ok(Value::Undefined),
            other => other,
        }
    }

    fn properties(&self, properties: &[ObjectPropertyKind<'_>]) -> Result<Object, Fault> {
        let mut object = Object::new();
        for property in properties {
            match property {
                ObjectPropertyKind::ObjectProperty(prop) => {
                    let key = match self.property_key(prop) {
                        Ok(key) => key,
                        Err(Fault::Soft(message)) => {
                            tracing::warn!(
                                "{} (line {}): {message}; skipping property",
                                self.path.display(),
                                self.line(prop.span)
                            );
                            continue;
                        }
                        Err(fault) => return Err(fault),
                    };
                    let value = self.property_value(prop, &key)?;
                    object.insert(key, value);
                }
                ObjectPropertyKind::SpreadProperty(spread) => {
                    let value = self.guarded(&spread.argument)?;
                    spread_into(&mut object, value);
                }
            }
        }
        Ok(object)
    }

    fn property_key(&self, prop: &ObjectProperty<'_>) -> Result<String, Fault> {
        if !prop.computed
            && let Some(name) = prop.key.static_name()
        {
            return Ok(name.into_owned());
        }
        match prop.key.as_expression() {
            Some(expr) => Ok(self.expression(expr)?.to_string()),
            None => Err(self.unsupported("PrivateIdentifier", prop.key.span())),
        }
    }

    fn property_value(&self, prop: &ObjectProperty<'_>, key: &str) -> Result<Value, Fault> {
        if prop.kind != PropertyKind::Init {
            return Err(self.unsupported("accessor property", prop.span));
        }
        if prop.method {
            let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""));
            return Ok(Value::Function(format!(
                "({{ {} }})[{quoted}]",
                self.slice(prop.span)
            )));
        }
        self.guarded(&prop.value)
    }

    fn expression(&self, expr: &Expression<'_>) -> Result<Value, Fault> {
        let expr = expr.get_inner_expression();
        match expr {
            Expression::NullLiteral(_) => Ok(Value::Null),
            Expression::BooleanLiteral(lit) => Ok(Value::Bool(lit.value)),
            Expression::NumericLiteral(lit) => Ok(Value::Number(lit.value)),
            Expression::StringLiteral(lit) => Ok(Value::String(lit.value.to_string())),
            Expression::TemplateLiteral(tpl) => self.template(tpl),
            Expression::Identifier(ident) => self.identifier(ident.name.as_str(), ident.span),
            Expression::ArrayExpression(array) => {
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    match element {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            match self.guarded(&spread.argument)? {
                                Value::Array(values) => items.extend(values),
                                Value::String(s) => {
                                    items.extend(s.chars().map(|c| Value::String(c.to_string())))
                                }
                                other => {
                                    tracing::warn!(
                                        "{} (line {}): {} is not iterable; using undefined",
                                        self.path.display(),
                                        self.line(spread.span),
                                        other.type_name()
                                    );
                                    items.push(Value::Undefined);
                                }
                            }
                        }
                        ArrayExpressionElement::Elision(_) => items.push(Value::Undefined),
                        _ => match element.as_expression() {
                            Some(expr) => items.push(self.guarded(expr)?),
                            None => return Err(self.unsupported("array element", array.span)),
                        },
                    }
                }
                Ok(Value::Array(items))
            }
            Expression::ObjectExpression(object) => {
                Ok(Value::Object(self.properties(&object.properties)?))
            }
            Expression::StaticMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                if member.optional && object.is_nullish() {
                    return Err(Fault::ShortCircuit);
                }
                read_member(&object, member.property.name.as_str())
            }
            Expression::ComputedMemberExpression(member) => {
                let object = self.expression(&member.object)?;
                if member.optional && object.is_nullish() {
                    return Err(Fault::ShortCircuit);
                }
                let key = self.expression(&member.expression)?.to_string();
                read_member(&object, &key)
            }
            Expression::ChainExpression(chain) => {
                let result = match &chain.expression {
                    ChainElement::CallExpression(call) => {
                        self.call(&call.callee, &call.arguments, call.optional)
                    }
                    ChainElement::StaticMemberExpression(member) => {
                        self.expression(&member.object).and_then(|object| {
                            if member.optional && object.is_nullish() {
                                Err(Fault::ShortCircuit)
                            } else {
                                read_member(&object, member.property.name.as_str())
                            }
                        })
                    }
                    ChainElement::ComputedMemberExpression(member) => {
                        self.expression(&member.object).and_then(|object| {
                            if member.optional && object.is_nullish() {
                                return Err(Fault::ShortCircuit);
                            }
                            let key = self.expression(&member.expression)?.to_string();
                            read_member(&object, &key)
                        })
                    }
                    _ => Err(self.unsupported("optional chain element", chain.span)),
                };
                match result {
                    Err(Fault::ShortCircuit) => Ok(Value::Undefined),
                    other => other,
                }
            }
            Expression::CallExpression(call) => {
                self.call(&call.callee, &call.arguments, call.optional)
            }
            Expression::ArrowFunctionExpression(arrow) => {
                Ok(Value::Function(self.slice(arrow.span).to_string()))
            }
            Expression::FunctionExpression(function) => {
                Ok(Value::Function(self.slice(function.span).to_string()))
            }
            Expression::UnaryExpression(unary) => {
                let operand = self.expression(&unary.argument)?;
                match unary.operator {
                    UnaryOperator::UnaryNegation => Ok(Value::Number(-to_number(&operand))),
                    UnaryOperator::UnaryPlus => Ok(Value::Number(to_number(&operand))),
                    UnaryOperator::LogicalNot => Ok(Value::Bool(!operand.is_truthy())),
                    UnaryOperator::Typeof => Ok(Value::String(type_of(&operand).to_string())),
                    UnaryOperator::Void => Ok(Value::Undefined),
                    _ => Err(self.unsupported("unary operator", unary.span)),
                }
            }
            Expression::BinaryExpression(binary) => {
                let left = self.expression(&binary.left)?;
                let right = self.expression(&binary.right)?;
                match binary.operator {
                    BinaryOperator::Addition => Ok(add(&left, &right)),
                    BinaryOperator::Subtraction => {
                        Ok(Value::Number(to_number(&left) - to_number(&right)))
                    }
                    BinaryOperator::Multiplication => {
                        Ok(Value::Number(to_number(&left) * to_number(&right)))
                    }
                    BinaryOperator::Division => {
                        Ok(Value::Number(to_number(&left) / to_number(&right)))
                    }
                    BinaryOperator::Remainder => {
                        Ok(Value::Number(to_number(&left) % to_number(&right)))
                    }
                    BinaryOperator::StrictEquality => Ok(Value::Bool(strict_equals(&left, &right))),
                    BinaryOperator::StrictInequality => {
                        Ok(Value::Bool(!strict_equals(&left, &right)))
                    }
                    _ => Err(self.unsupported("binary operator", binary.span)),
                }
            }
            Expression::LogicalExpression(logical) => {
                let left = self.expression(&logical.left)?;
                let take_left = match logical.operator {
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Coalesce => !left.is_nullish(),
                };
                if take_left {
                    Ok(left)
                } else {
                    self.expression(&logical.right)
                }
            }
            Expression::ConditionalExpression(cond) => {
                if self.expression(&cond.test)?.is_truthy() {
                    self.expression(&cond.consequent)
                } else {
                    self.expression(&cond.alternate)
                }
            }
            other => Err(self.unsupported(expression_kind(other), other.span())),
        }
    }

    fn template(&self, tpl: &TemplateLiteral<'_>) -> Result<Value, Fault> {
        let mut out = String::new();
        for (idx, quasi) in tpl.quasis.iter().enumerate() {
            match &quasi.value.cooked {
                Some(cooked) => out.push_str(cooked.as_str()),
                None => out.push_str(quasi.value.raw.as_str()),
            }
            if let Some(expr) = tpl.expressions.get(idx) {
                out.push_str(&self.expression(expr)?.to_string());
            }
        }
        Ok(Value::String(out))
    }

    fn identifier(&self, name: &str, span: Span) -> Result<Value, Fault> {
        match name {
            "undefined" => Ok(Value::Undefined),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            _ => self
                .ctx
                .global(name)
                .cloned()
                .ok_or_else(|| Fault::Unresolved {
                    name: name.to_string(),
                    line: self.line(span),
                }),
        }
    }

    fn call(
        &self,
        callee: &Expression<'_>,
        arguments: &[Argument<'_>],
        optional: bool,
    ) -> Result<Value, Fault> {
        let target = self.expression(callee)?;
        if optional && target.is_nullish() {
            return Err(Fault::ShortCircuit);
        }
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            match argument {
                Argument::SpreadElement(spread) => match self.expression(&spread.argument)? {
                    Value::Array(values) => args.extend(values),
                    other => {
                        return Err(Fault::Soft(format!(
                            "{} is not iterable",
                            other.type_name()
                        )));
                    }
                },
                _ => match argument.as_expression() {
                    Some(expr) => args.push(self.expression(expr)?),
                    None => return Err(self.unsupported("call argument", callee.span())),
                },
            }
        }
        match target {
            Value::Builtin(builtin) => self.apply(builtin, &args),
            other => Err(Fault::Soft(format!(
                "{} is not a callable helper",
                describe_callee(self.slice(callee.span()), &other)
            ))),
        }
    }

    fn apply(&self, builtin: Builtin, args: &[Value]) -> Result<Value, Fault> {
        let result = match builtin {
            Builtin::String => args.first().map(Value::to_string).unwrap_or_default(),
            Builtin::Join => {
                let joined = path_args(builtin, args)?
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("/");
                if joined.is_empty() {
                    ".".to_string()
                } else {
                    normalize(&joined)
                }
            }
            Builtin::Resolve => {
                let mut resolved = self.ctx.cwd().to_string_lossy().into_owned();
                for segment in path_args(builtin, args)? {
                    if segment.starts_with('/') {
                        resolved = segment.to_string();
                    } else if !segment.is_empty() {
                        resolved = format!("{resolved}/{segment}");
                    }
                }
                normalize(&resolved)
            }
            Builtin::Dirname => dirname(first_path(builtin, args)?),
            Builtin::Basename => {
                let paths = path_args(builtin, args)?;
                let base = basename(first_path(builtin, args)?);
                match paths.get(1).copied() {
                    Some(ext) if !ext.is_empty() && base != ext => {
                        base.strip_suffix(ext).unwrap_or(&base).to_string()
                    }
                    _ => base,
                }
            }
            Builtin::Extname => extname(first_path(builtin, args)?),
        };
        Ok(Value::String(result))
    }
}

fn path_args(builtin: Builtin, args: &[Value]) -> Result<Vec<&str>, Fault> {
    args.iter()
        .map(|arg| match arg {
            Value::String(s) => Ok(s.as_str()),
            other => Err(Fault::Soft(format!(
                "{}: path arguments must be strings, got {}",
                builtin.source_name(),
                other.type_name()
            ))),
        })
        .collect()
}

fn first_path(builtin: Builtin, args: &[Value]) -> Result<&str, Fault> {
    path_args(builtin, args)?
        .first()
        .copied()
        .ok_or_else(|| Fault::Soft(format!("{}: missing path argument", builtin.source_name())))
}

fn describe_callee(source: &str, value: &Value) -> String {
    if source.is_empty() {
        value.type_name().to_string()
    } else {
        format!("{source} ({})", value.type_name())
    }
}

fn spread_into(object: &mut Object, value: Value) {
    match value {
        Value::Object(other) => object.extend(&other),
        Value::Array(items) => {
            for (idx, item) in items.into_iter().enumerate() {
                object.insert(idx.to_string(), item);
            }
        }
        Value::String(s) => {
            for (idx, c) in s.chars().enumerate() {
                object.insert(idx.to_string(), Value::String(c.to_string()));
            }
        }
        _ => {}
    }
}

fn read_member(object: &Value, key: &str) -> Result<Value, Fault> {
    match object {
        Value::Undefined | Value::Null => Err(Fault::Soft(format!(
            "Cannot read properties of {} (reading '{key}')",
            object.type_name()
        ))),
        Value::Object(map) => Ok(map.get(key).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) if key == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|idx| items.get(idx).cloned())
            .unwrap_or(Value::Undefined)),
        Value::String(s) if key == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::String(s) => Ok(key
            .parse::<usize>()
            .ok()
            .and_then(|idx| s.chars().nth(idx))
            .map_or(Value::Undefined, |c| Value::String(c.to_string()))),
        _ => Ok(Value::Undefined),
    }
}

fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
        other => other.type_name(),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        _ => f64::NAN,
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let stringy = |v: &Value| {
        matches!(
            v,
            Value::String(_)
                | Value::Array(_)
                | Value::Object(_)
                | Value::Function(_)
                | Value::Builtin(_)
        )
    };
    if stringy(left) || stringy(right) {
        Value::String(format!("{left}{right}"))
    } else {
        Value::Number(to_number(left) + to_number(right))
    }
}

fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Array(_), _) | (Value::Object(_), _) => false,
        _ => left == right,
    }
}

/// Lexical `.`/`..` normalization of a `/`-separated path.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

fn dirname(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.starts_with('/') { "/" } else { "." }.to_string();
    }
    match trimmed.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
        None => ".".to_string(),
    }
}

fn basename(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn extname(path: &str) -> String {
    let base = basename(path);
    match base.rfind('.') {
        Some(idx) if idx > 0 => base[idx..].to_string(),
        _ => String::new(),
    }
}
