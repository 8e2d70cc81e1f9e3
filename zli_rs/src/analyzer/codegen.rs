//! Source regeneration for option fragments and plain values.
//!
//! Output is deterministic (4-space indent, one property per line) and
//! parses back to the same value. Functions are copied verbatim from the
//! original source span.

use std::fmt::Write as _;

use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ChainElement, Expression, ObjectPropertyKind,
    PropertyKind, TemplateLiteral,
};
use oxc_span::{GetSpan, Span};

use super::errors::GenerationError;
use super::evaluator::FILE_PATH_KEY;
use super::extractor::CommandFragment;
use super::parser::line_of;
use super::value::{Value, format_number};

const INDENT: &str = "    ";

/// Render `fragment` as an object literal with `filePath` last.
pub fn generate(fragment: &CommandFragment<'_>) -> Result<String, GenerationError> {
    let generator = Generator { fragment };
    let mut entries = fragment
        .properties
        .iter()
        .map(|property| generator.property(property, 1))
        .collect::<Result<Vec<_>, _>>()?;
    entries.push(format!(
        "{FILE_PATH_KEY}: {}",
        quote(&fragment.file_path.to_string_lossy())
    ));
    Ok(block('{', '}', &entries, 0))
}

/// Render a plain value as a literal expression.
pub fn generate_value(value: &Value) -> String {
    render_value(value, 0)
}

fn render_value(value: &Value, depth: usize) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let entries: Vec<String> = items
                .iter()
                .map(|item| render_value(item, depth + 1))
                .collect();
            block('[', ']', &entries, depth)
        }
        Value::Object(object) => {
            let entries: Vec<String> = object
                .iter()
                .map(|(key, value)| format!("{}: {}", render_key(key), render_value(value, depth + 1)))
                .collect();
            block('{', '}', &entries, depth)
        }
        Value::Function(source) => source.clone(),
        Value::Builtin(builtin) => builtin.source_name().to_string(),
    }
}

fn block(open: char, close: char, entries: &[String], depth: usize) -> String {
    if entries.is_empty() {
        return format!("{open}{close}");
    }
    let inner = INDENT.repeat(depth + 1);
    let mut out = String::new();
    out.push(open);
    out.push('\n');
    for (idx, entry) in entries.iter().enumerate() {
        out.push_str(&inner);
        out.push_str(entry);
        if idx + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push_str(&INDENT.repeat(depth));
    out.push(close);
    out
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.replace('"', "\\\"")))
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn render_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

struct Generator<'f, 'a> {
    fragment: &'f CommandFragment<'a>,
}

impl Generator<'_, '_> {
    fn slice(&self, span: Span) -> &str {
        self.fragment.slice(span.start, span.end)
    }

    fn unsupported(&self, node: &'static str, span: Span) -> GenerationError {
        GenerationError {
            path: self.fragment.file_path.clone(),
            node,
            line: line_of(self.fragment.source_text, span.start as usize),
        }
    }

    fn property(
        &self,
        property: &ObjectPropertyKind<'_>,
        depth: usize,
    ) -> Result<String, GenerationError> {
        match property {
            ObjectPropertyKind::SpreadProperty(spread) => {
                Ok(format!("...{}", self.expression(&spread.argument, depth)?))
            }
            ObjectPropertyKind::ObjectProperty(prop) => {
                if prop.kind != PropertyKind::Init {
                    return Err(self.unsupported("accessor property", prop.span));
                }
                if prop.method {
                    return Ok(self.slice(prop.span).to_string());
                }
                let key = if prop.computed {
                    match prop.key.as_expression() {
                        Some(expr) => format!("[{}]", self.expression(expr, depth)?),
                        None => return Err(self.unsupported("PrivateIdentifier", prop.key.span())),
                    }
                } else {
                    match prop.key.static_name() {
                        Some(name) => render_key(&name),
                        None => return Err(self.unsupported("property key", prop.key.span())),
                    }
                };
                Ok(format!("{key}: {}", self.expression(&prop.value, depth)?))
            }
        }
    }

    fn expression(&self, expr: &Expression<'_>, depth: usize) -> Result<String, GenerationError> {
        let expr = expr.get_inner_expression();
        Ok(match expr {
            Expression::NullLiteral(_) => "null".to_string(),
            Expression::BooleanLiteral(lit) => lit.value.to_string(),
            Expression::NumericLiteral(lit) => format_number(lit.value),
            Expression::StringLiteral(lit) => quote(lit.value.as_str()),
            Expression::TemplateLiteral(tpl) => self.template(tpl, depth)?,
            Expression::Identifier(ident) => ident.name.to_string(),
            Expression::ArrayExpression(array) => {
                let mut entries = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    entries.push(match element {
                        ArrayExpressionElement::SpreadElement(spread) => {
                            format!("...{}", self.expression(&spread.argument, depth + 1)?)
                        }
                        ArrayExpressionElement::Elision(_) => String::new(),
                        _ => match element.as_expression() {
                            Some(inner) => self.expression(inner, depth + 1)?,
                            None => return Err(self.unsupported("array element", array.span)),
                        },
                    });
                }
                if entries.last().is_some_and(String::is_empty) {
                    // a trailing hole needs its own comma to survive re-parsing
                    entries.push(String::new());
                }
                block('[', ']', &entries, depth)
            }
            Expression::ObjectExpression(object) => {
                let entries = object
                    .properties
                    .iter()
                    .map(|property| self.property(property, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                block('{', '}', &entries, depth)
            }
            Expression::StaticMemberExpression(member) => format!(
                "{}{}{}",
                self.operand(&member.object, depth)?,
                if member.optional { "?." } else { "." },
                member.property.name
            ),
            Expression::ComputedMemberExpression(member) => format!(
                "{}{}[{}]",
                self.operand(&member.object, depth)?,
                if member.optional { "?." } else { "" },
                self.expression(&member.expression, depth)?
            ),
            Expression::ChainExpression(chain) => match &chain.expression {
                ChainElement::CallExpression(call) => {
                    self.call(&call.callee, &call.arguments, call.optional, depth)?
                }
                ChainElement::StaticMemberExpression(member) => format!(
                    "{}{}{}",
                    self.operand(&member.object, depth)?,
                    if member.optional { "?." } else { "." },
                    member.property.name
                ),
                ChainElement::ComputedMemberExpression(member) => format!(
                    "{}{}[{}]",
                    self.operand(&member.object, depth)?,
                    if member.optional { "?." } else { "" },
                    self.expression(&member.expression, depth)?
                ),
                _ => return Err(self.unsupported("optional chain element", chain.span)),
            },
            Expression::CallExpression(call) => {
                self.call(&call.callee, &call.arguments, call.optional, depth)?
            }
            Expression::ArrowFunctionExpression(arrow) => self.slice(arrow.span).to_string(),
            Expression::FunctionExpression(function) => self.slice(function.span).to_string(),
            Expression::UnaryExpression(unary) => {
                let op = unary.operator.as_str();
                let spacer = if op.chars().all(char::is_alphabetic) { " " } else { "" };
                format!("{op}{spacer}{}", self.operand(&unary.argument, depth)?)
            }
            Expression::BinaryExpression(binary) => format!(
                "{} {} {}",
                self.operand(&binary.left, depth)?,
                binary.operator.as_str(),
                self.operand(&binary.right, depth)?
            ),
            Expression::LogicalExpression(logical) => format!(
                "{} {} {}",
                self.operand(&logical.left, depth)?,
                logical.operator.as_str(),
                self.operand(&logical.right, depth)?
            ),
            Expression::ConditionalExpression(cond) => format!(
                "{} ? {} : {}",
                self.operand(&cond.test, depth)?,
                self.operand(&cond.consequent, depth)?,
                self.operand(&cond.alternate, depth)?
            ),
            other => return Err(self.unsupported(expression_kind(other), other.span())),
        })
    }

    /// Sub-expression of an operator, parenthesized when it is compound.
    fn operand(&self, expr: &Expression<'_>, depth: usize) -> Result<String, GenerationError> {
        let rendered = self.expression(expr, depth)?;
        Ok(match expr.get_inner_expression() {
            Expression::BinaryExpression(_)
            | Expression::LogicalExpression(_)
            | Expression::ConditionalExpression(_)
            | Expression::UnaryExpression(_)
            | Expression::ArrowFunctionExpression(_)
            | Expression::FunctionExpression(_)
            | Expression::ObjectExpression(_) => format!("({rendered})"),
            _ => rendered,
        })
    }

    fn call(
        &self,
        callee: &Expression<'_>,
        arguments: &[Argument<'_>],
        optional: bool,
        depth: usize,
    ) -> Result<String, GenerationError> {
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(match argument {
                Argument::SpreadElement(spread) => {
                    format!("...{}", self.expression(&spread.argument, depth)?)
                }
                _ => match argument.as_expression() {
                    Some(expr) => self.expression(expr, depth)?,
                    None => return Err(self.unsupported("call argument", callee.span())),
                },
            });
        }
        Ok(format!(
            "{}{}({})",
            self.operand(callee, depth)?,
            if optional { "?." } else { "" },
            args.join(", ")
        ))
    }

    fn template(&self, tpl: &TemplateLiteral<'_>, depth: usize) -> Result<String, GenerationError> {
        let mut out = String::from("`");
        for (idx, quasi) in tpl.quasis.iter().enumerate() {
            out.push_str(quasi.value.raw.as_str());
            if let Some(expr) = tpl.expressions.get(idx) {
                let _ = write!(out, "${{{}}}", self.expression(expr, depth)?);
            }
        }
        out.push('`');
        Ok(out)
    }
}

/// Node type name for expressions outside the literal subset.
pub(crate) fn expression_kind(expr: &Expression<'_>) -> &'static str {
    match expr {
        Expression::AssignmentExpression(_) => "AssignmentExpression",
        Expression::AwaitExpression(_) => "AwaitExpression",
        Expression::BigIntLiteral(_) => "BigIntLiteral",
        Expression::ClassExpression(_) => "ClassExpression",
        Expression::ImportExpression(_) => "ImportExpression",
        Expression::MetaProperty(_) => "MetaProperty",
        Expression::NewExpression(_) => "NewExpression",
        Expression::PrivateFieldExpression(_) => "PrivateFieldExpression",
        Expression::PrivateInExpression(_) => "PrivateInExpression",
        Expression::RegExpLiteral(_) => "RegExpLiteral",
        Expression::SequenceExpression(_) => "SequenceExpression",
        Expression::Super(_) => "Super",
        Expression::TaggedTemplateExpression(_) => "TaggedTemplateExpression",
        Expression::ThisExpression(_) => "ThisExpression",
        Expression::UpdateExpression(_) => "UpdateExpression",
        Expression::YieldExpression(_) => "YieldExpression",
        Expression::JSXElement(_) | Expression::JSXFragment(_) => "JSXElement",
        _ => "Expression",
    }
}
