//! Plain values produced by evaluating an option literal.
//!
//! Functions are not executed during discovery; they are carried as their
//! verbatim source text so they can be handed to the command runner later
//! and written back into the cache artifact unchanged.

use std::fmt;

use serde_json::{Map, Number, Value as Json};

/// Key under which a function's source travels through JSON.
pub const FUNCTION_KEY: &str = "$function";

/// Helpers the evaluator can call while reading a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Join,
    Resolve,
    Dirname,
    Basename,
    Extname,
    String,
}

impl Builtin {
    /// Name as written in command files.
    pub fn source_name(self) -> &'static str {
        match self {
            Builtin::Join => "_z.join",
            Builtin::Resolve => "_z.resolve",
            Builtin::Dirname => "_z.dirname",
            Builtin::Basename => "_z.basename",
            Builtin::Extname => "_z.extname",
            Builtin::String => "String",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    /// Source text of a function or arrow expression.
    Function(String),
    Builtin(Builtin),
}

/// Insertion-ordered object; re-inserting a key keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: &Object) {
        for (key, value) in other.iter() {
            self.insert(key, value.clone());
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// Bridge into JSON for typed deserialization.
    ///
    /// `undefined` object members are dropped and become `null` inside
    /// arrays; functions become `{"$function": "<source>"}`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(object) => {
                let mut map = Map::new();
                for (key, value) in object.iter() {
                    if !matches!(value, Value::Undefined) {
                        map.insert(key.to_string(), value.to_json());
                    }
                }
                Json::Object(map)
            }
            Value::Function(source) => function_json(source),
            Value::Builtin(builtin) => function_json(builtin.source_name()),
        }
    }

    /// Inverse of [`Value::to_json`].
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => {
                if map.len() == 1
                    && let Some(Json::String(source)) = map.get(FUNCTION_KEY)
                {
                    return Value::Function(source.clone());
                }
                Value::Object(
                    map.iter()
                        .map(|(key, value)| (key.clone(), Value::from_json(value)))
                        .collect(),
                )
            }
        }
    }
}

fn function_json(source: &str) -> Json {
    let mut map = Map::new();
    map.insert(FUNCTION_KEY.to_string(), Json::String(source.to_string()));
    Json::Object(map)
}

fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Json::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

/// JavaScript-flavoured number formatting (`1` not `1.0`).
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_nullish() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(source) => f.write_str(source),
            Value::Builtin(builtin) => {
                write!(f, "function {}() {{ [native code] }}", builtin.source_name())
            }
        }
    }
}
