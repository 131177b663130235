//! Shape checks applied to parameter values after casting.
//!
//! A [`Matcher`] answers one question: does this JSON value look like what the
//! handler expects? Exact JSON kinds, regular expressions over strings, named
//! predicate functions and caller-defined [`Matchable`] objects are supported.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

/// JSON-level kinds a value can have.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    /// Either an integer or a float.
    Number,
    Boolean,
    Array,
    Object,
    Null,
}

impl ValueType {
    /// Runtime kind of a value. Numbers are split into `Integer` and `Float`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Float,
            Value::Bool(_) => Self::Boolean,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
            Value::Null => Self::Null,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
            Self::Object => "Object",
            Self::Null => "Null",
        }
    }

    /// JSON Schema primitive used for this kind in OpenAPI output.
    pub fn json_schema_type(self) -> &'static str {
        match self {
            Self::String | Self::Null => "string",
            Self::Integer => "integer",
            Self::Float | Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        let actual = Self::of(value);
        actual == self || (self == Self::Number && matches!(actual, Self::Integer | Self::Float))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Caller-defined shape check.
pub trait Matchable: Send + Sync {
    fn matches(&self, value: &Value) -> bool;

    /// Human-readable name used in docs and error messages.
    fn describe(&self) -> String;
}

type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

#[derive(Clone)]
pub enum Matcher {
    /// Exact JSON kind.
    Type(ValueType),
    /// String values matching the expression. Non-strings never match.
    Pattern(Regex),
    /// A named function.
    Predicate {
        name: Arc<str>,
        check: Arc<PredicateFn>,
    },
    Custom(Arc<dyn Matchable>),
}

impl Matcher {
    pub fn string() -> Self {
        Self::Type(ValueType::String)
    }

    pub fn integer() -> Self {
        Self::Type(ValueType::Integer)
    }

    pub fn float() -> Self {
        Self::Type(ValueType::Float)
    }

    pub fn number() -> Self {
        Self::Type(ValueType::Number)
    }

    pub fn boolean() -> Self {
        Self::Type(ValueType::Boolean)
    }

    pub fn array() -> Self {
        Self::Type(ValueType::Array)
    }

    pub fn object() -> Self {
        Self::Type(ValueType::Object)
    }

    /// Compile `pattern` into a regex matcher.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Pattern)
    }

    pub fn predicate<F>(name: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Predicate {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    pub fn custom(matchable: impl Matchable + 'static) -> Self {
        Self::Custom(Arc::new(matchable))
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Type(expected) => expected.accepts(value),
            Self::Pattern(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Self::Predicate { check, .. } => check(value),
            Self::Custom(matchable) => matchable.matches(value),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Type(t) => t.name().to_string(),
            Self::Pattern(re) => format!("/{}/", re.as_str()),
            Self::Predicate { name, .. } => name.to_string(),
            Self::Custom(matchable) => matchable.describe(),
        }
    }

    /// Exact kinds map through [`ValueType::json_schema_type`]; everything
    /// else is documented as a string.
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            Self::Type(t) => t.json_schema_type(),
            _ => "string",
        }
    }

    /// Placeholder example for schema output.
    pub fn schema_example(&self) -> Value {
        match self.json_schema_type() {
            "integer" => Value::from(1),
            "number" => Value::from(1.5),
            "boolean" => Value::Bool(true),
            "array" => Value::Array(Vec::new()),
            "object" => Value::Object(serde_json::Map::new()),
            other => Value::String(other.to_string()),
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::string()
    }
}

impl From<ValueType> for Matcher {
    fn from(t: ValueType) -> Self {
        Self::Type(t)
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self.describe())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
