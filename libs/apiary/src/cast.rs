use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};

/// Built-in conversions, mostly used to turn raw query-string text into typed values.
///
/// Every named cast is strict: input it cannot convert is returned unchanged,
/// so the matcher that follows reports the mismatch. Casting an already-cast
/// value is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedCast {
    ToInt,
    ToFloat,
    ToString,
    ToBool,
}

impl NamedCast {
    pub fn apply(self, value: Value) -> Value {
        match self {
            Self::ToInt => to_int(value),
            Self::ToFloat => to_float(value),
            Self::ToString => to_string(value),
            Self::ToBool => to_bool(value),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ToInt => "to_int",
            Self::ToFloat => "to_float",
            Self::ToString => "to_string",
            Self::ToBool => "to_bool",
        }
    }
}

type CastFn = dyn Fn(Value) -> Value + Send + Sync;

/// Transformation applied to a raw parameter value before it is matched.
#[derive(Clone, Default)]
pub enum Cast {
    #[default]
    Identity,
    Named(NamedCast),
    Func(Arc<CastFn>),
}

impl Cast {
    pub fn to_int() -> Self {
        Self::Named(NamedCast::ToInt)
    }

    pub fn to_float() -> Self {
        Self::Named(NamedCast::ToFloat)
    }

    pub fn to_string() -> Self {
        Self::Named(NamedCast::ToString)
    }

    pub fn to_bool() -> Self {
        Self::Named(NamedCast::ToBool)
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Self::Func(Arc::new(f))
    }

    pub fn apply(&self, value: Value) -> Value {
        match self {
            Self::Identity => value,
            Self::Named(named) => named.apply(value),
            Self::Func(f) => f(value),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

impl From<NamedCast> for Cast {
    fn from(named: NamedCast) -> Self {
        Self::Named(named)
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Named(named) => write!(f, "Named({})", named.name()),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

fn to_int(value: Value) -> Value {
    match &value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                Value::from(n)
            } else if let Ok(n) = s.parse::<u64>() {
                Value::from(n)
            } else {
                value
            }
        }
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(&f.trunc()) => {
                Value::from(f.trunc() as i64)
            }
            _ => value,
        },
        _ => value,
    }
}

fn to_float(value: Value) -> Value {
    let parsed = match &value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(value)
}

fn to_string(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        Value::Null => Value::String(String::new()),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn to_bool(value: Value) -> Value {
    match &value {
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Value::Bool(true),
            "false" | "0" | "no" | "off" => Value::Bool(false),
            _ => value,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Value::Bool(true),
            Some(0) => Value::Bool(false),
            _ => value,
        },
        _ => value,
    }
}
