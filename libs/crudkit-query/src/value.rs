use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Semantic type of a declared entity field.
///
/// Untrusted JSON is coerced into a [`FieldValue`] according to this type
/// before it can take part in a condition or an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    /// RFC 3339 timestamp, normalized to UTC.
    DateTime,
}

impl FieldType {
    /// Returns `true` for the types accepted by update operators.
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "integer",
            Self::Float => "number",
            Self::Bool => "boolean",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed scalar value of an entity field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

/// Largest float magnitude below which every integer is exact.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Integer value of a JSON number, or of a string holding one.
///
/// Integral floats such as `2.0` are accepted; fractions and non-finite
/// values are not.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn integral(raw: &Value) -> Option<i64> {
    let float = match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            n.as_f64()?
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (float.fract() == 0.0 && float.abs() <= MAX_EXACT_FLOAT).then(|| float as i64)
}

impl FieldValue {
    /// Coerce a JSON value into the given field type.
    ///
    /// `null` always coerces to [`FieldValue::Null`]; whether a null is
    /// acceptable is decided by the caller. Returns `None` on type mismatch.
    #[must_use]
    pub fn coerce(ty: FieldType, raw: &Value) -> Option<Self> {
        if raw.is_null() {
            return Some(Self::Null);
        }
        match ty {
            FieldType::String => raw.as_str().map(|s| Self::String(s.to_owned())),
            FieldType::Int => raw.is_number().then(|| integral(raw)).flatten().map(Self::Int),
            FieldType::Float => raw.as_f64().map(Self::Float),
            FieldType::Bool => raw.as_bool().map(Self::Bool),
            FieldType::DateTime => raw
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Self::DateTime(dt.with_timezone(&Utc))),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Total order between values of the same type.
    ///
    /// Integers and floats compare numerically with each other. Values of
    /// unrelated types are incomparable (`None`).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality in the sense of [`FieldValue::compare`].
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Render the value in the persistence layer's JSON form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Int(n) => Value::from(*n),
            Self::Float(n) => Value::from(*n),
            Self::Bool(b) => Value::Bool(*b),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl From<&str> for FieldValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for FieldValue {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    #[inline]
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for FieldValue {
    #[inline]
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FieldValue {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    #[inline]
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}
