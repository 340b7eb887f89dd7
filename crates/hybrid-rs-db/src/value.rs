//! Backend-agnostic database values.
//!
//! [`Value`] is what flows between the query layer and the backends: query
//! parameters, row contents, and the results of instance-level hybrid
//! attribute bodies that get compared against database-computed values.

use std::fmt;

/// A backend-agnostic representation of a database value.
///
/// # Examples
///
/// ```
/// use hybrid_rs_db::value::Value;
///
/// let v = Value::from(42_i64);
/// assert_eq!(v, Value::Int(42));
///
/// let v = Value::from("hello");
/// assert_eq!(v, Value::String("hello".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    /// SQL NULL.
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A date without time.
    Date(chrono::NaiveDate),
    /// A date and time without timezone.
    DateTime(chrono::NaiveDateTime),
    /// A JSON value.
    Json(serde_json::Value),
    /// A list of values (for IN and BETWEEN operands).
    List(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(dt) => write!(f, "{dt}"),
            Self::Json(j) => write!(f, "{j}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (i, v) in vals.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Self::Bool(v),
    i16 => |v| Self::Int(i64::from(v)),
    i32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    u32 => |v| Self::Int(i64::from(v)),
    f32 => |v| Self::Float(f64::from(v)),
    f64 => |v| Self::Float(v),
    String => |v| Self::String(v),
    &str => |v| Self::String(v.to_string()),
    chrono::NaiveDate => |v| Self::Date(v),
    chrono::NaiveDateTime => |v| Self::DateTime(v),
    serde_json::Value => |v| Self::Json(v),
    Vec<Value> => |v| Self::List(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl Value {
    /// Returns `true` if this value is `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Attempts to extract a boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract an integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two values the way a SQL engine would after a round trip.
    ///
    /// Backends without native booleans store them as `0`/`1`, and numeric
    /// expressions may come back as either integers or floats, so
    /// `Bool(true)` equals `Int(1)` and `Int(2)` equals `Float(2.0)`.
    /// Everything else falls back to structural equality.
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(b), Self::Int(i)) | (Self::Int(i), Self::Bool(b)) => i64::from(*b) == *i,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            (Self::Float(a), Self::Float(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(1.0),
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            _ => self == other,
        }
    }
}
