//! Scalar values that can appear as constants inside an expression tree

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// The kind of a [`Scalar`], used as the target of a conversion node and for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Enum,
    Sequence,
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ScalarKind::*;
        let name = match self {
            Null => "null",
            Boolean => "boolean",
            Integer => "integer",
            Double => "double",
            String => "string",
            Enum => "enum",
            Sequence => "sequence",
        };
        write!(f, "{name}")
    }
}

/// A runtime value of a user-defined enumeration.
///
/// Carries what host reflection would have provided: the enum's type name, the symbolic name of
/// the value when it is defined on the type, and the underlying ordinal. A value that is not
/// defined on its type has no symbol; formatting such a value symbolically is a domain error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub type_name: String,
    pub symbol: Option<String>,
    pub ordinal: i64,
}

impl EnumValue {
    /// A value defined on its enum type.
    pub fn new(type_name: impl Into<String>, symbol: impl Into<String>, ordinal: i64) -> Self {
        Self {
            type_name: type_name.into(),
            symbol: Some(symbol.into()),
            ordinal,
        }
    }

    /// A raw ordinal with no defined symbol on its enum type.
    pub fn undefined(type_name: impl Into<String>, ordinal: i64) -> Self {
        Self {
            type_name: type_name.into(),
            symbol: None,
            ordinal,
        }
    }
}

impl Display for EnumValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{}.{}", self.type_name, symbol),
            None => write!(f, "{}({})", self.type_name, self.ordinal),
        }
    }
}

/// A closed-over runtime value carried by a [`Constant`] expression node.
///
/// The value domain deliberately stays small: it covers what a strongly-typed record predicate
/// can close over. Nullable scalars are modeled with the explicit [`Scalar::Null`] variant rather
/// than a sentinel inside each kind.
///
/// [`Constant`]: crate::expressions::Expression::Constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// Absence of a value (a null reference or an empty nullable).
    Null,
    Boolean(bool),
    /// 64-bit integer; narrower host integers widen on capture.
    Integer(i64),
    /// 64-bit float; host decimals and floats are carried here.
    Double(f64),
    String(String),
    Enum(EnumValue),
    /// An evaluated sequence literal, e.g. a captured array of terms.
    Sequence(Vec<Scalar>),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Null => ScalarKind::Null,
            Scalar::Boolean(_) => ScalarKind::Boolean,
            Scalar::Integer(_) => ScalarKind::Integer,
            Scalar::Double(_) => ScalarKind::Double,
            Scalar::String(_) => ScalarKind::String,
            Scalar::Enum(_) => ScalarKind::Enum,
            Scalar::Sequence(_) => ScalarKind::Sequence,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The canonical JSON shape of this value before any mapping policy is applied. Enums emit
    /// their ordinal here; symbolic formatting is a mapping decision.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            Scalar::Null => Value::Null,
            Scalar::Boolean(b) => Value::Bool(*b),
            Scalar::Integer(i) => Value::Number((*i).into()),
            Scalar::Double(d) => serde_json::Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::String(s) => Value::String(s.clone()),
            Scalar::Enum(e) => Value::Number(e.ordinal.into()),
            Scalar::Sequence(items) => Value::Array(items.iter().map(Scalar::to_json).collect()),
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Double(d) => write!(f, "{d}"),
            Scalar::String(s) => write!(f, "'{s}'"),
            Scalar::Enum(e) => write!(f, "{e}"),
            Scalar::Sequence(items) => {
                write!(f, "[{}]", items.iter().map(|i| format!("{i}")).join(", "))
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value.into())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<EnumValue> for Scalar {
    fn from(value: EnumValue) -> Self {
        Scalar::Enum(value)
    }
}
