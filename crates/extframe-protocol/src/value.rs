use std::fmt;

use extframe_wire::WireType;
use serde::Serialize;

/// One decoded or to-be-sent cell, typed by its wire encoding.
///
/// Serializes as a bare JSON scalar; [`Value::Na`] becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Na,
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl Value {
    /// Wire type this value is encoded as, `None` for a missing value.
    pub fn wire_type(&self) -> Option<WireType> {
        match self {
            Self::Na => None,
            Self::Byte(_) => Some(WireType::Byte),
            Self::Char(_) => Some(WireType::Char),
            Self::Short(_) => Some(WireType::Short),
            Self::Int(_) => Some(WireType::Int),
            Self::Long(_) => Some(WireType::Long),
            Self::Float(_) => Some(WireType::Float),
            Self::Double(_) => Some(WireType::Double),
            Self::Str(_) => Some(WireType::String),
        }
    }

    pub fn is_na(&self) -> bool {
        matches!(self, Self::Na)
    }

    /// Integer view of an integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Char(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Floating-point view of any numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(f64::from(v)),
            Self::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Na => f.write_str("NA"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}
