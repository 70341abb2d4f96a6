use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Semantic storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Unusable column; every value is missing.
    Bad,
    /// 128-bit UUIDs.
    Uuid,
    /// Free text.
    Str,
    /// Integers or reals.
    Numeric,
    /// Integer codes into an ordered label domain.
    Categorical,
    /// Epoch milliseconds.
    Time,
}

impl ColumnType {
    pub const ALL: [ColumnType; 6] = [
        Self::Bad,
        Self::Uuid,
        Self::Str,
        Self::Numeric,
        Self::Categorical,
        Self::Time,
    ];

    /// Byte code carried in the ingest header.
    pub fn code(self) -> u8 {
        match self {
            Self::Bad => 0,
            Self::Uuid => 1,
            Self::Str => 2,
            Self::Numeric => 3,
            Self::Categorical => 4,
            Self::Time => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bad => "bad",
            Self::Uuid => "uuid",
            Self::Str => "string",
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Time => "time",
        }
    }

    /// Decode a whole code array, failing on the first unknown code.
    pub fn decode_all(codes: &[u8]) -> Result<Vec<ColumnType>, StoreError> {
        codes.iter().map(|&code| ColumnType::try_from(code)).collect()
    }

    pub fn encode_all(types: &[ColumnType]) -> Vec<u8> {
        types.iter().map(|t| t.code()).collect()
    }
}

impl TryFrom<u8> for ColumnType {
    type Error = StoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(StoreError::UnknownColumnType(code))
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "bad" => Ok(Self::Bad),
            "uuid" => Ok(Self::Uuid),
            "string" | "str" => Ok(Self::Str),
            "numeric" | "num" => Ok(Self::Numeric),
            "categorical" | "cat" | "enum" => Ok(Self::Categorical),
            "time" => Ok(Self::Time),
            _ => Err(format!("unknown column type '{input}'")),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A numeric cell, kept exact for 64-bit integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Real(f64),
}

impl Number {
    /// Integer view; reals are truncated toward zero.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::Real(v) => v as i64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Real(v) => v,
        }
    }

    pub fn is_integral(self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Real(v) => v.is_finite() && v.fract() == 0.0,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Self::Real(v) if v.is_nan())
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_codes_are_stable() {
        let codes: Vec<u8> = ColumnType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(ColumnType::try_from(4).unwrap(), ColumnType::Categorical);
        assert!(matches!(
            ColumnType::try_from(9),
            Err(StoreError::UnknownColumnType(9))
        ));
    }

    #[test]
    fn column_type_parses_aliases() {
        assert_eq!("num".parse::<ColumnType>().unwrap(), ColumnType::Numeric);
        assert_eq!("enum".parse::<ColumnType>().unwrap(), ColumnType::Categorical);
        assert_eq!("STR".parse::<ColumnType>().unwrap(), ColumnType::Str);
        assert!("blob".parse::<ColumnType>().is_err());
    }

    #[test]
    fn number_views() {
        assert_eq!(Number::Real(5.9).as_i64(), 5);
        assert_eq!(Number::Int(-3).as_f64(), -3.0);
        assert!(Number::Real(4.0).is_integral());
        assert!(!Number::Real(4.5).is_integral());
        assert!(!Number::Real(f64::INFINITY).is_integral());
        assert!(Number::Real(f64::NAN).is_nan());
        assert!(!Number::Int(0).is_nan());
    }
}
