use std::fmt;

use serde::Serialize;

/// One cell of a tabular record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    /// A measurement, `NaN` when undefined.
    Float(f64),
    /// A count or pixel coordinate.
    Int(i64),
    /// A flag.
    Bool(bool),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Float(v) if v.is_nan() => write!(f, "NA"),
            Field::Float(v) => write!(f, "{v}"),
            Field::Int(v) => write!(f, "{v}"),
            Field::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// A record exposed to tabular consumers.
///
/// `values` always returns one field per header, in header order.
pub trait Record {
    /// Column names, stable across releases.
    fn headers() -> &'static [&'static str];

    /// Column values in the order of [`Record::headers`].
    fn values(&self) -> Vec<Field>;

    /// Pair every header with its value.
    fn to_row(&self) -> Vec<(&'static str, Field)> {
        Self::headers()
            .iter()
            .copied()
            .zip(self.values())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Float(1.5).to_string(), "1.5");
        assert_eq!(Field::Float(f64::NAN).to_string(), "NA");
        assert_eq!(Field::Int(-3).to_string(), "-3");
        assert_eq!(Field::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_field_serialize() -> Result<(), serde_json::Error> {
        let row = vec![Field::Float(2.0), Field::Int(4), Field::Bool(false)];
        assert_eq!(serde_json::to_string(&row)?, "[2.0,4,false]");
        Ok(())
    }
}
