//! Serde helpers for floats JSON cannot represent.
//!
//! JSON has no `inf` or `NaN`; these write them as `null` and map `null`
//! back to the right non-finite value on read.

use serde::{Deserialize, Deserializer, Serializer};

fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

fn deserialize_or<'de, D: Deserializer<'de>>(deserializer: D, missing: f64) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(missing))
}

/// `null` reads back as NaN.
pub mod nan_as_null {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_finite(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserialize_or(deserializer, f64::NAN)
    }
}

/// Lower bound: `null` reads back as `-inf`.
pub mod lower_bound {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_finite(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserialize_or(deserializer, f64::NEG_INFINITY)
    }
}

/// Upper bound: `null` reads back as `+inf`.
pub mod upper_bound {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_finite(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserialize_or(deserializer, f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::Parameter;

    #[test]
    fn infinite_bounds_survive_json() {
        let p = Parameter::new("μ", 0.5, true, f64::NEG_INFINITY, f64::INFINITY);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"min\":null"));
        let back: Parameter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
