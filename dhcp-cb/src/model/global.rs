//! Global parameters.

use crate::error::{Error, Result};
use crate::stamp::{Stamp, Stamped};

/// Typed value of a global parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Real(f64),
}

impl ParameterValue {
    /// Type tag as stored in the database.
    pub fn type_code(&self) -> i32 {
        match self {
            ParameterValue::String(_) => 0,
            ParameterValue::Integer(_) => 1,
            ParameterValue::Boolean(_) => 2,
            ParameterValue::Real(_) => 3,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Boolean(_) => "boolean",
            ParameterValue::Real(_) => "real",
        }
    }

    /// Textual form, as stored in the database.
    pub fn to_text(&self) -> String {
        match self {
            ParameterValue::String(s) => s.clone(),
            ParameterValue::Integer(i) => i.to_string(),
            ParameterValue::Boolean(b) => b.to_string(),
            ParameterValue::Real(r) => r.to_string(),
        }
    }

    /// Rebuild a value from its stored type tag and text.
    pub fn from_text(type_code: i32, text: &str) -> Result<Self> {
        let value = match type_code {
            0 => ParameterValue::String(text.to_string()),
            1 => ParameterValue::Integer(
                text.parse()
                    .map_err(|_| Error::invalid("global_parameters.value", text))?,
            ),
            2 => ParameterValue::Boolean(
                text.parse()
                    .map_err(|_| Error::invalid("global_parameters.value", text))?,
            ),
            3 => ParameterValue::Real(
                text.parse()
                    .map_err(|_| Error::invalid("global_parameters.value", text))?,
            ),
            _ => return Err(Error::invalid("global_parameters.parameter_type", type_code)),
        };
        Ok(value)
    }
}

/// A named global parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedValue {
    pub name: String,
    pub value: ParameterValue,
    pub stamp: Stamp,
}

impl StampedValue {
    pub fn new(name: &str, value: ParameterValue) -> Self {
        Self {
            name: name.to_string(),
            value,
            stamp: Stamp::new(),
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self::new(name, ParameterValue::String(value.to_string()))
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self::new(name, ParameterValue::Integer(value))
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self::new(name, ParameterValue::Boolean(value))
    }

    pub fn real(name: &str, value: f64) -> Self {
        Self::new(name, ParameterValue::Real(value))
    }

    /// Value in textual form, whatever its type.
    pub fn get_value(&self) -> String {
        self.value.to_text()
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.value {
            ParameterValue::String(s) => Ok(s),
            other => Err(self.mismatch("string", other)),
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self.value {
            ParameterValue::Integer(i) => Ok(i),
            ref other => Err(self.mismatch("integer", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.value {
            ParameterValue::Boolean(b) => Ok(b),
            ref other => Err(self.mismatch("boolean", other)),
        }
    }

    pub fn as_real(&self) -> Result<f64> {
        match self.value {
            ParameterValue::Real(r) => Ok(r),
            ref other => Err(self.mismatch("real", other)),
        }
    }

    fn mismatch(&self, expected: &'static str, actual: &ParameterValue) -> Error {
        Error::TypeMismatch {
            name: self.name.clone(),
            expected,
            actual: actual.type_name(),
        }
    }
}

impl Stamped for StampedValue {
    fn stamp(&self) -> &Stamp {
        &self.stamp
    }

    fn stamp_mut(&mut self) -> &mut Stamp {
        &mut self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let value = StampedValue::integer("valid-lifetime", 65);
        assert_eq!(value.as_integer().unwrap(), 65);
        assert_eq!(value.get_value(), "65");
        assert!(matches!(
            value.as_bool(),
            Err(Error::TypeMismatch { expected: "boolean", actual: "integer", .. })
        ));

        let value = StampedValue::real("t1-percent", 1.65);
        assert_eq!(value.as_real().unwrap(), 1.65);
        assert_eq!(value.get_value(), "1.65");
    }

    #[test]
    fn test_text_round_trip() {
        for value in [
            ParameterValue::String("whale".into()),
            ParameterValue::Integer(-12),
            ParameterValue::Boolean(true),
            ParameterValue::Real(0.345),
        ] {
            let restored = ParameterValue::from_text(value.type_code(), &value.to_text()).unwrap();
            assert_eq!(restored, value);
        }
        assert!(ParameterValue::from_text(1, "abc").is_err());
        assert!(ParameterValue::from_text(9, "1").is_err());
    }
}
