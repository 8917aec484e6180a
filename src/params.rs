//! Open-ended option and personalization values.
//!
//! The remote model's accepted parameters are not known here, so options are
//! an insertion-ordered map of small scalar values, forwarded verbatim.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered `name -> value` map used for generation options and personalization data.
pub type Params = IndexMap<String, ParamValue>;

/// A scalar option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Infer a value from raw text: booleans, then integers, then floats,
    /// falling back to text.
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return ParamValue::Bool(true),
            "false" => return ParamValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ParamValue::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return ParamValue::Float(f);
            }
        }
        ParamValue::Text(raw.to_string())
    }

    /// Parse a `key=value` assignment as given on the command line.
    pub fn parse_assignment(s: &str) -> Result<(String, ParamValue), String> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("'{}' is not in key=value form", s))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("'{}' has an empty key", s));
        }
        Ok((key.to_string(), ParamValue::infer(value)))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(x) => write!(f, "{}", x),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Integer(i)
    }
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Float(x)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}
