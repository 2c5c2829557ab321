//! Runtime value types

use serde::{Deserialize, Serialize};

/// Runtime value type
///
/// Flowchart programs compute with IEEE doubles; comparisons and logical
/// operators produce booleans, which coerce to 1/0 when used as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Num(f64),
    Bool(bool),
}

impl Val {
    /// Numeric view of the value
    pub fn as_num(&self) -> f64 {
        match self {
            Val::Num(n) => *n,
            Val::Bool(true) => 1.0,
            Val::Bool(false) => 0.0,
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
        }
    }
}

impl Default for Val {
    fn default() -> Self {
        Val::Num(0.0)
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl std::fmt::Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{}", b),
            Val::Num(n) if n.is_infinite() => {
                write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Val::Num(n) if *n == 0.0 => write!(f, "0"),
            Val::Num(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_console_format() {
        assert_eq!(Val::Num(3.0).to_string(), "3");
        assert_eq!(Val::Num(-0.0).to_string(), "0");
        assert_eq!(Val::Num(2.5).to_string(), "2.5");
        assert_eq!(Val::Num(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Val::Num(f64::NAN).to_string(), "NaN");
        assert_eq!(Val::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_truthiness() {
        assert!(Val::Num(2.0).is_truthy());
        assert!(!Val::Num(0.0).is_truthy());
        assert!(!Val::Num(f64::NAN).is_truthy());
        assert!(Val::Bool(true).is_truthy());
        assert_eq!(Val::Bool(true).as_num(), 1.0);
    }
}
