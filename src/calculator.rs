//! Calculation engine
//!
//! Evaluates one of four operators over an ordered list of operands. Pure:
//! no I/O, no state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::MIN_CALCULATION_INPUTS;

/// Operation kind, stored as the `type` discriminator of a calculation row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationType {
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl CalculationType {
    pub const ALL: [CalculationType; 4] = [
        CalculationType::Addition,
        CalculationType::Subtraction,
        CalculationType::Multiplication,
        CalculationType::Division,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Addition => "addition",
            CalculationType::Subtraction => "subtraction",
            CalculationType::Multiplication => "multiplication",
            CalculationType::Division => "division",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; surrounding whitespace is ignored
impl FromStr for CalculationType {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        CalculationType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| CalculationError::UnknownOperation(s.to_string()))
    }
}

/// Engine failures; all of them are client errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculationError {
    #[error("Cannot divide by zero.")]
    DivisionByZero,

    #[error("Unsupported calculation type: '{0}'")]
    UnknownOperation(String),

    #[error("Inputs must be a list with at least two numbers.")]
    InsufficientInputs,

    #[error("Result is not a finite number.")]
    NonFiniteResult,
}

/// Evaluate `kind` over `inputs`.
///
/// Addition and multiplication fold from their identity (0 and 1), subtraction
/// and division fold left starting at the first operand. Any zero divisor
/// after the first operand fails with [`CalculationError::DivisionByZero`].
pub fn evaluate(kind: CalculationType, inputs: &[f64]) -> Result<f64, CalculationError> {
    if inputs.len() < MIN_CALCULATION_INPUTS {
        return Err(CalculationError::InsufficientInputs);
    }

    let result = match kind {
        CalculationType::Addition => inputs.iter().fold(0.0, |acc, x| acc + x),
        CalculationType::Multiplication => inputs.iter().fold(1.0, |acc, x| acc * x),
        CalculationType::Subtraction => {
            let (first, rest) = split_first(inputs)?;
            rest.iter().fold(first, |acc, x| acc - x)
        }
        CalculationType::Division => {
            let (first, rest) = split_first(inputs)?;
            rest.iter().try_fold(first, |acc, &divisor| {
                if divisor == 0.0 {
                    Err(CalculationError::DivisionByZero)
                } else {
                    Ok(acc / divisor)
                }
            })?
        }
    };

    if !result.is_finite() {
        tracing::debug!(%kind, "calculation overflowed");
        return Err(CalculationError::NonFiniteResult);
    }

    Ok(result)
}

fn split_first(inputs: &[f64]) -> Result<(f64, &[f64]), CalculationError> {
    inputs
        .split_first()
        .map(|(first, rest)| (*first, rest))
        .ok_or(CalculationError::InsufficientInputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addition() {
        assert_eq!(evaluate(CalculationType::Addition, &[10.0, 20.0, 30.0]), Ok(60.0));
        assert_eq!(evaluate(CalculationType::Addition, &[10.0, 5.0, 3.5]), Ok(18.5));
        assert_eq!(evaluate(CalculationType::Addition, &[10.0, -5.0, 3.0]), Ok(8.0));
    }

    #[test]
    fn test_subtraction_is_left_fold() {
        assert_eq!(evaluate(CalculationType::Subtraction, &[20.0, 5.0, 3.0]), Ok(12.0));
        assert_eq!(evaluate(CalculationType::Subtraction, &[5.0, 10.0]), Ok(-5.0));
        // Order matters
        assert_eq!(evaluate(CalculationType::Subtraction, &[3.0, 5.0, 20.0]), Ok(-22.0));
    }

    #[test]
    fn test_multiplication() {
        assert_eq!(evaluate(CalculationType::Multiplication, &[5.0, 10.0, 2.0]), Ok(100.0));
        assert_eq!(evaluate(CalculationType::Multiplication, &[3.0, 4.0, 2.0]), Ok(24.0));
        assert_eq!(evaluate(CalculationType::Multiplication, &[7.0, 0.0, 2.0]), Ok(0.0));
    }

    #[test]
    fn test_division_is_left_fold() {
        assert_eq!(evaluate(CalculationType::Division, &[100.0, 2.0, 5.0]), Ok(10.0));
        assert_eq!(evaluate(CalculationType::Division, &[7.5, 2.5]), Ok(3.0));
        assert_eq!(evaluate(CalculationType::Division, &[0.0, 4.0]), Ok(0.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            evaluate(CalculationType::Division, &[10.0, 0.0]),
            Err(CalculationError::DivisionByZero)
        );
        assert_eq!(
            evaluate(CalculationType::Division, &[10.0, 2.0, 0.0, 5.0]),
            Err(CalculationError::DivisionByZero)
        );
        assert_eq!(
            evaluate(CalculationType::Division, &[10.0, -0.0]),
            Err(CalculationError::DivisionByZero)
        );
        assert_eq!(CalculationError::DivisionByZero.to_string(), "Cannot divide by zero.");
    }

    #[test]
    fn test_commutative_kinds_ignore_order() {
        let forward = [1.5, -2.0, 8.0, 4.0];
        let mut reversed = forward;
        reversed.reverse();

        for kind in [CalculationType::Addition, CalculationType::Multiplication] {
            assert_eq!(evaluate(kind, &forward), evaluate(kind, &reversed));
        }
    }

    #[test]
    fn test_insufficient_inputs() {
        for kind in CalculationType::ALL {
            assert_eq!(evaluate(kind, &[]), Err(CalculationError::InsufficientInputs));
            assert_eq!(evaluate(kind, &[5.0]), Err(CalculationError::InsufficientInputs));
        }
    }

    #[test]
    fn test_overflow_is_rejected() {
        assert_eq!(
            evaluate(CalculationType::Multiplication, &[f64::MAX, 10.0]),
            Err(CalculationError::NonFiniteResult)
        );
    }

    #[test]
    fn test_parse_kind_case_insensitive() {
        assert_eq!("addition".parse(), Ok(CalculationType::Addition));
        assert_eq!("ADDITION".parse(), Ok(CalculationType::Addition));
        assert_eq!("AdDiTiOn".parse(), Ok(CalculationType::Addition));
        assert_eq!(" division ".parse(), Ok(CalculationType::Division));
    }

    #[test]
    fn test_parse_kind_unknown() {
        let err = "modulus".parse::<CalculationType>().unwrap_err();
        assert_eq!(err, CalculationError::UnknownOperation("modulus".to_string()));
        assert!(err.to_string().contains("Unsupported calculation type"));

        assert!("".parse::<CalculationType>().is_err());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&CalculationType::Multiplication).unwrap();
        assert_eq!(json, "\"multiplication\"");
    }
}
