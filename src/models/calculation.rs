use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::calculator::CalculationType;
use crate::error::AppError;

/// Stored calculation; `result` is always derived from `kind` and `inputs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: CalculationType,
    pub user_id: i64,
    pub inputs: Vec<f64>,
    pub result: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `calculations` row; the discriminator is still text here
#[derive(Debug, sqlx::FromRow)]
pub struct CalculationRow {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub user_id: i64,
    pub inputs: Json<Vec<f64>>,
    pub result: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CalculationRow> for Calculation {
    type Error = AppError;

    fn try_from(row: CalculationRow) -> Result<Self, Self::Error> {
        // The CHECK constraint makes this unreachable for rows written by us
        let kind = row.kind.parse().map_err(|_| {
            AppError::Database(sqlx::Error::Decode(
                format!("unknown calculation type in row {}: {}", row.id, row.kind).into(),
            ))
        })?;

        Ok(Calculation {
            id: row.id,
            kind,
            user_id: row.user_id,
            inputs: row.inputs.0,
            result: row.result,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Validated input for Add
#[derive(Debug, Clone)]
pub struct NewCalculation {
    pub kind: CalculationType,
    pub user_id: i64,
    pub inputs: Vec<f64>,
}

/// Validated input for Edit; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct CalculationPatch {
    pub kind: Option<CalculationType>,
    pub user_id: Option<i64>,
    pub inputs: Option<Vec<f64>>,
}

impl CalculationPatch {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.user_id.is_none() && self.inputs.is_none()
    }
}

/// Browse filter
#[derive(Debug, Clone, Default)]
pub struct CalculationFilter {
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> CalculationRow {
        CalculationRow {
            id: 3,
            kind: kind.to_string(),
            user_id: 1,
            inputs: Json(vec![10.0, 20.0, 30.0]),
            result: 60.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_conversion() {
        let calc = Calculation::try_from(row("addition")).unwrap();
        assert_eq!(calc.kind, CalculationType::Addition);
        assert_eq!(calc.inputs, vec![10.0, 20.0, 30.0]);
        assert_eq!(calc.result, 60.0);
    }

    #[test]
    fn test_row_with_unknown_type() {
        assert!(matches!(
            Calculation::try_from(row("modulus")),
            Err(AppError::Database(_))
        ));
    }

    #[test]
    fn test_serializes_type_field() {
        let calc = Calculation::try_from(row("addition")).unwrap();
        let json = serde_json::to_value(&calc).unwrap();

        assert_eq!(json["type"], "addition");
        assert_eq!(json["user_id"], 1);
        assert_eq!(json["result"], 60.0);
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_empty_patch() {
        assert!(CalculationPatch::default().is_empty());
        let patch = CalculationPatch {
            inputs: Some(vec![1.0, 2.0]),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
