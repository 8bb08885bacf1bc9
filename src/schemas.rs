//! Request payloads and their validation
//!
//! Every payload is turned into a typed command here before anything touches
//! the database. Fields are optional at the serde level so that a missing
//! field and an empty one produce the same readable message.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::calculator::{CalculationError, CalculationType};
use crate::constants::{
    MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_PASSWORD_LEN, MAX_USERNAME_LEN, MIN_CALCULATION_INPUTS,
};
use crate::error::{AppError, Result};
use crate::models::{CalculationPatch, NewCalculation};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::Validation(format!("Field '{}' is required", field)))
}

fn required_text(value: Option<String>, field: &str) -> Result<String> {
    let value = required(value, field)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("Field '{}' must not be empty", field)));
    }
    Ok(value)
}

fn max_len(value: &str, max: usize, field: &str) -> Result<()> {
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "Field '{}' must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Trimmed optional text; blank counts as absent
fn optional_text(value: Option<String>, max: usize, field: &str) -> Result<Option<String>> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    max_len(&value, max, field)?;
    Ok(Some(value))
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_RE.is_match(email)
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Registration data that passed validation; username and email normalized
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<Registration> {
        let username = required_text(self.username, "username")?.trim().to_string();
        max_len(&username, MAX_USERNAME_LEN, "username")?;

        let email = required_text(self.email, "email")?.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }

        // Passwords are taken verbatim, whitespace included
        let password = required(self.password, "password")?;
        if password.is_empty() {
            return Err(AppError::Validation(
                "Field 'password' must not be empty".to_string(),
            ));
        }
        max_len(&password, MAX_PASSWORD_LEN, "password")?;

        let first_name = optional_text(self.first_name, MAX_NAME_LEN, "first_name")?;
        let last_name = optional_text(self.last_name, MAX_NAME_LEN, "last_name")?;

        Ok(Registration {
            username,
            email,
            password,
            first_name,
            last_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(username, password)`
    pub fn validate(self) -> Result<(String, String)> {
        let username = required_text(self.username, "username")?.trim().to_string();
        let password = required(self.password, "password")?;
        if password.is_empty() {
            return Err(AppError::Validation(
                "Field 'password' must not be empty".to_string(),
            ));
        }
        Ok((username, password))
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

// =============================================================================
// Calculations
// =============================================================================

/// Body of POST, PUT and PATCH on calculations
///
/// Anything else in the body, `result` included, is ignored.
#[derive(Debug, Default, Deserialize)]
pub struct CalculationPayload {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<i64>,
    pub inputs: Option<Vec<f64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalculationQuery {
    pub user_id: Option<i64>,
}

fn parse_kind(kind: &str) -> Result<CalculationType> {
    Ok(kind.parse::<CalculationType>()?)
}

fn check_inputs(inputs: &[f64]) -> Result<()> {
    if inputs.len() < MIN_CALCULATION_INPUTS {
        return Err(CalculationError::InsufficientInputs.into());
    }
    Ok(())
}

impl CalculationPayload {
    /// Add: `type` and `inputs` required, `user_id` falls back to `default_user`
    pub fn into_new(self, default_user: Option<i64>) -> Result<NewCalculation> {
        let kind = parse_kind(&required(self.kind, "type")?)?;
        let inputs = required(self.inputs, "inputs")?;
        check_inputs(&inputs)?;
        let user_id = required(self.user_id.or(default_user), "user_id")?;

        Ok(NewCalculation {
            kind,
            user_id,
            inputs,
        })
    }

    /// Full replace (PUT): same requirements as Add, expressed as a patch
    pub fn into_replacement(self, default_user: Option<i64>) -> Result<CalculationPatch> {
        let new = self.into_new(default_user)?;
        Ok(CalculationPatch {
            kind: Some(new.kind),
            user_id: Some(new.user_id),
            inputs: Some(new.inputs),
        })
    }

    /// Partial update (PATCH): at least one field, each validated if present
    pub fn into_patch(self) -> Result<CalculationPatch> {
        let kind = self.kind.as_deref().map(parse_kind).transpose()?;
        if let Some(inputs) = &self.inputs {
            check_inputs(inputs)?;
        }

        let patch = CalculationPatch {
            kind,
            user_id: self.user_id,
            inputs: self.inputs,
        };

        if patch.is_empty() {
            return Err(AppError::Validation(
                "At least one of 'type', 'user_id' or 'inputs' must be provided".to_string(),
            ));
        }

        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            first_name: None,
            last_name: None,
        }
    }

    fn payload(kind: Option<&str>, user_id: Option<i64>, inputs: Option<Vec<f64>>) -> CalculationPayload {
        CalculationPayload {
            kind: kind.map(str::to_string),
            user_id,
            inputs,
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn test_registration_normalizes() {
        let reg = register("  alice ", " Alice@Example.COM ", "secret")
            .validate()
            .unwrap();
        assert_eq!(reg.username, "alice");
        assert_eq!(reg.email, "alice@example.com");
        assert_eq!(reg.password, "secret");
    }

    #[test]
    fn test_registration_required_fields() {
        let missing = RegisterRequest {
            username: None,
            email: Some("a@example.com".to_string()),
            password: Some("pw".to_string()),
            first_name: None,
            last_name: None,
        };
        assert!(matches!(missing.validate(), Err(AppError::Validation(_))));

        assert!(register("", "a@example.com", "pw").validate().is_err());
        assert!(register("   ", "a@example.com", "pw").validate().is_err());
        assert!(register("bob", "", "pw").validate().is_err());
        assert!(register("bob", "a@example.com", "").validate().is_err());
    }

    #[test]
    fn test_registration_optional_names() {
        let mut request = register("alice", "alice@example.com", "pw");
        request.first_name = Some("  Alice ".to_string());
        request.last_name = Some("   ".to_string());

        let reg = request.validate().unwrap();
        assert_eq!(reg.first_name.as_deref(), Some("Alice"));
        assert_eq!(reg.last_name, None);

        let mut request = register("alice", "alice@example.com", "pw");
        request.last_name = Some("n".repeat(51));
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_registration_limits() {
        assert!(register(&"u".repeat(51), "a@example.com", "pw").validate().is_err());
        assert!(register(&"u".repeat(50), "a@example.com", "pw").validate().is_ok());
        assert!(register("bob", "a@example.com", &"p".repeat(129)).validate().is_err());
        assert!(register("bob", "bad-email", "pw").validate().is_err());
    }

    #[test]
    fn test_login_validation() {
        let ok = LoginRequest {
            username: Some(" bob ".to_string()),
            password: Some("pw".to_string()),
        };
        assert_eq!(ok.validate().unwrap(), ("bob".to_string(), "pw".to_string()));

        let missing = LoginRequest {
            username: Some("bob".to_string()),
            password: None,
        };
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_new_calculation() {
        let new = payload(Some("Addition"), Some(4), Some(vec![1.0, 2.0]))
            .into_new(None)
            .unwrap();
        assert_eq!(new.kind, CalculationType::Addition);
        assert_eq!(new.user_id, 4);
        assert_eq!(new.inputs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_new_calculation_user_fallback() {
        let new = payload(Some("division"), None, Some(vec![1.0, 2.0]))
            .into_new(Some(9))
            .unwrap();
        assert_eq!(new.user_id, 9);

        let err = payload(Some("division"), None, Some(vec![1.0, 2.0]))
            .into_new(None)
            .unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_new_calculation_rejects_bad_input() {
        let err = payload(Some("modulus"), Some(1), Some(vec![1.0, 2.0]))
            .into_new(None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Calculation(CalculationError::UnknownOperation(_))
        ));

        let err = payload(Some("addition"), Some(1), Some(vec![1.0]))
            .into_new(None)
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Calculation(CalculationError::InsufficientInputs)
        ));

        assert!(payload(None, Some(1), Some(vec![1.0, 2.0])).into_new(None).is_err());
        assert!(payload(Some("addition"), Some(1), None).into_new(None).is_err());
    }

    #[test]
    fn test_replacement_requires_everything() {
        let patch = payload(Some("subtraction"), Some(2), Some(vec![5.0, 3.0]))
            .into_replacement(None)
            .unwrap();
        assert_eq!(patch.kind, Some(CalculationType::Subtraction));
        assert_eq!(patch.user_id, Some(2));
        assert_eq!(patch.inputs, Some(vec![5.0, 3.0]));

        assert!(payload(Some("subtraction"), Some(2), None).into_replacement(None).is_err());
    }

    #[test]
    fn test_patch() {
        let patch = payload(None, None, Some(vec![8.0, 2.0])).into_patch().unwrap();
        assert_eq!(patch.kind, None);
        assert_eq!(patch.inputs, Some(vec![8.0, 2.0]));

        let patch = payload(Some("MULTIPLICATION"), None, None).into_patch().unwrap();
        assert_eq!(patch.kind, Some(CalculationType::Multiplication));

        assert!(payload(None, None, None).into_patch().is_err());
        assert!(payload(None, None, Some(vec![])).into_patch().is_err());
        assert!(payload(Some("power"), None, None).into_patch().is_err());
    }

    #[test]
    fn test_payload_ignores_client_result() {
        let parsed: CalculationPayload = serde_json::from_value(serde_json::json!({
            "type": "addition",
            "user_id": 1,
            "inputs": [1, 2],
            "result": 999
        }))
        .unwrap();
        let new = parsed.into_new(None).unwrap();
        assert_eq!(new.inputs, vec![1.0, 2.0]);
    }

    #[test]
    fn test_payload_rejects_non_numeric_inputs() {
        let parsed = serde_json::from_value::<CalculationPayload>(serde_json::json!({
            "type": "addition",
            "inputs": [1, "two"]
        }));
        assert!(parsed.is_err());
    }
}
