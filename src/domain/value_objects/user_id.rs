use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::error::AppError;
use crate::shared::validation::ValidationFailureKind;

const MAX_USER_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, AppError> {
        let value = value.into();
        let trimmed = value.trim();
        Self::validate(trimmed)
            .map_err(|reason| AppError::validation(ValidationFailureKind::InvalidUserId, reason))?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), String> {
        if value.is_empty() {
            return Err("User id cannot be empty".to_string());
        }
        if value.len() > MAX_USER_ID_LEN {
            return Err(format!(
                "User id exceeds {MAX_USER_ID_LEN} characters"
            ));
        }
        if value.chars().any(char::is_whitespace) {
            return Err("User id cannot contain whitespace".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}
