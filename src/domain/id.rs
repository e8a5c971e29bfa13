use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Provider order identifier. One order id is one logical purchase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::malformed("order_id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Customer email, trimmed and lower-cased. Accounts are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> Result<Self, PipelineError> {
        let email = email.as_ref().trim().to_lowercase();
        let valid = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
            None => false,
        };
        if !valid {
            return Err(PipelineError::malformed(format!(
                "invalid customer email: {email:?}"
            )));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
