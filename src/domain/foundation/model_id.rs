//! Model identifier value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Identifier of an upstream model in `<provider>/<model>` form.
///
/// The provider component (everything before the first `/`) is derived for
/// display and per-provider bookkeeping only; equality is by full string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Creates a ModelId, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::empty_field("model"));
        }
        Ok(Self(id))
    }

    /// Returns the full model id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the provider component (before the first `/`).
    ///
    /// Ids without a slash are treated as their own provider.
    pub fn provider(&self) -> &str {
        match self.0.split_once('/') {
            Some((provider, _)) => provider,
            None => &self.0,
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModelId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
