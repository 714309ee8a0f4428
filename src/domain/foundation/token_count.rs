//! Token count value object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Non-negative count of tokens.
///
/// Constructed either from an exact count reported by an upstream provider
/// or estimated from text at roughly four characters per token. The
/// estimate under-counts for non-Latin scripts, which pack more meaning
/// per character; it is used for routing decisions only, never for billing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenCount(u32);

impl TokenCount {
    /// A count of zero tokens.
    pub const ZERO: TokenCount = TokenCount(0);

    /// Creates a token count from an exact value.
    pub fn new(count: u32) -> Self {
        Self(count)
    }

    /// Estimates the token count of a piece of text (`chars / 4`, floored).
    pub fn from_text(text: &str) -> Self {
        Self((text.chars().count() / 4) as u32)
    }

    /// Returns true when this count is strictly above `limit`.
    pub fn exceeds(&self, limit: u32) -> bool {
        self.0 > limit
    }

    /// Returns true when the count is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw count.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Add for TokenCount {
    type Output = TokenCount;

    fn add(self, rhs: TokenCount) -> TokenCount {
        TokenCount(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for TokenCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
