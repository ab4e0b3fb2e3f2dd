//! Quote model

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{non_empty_trimmed, normalize_category};

/// Identifier assigned by the remote when a quote is first created there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(u64);

impl QuoteId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quote in the local collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Remote identifier, absent until the first successful push
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteId>,
    /// Quote text
    pub text: String,
    /// Lowercased category
    pub category: String,
    /// Last local or remote modification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Quote {
    /// Create a validated, not-yet-synced quote stamped with the current time.
    ///
    /// Text is trimmed and the category is trimmed and lowercased. Either one
    /// being empty is a validation error.
    pub fn new(text: &str, category: &str) -> Result<Self> {
        let text = non_empty_trimmed(text)
            .ok_or_else(|| Error::Validation("quote text is required".to_string()))?;
        let category = normalize_category(category)
            .ok_or_else(|| Error::Validation("quote category is required".to_string()))?;

        Ok(Self {
            id: None,
            text,
            category,
            last_updated: Some(Utc::now()),
        })
    }

    /// Attach a remote id.
    #[must_use]
    pub fn with_id(mut self, id: QuoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Override the modification timestamp.
    #[must_use]
    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// The `(text, category)` pair used to compare collections.
    #[must_use]
    pub fn projection(&self) -> (&str, &str) {
        (&self.text, &self.category)
    }

    /// Whether text and category match another quote, ignoring id and time.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.projection() == other.projection()
    }
}
