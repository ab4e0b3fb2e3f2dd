//! Remote wire shape and the adapters to and from [`Quote`].
//!
//! The remote stores posts: `title` carries the quote text and `body` is a
//! JSON document encoded as a string, carrying the category and a timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Quote, QuoteId};
use crate::util::{non_empty_trimmed, normalize_category};

/// Category given to remote items whose body has none.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A post as the remote sends and receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePost {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PostBody {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Build the post sent to the remote for `quote`.
///
/// The body timestamp is the quote's own `last_updated`, or `now` for quotes
/// that never had one.
#[must_use]
pub fn to_wire(quote: &Quote, user_id: u64, now: DateTime<Utc>) -> RemotePost {
    let body = PostBody {
        category: Some(quote.category.clone()),
        timestamp: Some(quote.last_updated.unwrap_or(now).to_rfc3339()),
    };

    RemotePost {
        id: None,
        title: quote.text.clone(),
        // Serializing two optional strings cannot fail.
        body: serde_json::to_string(&body).unwrap_or_default(),
        user_id: Some(user_id),
    }
}

/// Adapt a remote post to a quote.
///
/// Returns `Error::MalformedData` when the title is blank or the body is not a
/// JSON object; callers are expected to drop such items.
pub fn from_wire(post: &RemotePost) -> Result<Quote> {
    let text = non_empty_trimmed(&post.title)
        .ok_or_else(|| Error::MalformedData(format!("post {:?} has an empty title", post.id)))?;
    let body: PostBody = serde_json::from_str(&post.body).map_err(|error| {
        Error::MalformedData(format!("post {:?} body is not valid JSON: {error}", post.id))
    })?;

    let category = body
        .category
        .as_deref()
        .and_then(normalize_category)
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
    let last_updated = body
        .timestamp
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map(|at| at.with_timezone(&Utc));

    Ok(Quote {
        id: post.id.map(QuoteId::new),
        text,
        category,
        last_updated,
    })
}

/// Adapt a fetched list of raw remote items, dropping any that are malformed.
pub fn adapt_remote_items(items: Vec<serde_json::Value>) -> Vec<Quote> {
    let total = items.len();
    let quotes = items
        .into_iter()
        .filter_map(|item| {
            let adapted = serde_json::from_value::<RemotePost>(item)
                .map_err(|error| Error::MalformedData(error.to_string()))
                .and_then(|post| from_wire(&post));
            match adapted {
                Ok(quote) => Some(quote),
                Err(error) => {
                    tracing::warn!("Dropping remote item: {}", error);
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    let dropped = total - quotes.len();
    if dropped > 0 {
        tracing::debug!("Dropped {dropped} of {total} remote items as malformed");
    }
    quotes
}
