//! HTTP implementation of the remote gateway.

use chrono::Utc;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use super::wire::{adapt_remote_items, from_wire, to_wire, RemotePost};
use super::RemoteGateway;
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::Quote;
use crate::util::{compact_text, normalize_endpoint};

/// `RemoteGateway` talking to a posts-style JSON collection endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemoteGateway {
    endpoint: String,
    user_id: u64,
    client: reqwest::Client,
}

impl HttpRemoteGateway {
    /// Build a gateway for an explicit endpoint.
    pub fn new(endpoint: &str, user_id: u64) -> Result<Self> {
        Ok(Self {
            endpoint: normalize_endpoint(endpoint)?,
            user_id,
            client: reqwest::Client::builder().build()?,
        })
    }

    /// Build a gateway from sync configuration, honouring its request timeout.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            endpoint: normalize_endpoint(&config.endpoint)?,
            user_id: config.user_id,
            client: builder.build()?,
        })
    }

    /// Returns the endpoint this gateway was configured with.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn push_one(&self, quote: &Quote) -> Result<Quote> {
        let payload = to_wire(quote, self.user_id, Utc::now());
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let echoed = response.json::<RemotePost>().await;
        match echoed.map_err(Error::from).and_then(|post| from_wire(&post)) {
            Ok(echo) => Ok(echo),
            Err(error) => {
                tracing::warn!(
                    "Remote accepted \"{}\" but its echo was unusable: {}",
                    compact_text(&quote.text),
                    error
                );
                Ok(quote.clone())
            }
        }
    }
}

impl RemoteGateway for HttpRemoteGateway {
    async fn fetch_all(&self) -> Result<Vec<Quote>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("userId", self.user_id)])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let status = response.status().as_u16();

        let body = response.text().await?;
        let items = serde_json::from_str::<Vec<serde_json::Value>>(&body).map_err(|error| {
            Error::Api {
                status,
                message: format!("expected a JSON array of posts: {error}"),
            }
        })?;

        let quotes = adapt_remote_items(items);
        tracing::debug!("Fetched {} remote quotes from {}", quotes.len(), self.endpoint);
        Ok(quotes)
    }

    async fn push_all(&self, quotes: &[Quote]) -> Result<Vec<Quote>> {
        let mut completed = Vec::with_capacity(quotes.len());

        for quote in quotes {
            match self.push_one(quote).await {
                Ok(echo) => completed.push(echo),
                Err(source) => {
                    tracing::warn!(
                        "Push stopped after {} of {} quotes: {}",
                        completed.len(),
                        quotes.len(),
                        source
                    );
                    return Err(Error::Push {
                        completed,
                        source: Box::new(source),
                    });
                }
            }
        }

        Ok(completed)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Api {
        status,
        message: parse_api_error(&body),
    })
}

fn parse_api_error(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed
    }
}
