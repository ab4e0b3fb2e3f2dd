//! Remote gateway: fetches and pushes quotes over HTTP.

mod http;
pub mod wire;

use crate::error::Result;
use crate::models::Quote;

pub use http::HttpRemoteGateway;
pub use wire::RemotePost;

/// Trait for the remote side of a sync
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    /// Fetch the remote collection, silently dropping malformed items
    async fn fetch_all(&self) -> Result<Vec<Quote>>;

    /// Push `quotes` one at a time, in order, returning the echoed records.
    ///
    /// The first failure stops the run; the records already pushed are
    /// returned inside `Error::Push` and are not rolled back.
    async fn push_all(&self, quotes: &[Quote]) -> Result<Vec<Quote>>;
}
