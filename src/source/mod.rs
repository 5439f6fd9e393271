//! Feed source adapters: one per configured endpoint, producing normalized
//! [`RawItem`]s for a single fetch cycle.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::store::Source;

mod parse;
mod rss_source;

pub use rss_source::RssResolver;

/// An entry as the feed supplied it, before filtering and persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub categories: Vec<String>,
    /// Source-supplied instant in whatever offset the feed used.
    pub published_at: DateTime<FixedOffset>,
    pub source_name: String,
}

/// Wraps one feed endpoint. No retries: a failed fetch waits for the next cycle.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn id(&self) -> i64;
    fn name(&self) -> &str;

    /// Fetch all current entries, or fail without partial results.
    /// Returns [`FetchError::Cancelled`] once `ct` fires.
    async fn fetch(&self, ct: &CancellationToken) -> Result<Vec<RawItem>, FetchError>;
}

/// Builds the adapter for a stored source; called for every source each cycle.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, source: &Source) -> Arc<dyn FeedSource>;
}
