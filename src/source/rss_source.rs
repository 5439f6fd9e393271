use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::FetchError;
use crate::store::Source;
use crate::telemetry;
use crate::telemetry::ops::fetch::Phase as FetchPhase;

use super::{parse, FeedSource, RawItem, SourceResolver};

/// RSS 2.0 endpoint fetched over HTTP.
pub struct RssSource {
    client: Client,
    id: i64,
    name: String,
    url: String,
}

impl RssSource {
    pub fn new(client: Client, source: &Source) -> Self {
        Self { client, id: source.id, name: source.name.clone(), url: source.feed_url.clone() }
    }

    async fn load_feed(&self) -> Result<Vec<RawItem>, FetchError> {
        let log = telemetry::fetch();
        let xml = self.fetch_rss().instrument(log.span(&FetchPhase::FetchFeed)).await?;

        let _s = log.span(&FetchPhase::ParseFeed).entered();
        let channel = parse::parse_channel(&xml)
            .map_err(|source| FetchError::Parse { url: self.url.clone(), source })?;
        Ok(parse::to_raw_items(&channel, &self.name, Utc::now()))
    }

    async fn fetch_rss(&self) -> Result<Bytes, FetchError> {
        let http = |source| FetchError::Http { url: self.url.clone(), source };
        let resp = self.client.get(&self.url).send().await.map_err(http)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: self.url.clone(), status });
        }
        resp.bytes().await.map_err(http)
    }
}

#[async_trait]
impl FeedSource for RssSource {
    fn id(&self) -> i64 { self.id }

    fn name(&self) -> &str { &self.name }

    async fn fetch(&self, ct: &CancellationToken) -> Result<Vec<RawItem>, FetchError> {
        // dropping the in-flight request on cancel aborts the connection
        tokio::select! {
            biased;
            _ = ct.cancelled() => Err(FetchError::Cancelled),
            res = self.load_feed() => res,
        }
    }
}

/// Resolves every stored source to an [`RssSource`] sharing one HTTP client.
#[derive(Clone)]
pub struct RssResolver {
    client: Client,
}

impl RssResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl SourceResolver for RssResolver {
    fn resolve(&self, source: &Source) -> Arc<dyn FeedSource> {
        Arc::new(RssSource::new(self.client.clone(), source))
    }
}
