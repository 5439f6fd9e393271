use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Fetch;

#[derive(Copy, Clone, Debug)]
pub enum Phase { ListSources, Source, FetchFeed, ParseFeed, WriteArticle }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::ListSources => "list_sources",
        Phase::Source => "source",
        Phase::FetchFeed => "fetch_feed",
        Phase::ParseFeed => "parse_feed",
        Phase::WriteArticle => "write_article",
    }}
    fn span(&self) -> Span { match self {
        Phase::ListSources => info_span!("list_sources"),
        Phase::Source => info_span!("source"),
        Phase::FetchFeed => info_span!("fetch_feed"),
        Phase::ParseFeed => info_span!("parse_feed"),
        Phase::WriteArticle => info_span!("write_article"),
    }}
}

impl OpMarker for Fetch {
    const NAME: &'static str = "fetch";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("fetch") }
}
