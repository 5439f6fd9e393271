use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Deliver;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Select, Extract, Summarize, Publish, Commit }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Select => "select",
        Phase::Extract => "extract",
        Phase::Summarize => "summarize",
        Phase::Publish => "publish",
        Phase::Commit => "commit",
    }}
    fn span(&self) -> Span { match self {
        Phase::Select => info_span!("select"),
        Phase::Extract => info_span!("extract"),
        Phase::Summarize => info_span!("summarize"),
        Phase::Publish => info_span!("publish"),
        Phase::Commit => info_span!("commit"),
    }}
}

impl OpMarker for Deliver {
    const NAME: &'static str = "deliver";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("deliver") }
}
