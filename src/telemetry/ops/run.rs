use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Run;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Fetcher, Notifier }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Fetcher => "fetcher", Phase::Notifier => "notifier" } }
    fn span(&self) -> Span { match self { Phase::Fetcher => info_span!("fetcher"), Phase::Notifier => info_span!("notifier") } }
}

impl OpMarker for Run {
    const NAME: &'static str = "run";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("run") }
}
