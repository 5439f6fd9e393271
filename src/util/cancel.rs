use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Drive `fut` to completion unless `ct` fires first.
///
/// Used around store calls so a cycle unwinds promptly on shutdown; the
/// dropped future releases its connection back to the pool.
pub async fn until_cancelled<T, E, F>(ct: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, E>>,
    PipelineError: From<E>,
{
    tokio::select! {
        biased;
        _ = ct.cancelled() => Err(PipelineError::Cancelled),
        res = fut => res.map_err(PipelineError::from),
    }
}
