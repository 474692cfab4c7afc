use crate::types::{FetchError, FetchOutcome};

/// Narrow one-argument progress contract: a fraction in `[0.0, 1.0]` of
/// bytes transferred, or an explicit `1.0` when the transfer completed with
/// an unknown total. Implementations do no I/O and no throttling; rate
/// smoothing belongs to the presentation layer.
pub trait ProgressSink: Send + Sync {
    fn report(&self, fraction: f64);
}

/// The external media-retrieval collaborator. The orchestration core passes
/// only a URL and a progress sink; format selection, output templates and
/// network options are the implementation's concern.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, sink: &dyn ProgressSink)
        -> Result<FetchOutcome, FetchError>;
}
