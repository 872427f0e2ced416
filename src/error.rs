use thiserror::Error;

/// Failure taxonomy for the collection pipeline.
///
/// `Configuration` is fatal and raised before any batch work starts.
/// `Network` and `Parse` are per-point failures: the orchestrator logs
/// them and moves on to the next point. `Io` covers output-unit
/// creation and writing; the affected unit is never left half-marked,
/// so the batch is retried in full on the next run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Invalid setup: non-positive batch capacity, unresolvable
    /// coordinate reference system, malformed input dataset or
    /// endpoint URL.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport failure, timeout, or non-success HTTP status from the
    /// metadata service.
    #[error("network error: {0}")]
    Network(String),

    /// Response present but not in the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Output unit creation or write failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
