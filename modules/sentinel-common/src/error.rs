use thiserror::Error;

/// Central error type for the ingestion pipeline, per §7 of the design.
///
/// Per-row and per-entry failures inside adapters and the processing sweep
/// are logged and absorbed locally; this enum covers only the failures that
/// must propagate to a caller (an adapter fetch, a store operation, the
/// graph writer, or a programmer mistake at the call site).
#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("adapter fetch failed for {adapter}: {source}")]
    Fetch {
        adapter: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("raw store error: {0}")]
    RawStore(String),

    #[error("graph store error: {0}")]
    GraphStore(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
