use thiserror::Error;

/// Failures while loading the corpus or building the chunk store.
///
/// These are structural: a partially built store is never returned.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lecture corpus not found: {0}")]
    CorpusNotFound(String),

    #[error("embedding failed for chunk {chunk_id}: {source}")]
    Embedding {
        chunk_id: usize,
        #[source]
        source: EmbedError,
    },

    #[error("cache serialization error: {0}")]
    CacheSerialization(#[from] serde_json::Error),

    #[error("embedding rows ({rows}) do not match chunk count ({chunks})")]
    RowMismatch { rows: usize, chunks: usize },
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from embedding backend: {0}")]
    BackendResponse(String),

    #[error("embedding width {got} does not match the configured {expected} dimensions")]
    DimensionMismatch { got: usize, expected: usize },
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("http error: {0}")]
    Http(reqwest::Error),

    #[error("generation request timed out after {0} ms")]
    Timeout(u64),

    #[error("generation backend returned {code}: {details}")]
    Status { code: u16, details: String },

    #[error("invalid response from generation backend: {0}")]
    BackendResponse(String),

    #[error("generation backend is not configured: {0}")]
    NotConfigured(String),
}

/// Per-question failures from the answer synthesizer.
///
/// `Generation` means context was found but the external service could not
/// produce an answer; callers branch on it separately from the no-content
/// outcome, which is not an error at all (see `Answer`).
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("generation unavailable: {0}")]
    Generation(#[source] GenerationError),
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
