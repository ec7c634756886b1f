// ==============================================================================
// Engine Errors
// ==============================================================================

/// Failures talking to the wallet engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("engine returned error {code}: {message}")]
    ServerError { code: i64, message: String },

    #[error("invalid engine response: {0}")]
    InvalidResponse(String),

    #[error("missing batch response item for id {id}")]
    MissingBatchItem { id: u64 },

    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

// ==============================================================================
// Core Errors
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("wallet engine failure: {0}")]
    Engine(#[from] EngineError),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("snapshot parse error: {0}")]
    SnapshotParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
