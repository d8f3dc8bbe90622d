use thiserror::Error;

/// Result type for acorus operations.
pub type Result<T> = std::result::Result<T, AcorusError>;

/// Error type for acorus operations.
#[derive(Error, Debug)]
pub enum AcorusError {
    /// An entity type or document-type name that was never registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The engine refused the compiled query.
    #[error("query rejected by engine: {0}")]
    QueryRejected(String),

    /// A hit's body does not match the type resolved for it.
    ///
    /// This indicates a mapping or schema mismatch and fails the whole call;
    /// partial results are never silently dropped.
    #[error("failed to decode hit '{id}' as {target}: {source}")]
    Deserialization {
        /// Identifier of the offending hit.
        id: String,
        /// Name of the type the hit was decoded as.
        target: &'static str,
        /// Raw body of the offending hit.
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// The bulk delete loop aborted after some deletions were confirmed.
    ///
    /// Callers should treat this as a recoverable, retryable state.
    #[error("bulk delete aborted after {deleted} confirmed deletions: {source}")]
    PartialDeletion {
        /// Number of documents confirmed deleted before the failure.
        deleted: u64,
        #[source]
        source: Box<AcorusError>,
    },

    /// Transport or engine-side failure, reported unchanged.
    #[error("engine error: {0}")]
    Engine(String),
}

impl AcorusError {
    /// Create an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        AcorusError::UnknownType(name.into())
    }

    /// Create a query rejected error.
    pub fn query_rejected(reason: impl Into<String>) -> Self {
        AcorusError::QueryRejected(reason.into())
    }

    /// Create an engine error.
    pub fn engine(message: impl Into<String>) -> Self {
        AcorusError::Engine(message.into())
    }
}
