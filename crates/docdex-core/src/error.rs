use thiserror::Error;

/// Error taxonomy shared across the pipeline.
///
/// `FieldLengthExceeded` is the one condition callers never see: the
/// highlight negotiator absorbs it by narrowing the highlight scope.
/// `Transient` is retried with bounded backoff before being surfaced.
/// Everything else carries enough context (document id, field name,
/// migration step) to diagnose without forwarding raw engine text.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("field '{field}' exceeds the analyzed-offset limit for highlighting")]
    FieldLengthExceeded { field: String },

    #[error("transient engine error: {reason}")]
    Transient { reason: String },

    #[error("index write failed for document '{id}': {reason}")]
    IndexWrite { id: String, reason: String },

    #[error("schema mismatch on field '{field}': expected {expected}, found {actual}")]
    SchemaMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("migration failed during {step}: {reason}")]
    MigrationFailed { step: String, reason: String },

    #[error("document not found: {id}")]
    NotFound { id: String },

    #[error("failed to parse '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("engine error: {0}")]
    Engine(#[from] anyhow::Error),
}

impl Error {
    /// Transient conditions are worth a bounded retry; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
