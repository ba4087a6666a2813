//! Structured error taxonomy shared by every CALM operation.
//!
//! Every public operation returns [`Result<T>`] instead of panicking or
//! leaking an implementation-specific error type to callers — see spec.md
//! §7. The `kind()` string is stable and matches the tool-facing
//! `{"error": {"type": ..., "message": ...}}` envelope from spec.md §6.1.

/// Result type alias used throughout CALM.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the CALM observation-to-knowledge pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input failed a precondition; message lists valid options or ranges.
    #[error("{0}")]
    Validation(String),

    /// A referenced id or collection is absent.
    #[error("{0}")]
    NotFound(String),

    /// The session already has an active GHAP entry.
    #[error("{0}")]
    ActiveExists(String),

    /// The clusterer was asked to run on fewer points than `min_cluster_size`.
    #[error("{0}")]
    InsufficientData(String),

    /// No gate pass was ever recorded for the `(task_id, transition)` pair.
    #[error("{0}")]
    NoPass(String),

    /// A gate pass exists but was recorded against a different commit.
    #[error("{0}")]
    ShaMismatch(String),

    /// Embedding model inference failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector or metadata store rejected a call.
    #[error("storage error: {0}")]
    Storage(String),

    /// Unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The stable `type` string for the tool-facing error envelope (spec.md §6.1).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::ActiveExists(_) => "active_exists",
            Error::InsufficientData(_) => "insufficient_data",
            Error::NoPass(_) => "no_pass",
            Error::ShaMismatch(_) => "sha_mismatch",
            Error::Embedding(_) => "embedding_error",
            Error::Storage(_) => "storage_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether a caller may usefully retry this operation (possibly with backoff).
    ///
    /// Storage and embedding failures are often transient; validation and
    /// state-machine failures are not — retrying with the same input cannot
    /// succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Embedding(_))
    }

    /// Render the `{"error": {"type": ..., "message": ...}}` envelope from spec.md §6.1.
    #[must_use]
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        })
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Error::Validation("x".into()).kind(), "validation_error");
        assert_eq!(Error::NotFound("x".into()).kind(), "not_found");
        assert_eq!(Error::ActiveExists("x".into()).kind(), "active_exists");
        assert_eq!(
            Error::InsufficientData("x".into()).kind(),
            "insufficient_data"
        );
        assert_eq!(Error::NoPass("x".into()).kind(), "no_pass");
        assert_eq!(Error::ShaMismatch("x".into()).kind(), "sha_mismatch");
        assert_eq!(Error::Embedding("x".into()).kind(), "embedding_error");
        assert_eq!(Error::Storage("x".into()).kind(), "storage_error");
        assert_eq!(Error::Internal("x".into()).kind(), "internal_error");
    }

    #[test]
    fn recoverability() {
        assert!(Error::Storage("x".into()).is_recoverable());
        assert!(Error::Embedding("x".into()).is_recoverable());
        assert!(!Error::Validation("x".into()).is_recoverable());
        assert!(!Error::ActiveExists("x".into()).is_recoverable());
    }

    #[test]
    fn envelope_shape() {
        let err = Error::NotFound("collection 'ghap_full' not found".into());
        let env = err.to_envelope();
        assert_eq!(env["error"]["type"], "not_found");
        assert!(env["error"]["message"]
            .as_str()
            .unwrap()
            .contains("ghap_full"));
    }
}
