use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration problems. Fatal: the process exits nonzero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Ingestion-time failures. Any of these aborts the ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document load error: {0}")]
    Load(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("no documents found under {0}")]
    NoDocuments(String),

    #[error(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Remote embedding call failures. No partial success: a failed batch fails
/// the whole call and the caller retries from scratch.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding service error: {0}")]
    Service(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
}

/// Vector index lifecycle failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("index corrupt: {0}")]
    Corrupt(String),

    #[error("index build error: {0}")]
    Build(String),

    #[error("vector dimension {found} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Remote LLM call failures.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm service error: {0}")]
    Service(String),

    #[error("llm request timed out after {0:?}")]
    Timeout(Duration),
}

/// Retrieval failures, split so the orchestrator can tell a broken embedding
/// call (abort the in-flight request) from a broken search (degrade to a
/// no-context prompt).
#[derive(Debug, Error)]
pub enum RetrieveError {
    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Search(#[from] IndexError),
}

/// Query-time failures surfaced by the orchestrator. The HTTP layer maps
/// these to status codes; the CLI renders them with [`QueryError::user_message`].
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("history write failed: {0}")]
    History(#[from] std::io::Error),
}

impl QueryError {
    /// Friendly single-line rendering carrying the upstream error marker.
    pub fn user_message(&self) -> String {
        format!("❌ Error: {self}")
    }

    /// True when the underlying cause was a remote-call timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QueryError::Embedding(EmbedError::Timeout(_)) | QueryError::Llm(LlmError::Timeout(_))
        )
    }
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_error_marker() {
        let error = QueryError::Llm(LlmError::Service("quota exceeded".to_string()));
        let message = error.user_message();
        assert!(message.starts_with("❌ Error:"));
        assert!(message.contains("quota exceeded"));
    }

    #[test]
    fn timeouts_are_detected_across_upstreams() {
        let embed = QueryError::Embedding(EmbedError::Timeout(Duration::from_secs(30)));
        let llm = QueryError::Llm(LlmError::Timeout(Duration::from_secs(30)));
        let other = QueryError::Llm(LlmError::Service("boom".to_string()));
        assert!(embed.is_timeout());
        assert!(llm.is_timeout());
        assert!(!other.is_timeout());
    }
}
