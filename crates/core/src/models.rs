use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ResponseStyle;

/// Identity of an ingested source file. Immutable once created; the checksum
/// (sha256 of the raw bytes) keys the chunks back to their document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// One embeddable text window cut from a document page. Owned by the vector
/// index after embedding; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_page: u32,
    pub source_doc_hash: String,
}

/// A retrieved chunk together with its query similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Citation surfaced alongside an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_doc_hash: String,
    pub page: u32,
    pub score: f32,
}

impl From<&ScoredChunk> for SourceRef {
    fn from(hit: &ScoredChunk) -> Self {
        Self {
            source_doc_hash: hit.chunk.source_doc_hash.clone(),
            page: hit.chunk.source_page,
            score: hit.score,
        }
    }
}

/// Final product of the question-answering pipeline.
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub text: String,
    pub style: ResponseStyle,
    pub sources: Vec<SourceRef>,
}
