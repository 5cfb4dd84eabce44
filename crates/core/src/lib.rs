pub mod chunking;
pub mod classify;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod format;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod models;
pub mod qa;
pub mod retriever;

pub use chunking::{split_text, ChunkingConfig};
pub use classify::{is_legal_question, response_style, ResponseStyle};
pub use config::Settings;
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, GeminiEmbedder, GEMINI_EMBEDDING_DIMENSIONS,
};
pub use error::{
    ConfigError, EmbedError, IndexError, IngestError, LlmError, QueryError, RetrieveError,
};
pub use format::{format_bold_text, format_response};
pub use history::{HistoryEntry, HistoryLog};
pub use index::FlatIndex;
pub use ingest::{
    discover_documents, ingest_path, load_and_chunk, IngestOptions, IngestReport, SkippedFile,
};
pub use llm::{GeminiChat, GenerationConfig, LlmClient};
pub use loader::{fingerprint, load_pages, PageText};
pub use models::{AnswerResult, Chunk, DocumentFingerprint, ScoredChunk, SourceRef};
pub use qa::QaEngine;
pub use retriever::{Retriever, RetrieverPolicy};
