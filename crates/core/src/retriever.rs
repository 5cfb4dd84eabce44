//! Retrieval policy over the vector index.
//!
//! Wraps the index with the fixed search policy (`k` results drawn from a
//! `fetch_k` candidate pool, MMR diversity re-ranking) and the question
//! embedder. Searches take a read lock so concurrent queries proceed in
//! parallel; an index rebuild swaps the whole index under the write lock.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::embeddings::Embedder;
use crate::error::RetrieveError;
use crate::index::FlatIndex;
use crate::models::ScoredChunk;

#[derive(Debug, Clone, Copy)]
pub struct RetrieverPolicy {
    pub search_k: usize,
    pub fetch_k: usize,
    /// MMR relevance/diversity trade-off; 1.0 is plain nearest-neighbor.
    pub lambda: f32,
}

impl Default for RetrieverPolicy {
    fn default() -> Self {
        Self {
            search_k: 5,
            fetch_k: 10,
            lambda: 0.5,
        }
    }
}

pub struct Retriever {
    index: Arc<RwLock<FlatIndex>>,
    embedder: Arc<dyn Embedder>,
    policy: RetrieverPolicy,
}

impl Retriever {
    pub fn new(index: FlatIndex, embedder: Arc<dyn Embedder>, policy: RetrieverPolicy) -> Self {
        Self {
            index: Arc::new(RwLock::new(index)),
            embedder,
            policy,
        }
    }

    pub fn policy(&self) -> RetrieverPolicy {
        self.policy
    }

    /// Embeds the question and runs the two-stage search.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>, RetrieveError> {
        let query = self.embedder.embed_one(question).await?;
        let index = self.index.read().await;
        let hits = index.search(
            &query,
            self.policy.search_k,
            self.policy.fetch_k,
            self.policy.lambda,
        )?;
        Ok(hits)
    }

    /// Replaces the in-memory index wholesale. Readers in flight finish
    /// against the old index; new readers see only the replacement.
    pub async fn swap_index(&self, replacement: FlatIndex) {
        let mut index = self.index.write().await;
        *index = replacement;
    }

    pub async fn index_len(&self) -> usize {
        self.index.read().await.len()
    }
}
