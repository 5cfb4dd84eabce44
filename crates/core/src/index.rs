//! Flat vector index with MMR search.
//!
//! Stores `(vector, chunk)` pairs in memory, persists them as validated JSON
//! under a directory, and answers nearest-neighbor queries with a two-stage
//! policy: cosine top-`fetch_k` first, then maximal-marginal-relevance
//! re-ranking down to `k`. Plain top-k over-represents near-duplicate chunks
//! from the same passage; MMR trades a little relevance for coverage.
//!
//! Persistence deliberately avoids any self-describing binary format: `open`
//! re-validates the declared dimension and entry count against the payload
//! before trusting it, so a tampered or truncated file surfaces as
//! [`IndexError::Corrupt`] instead of undefined behavior.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::models::{Chunk, ScoredChunk};

const INDEX_FILE: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    vector: Vec<f32>,
    chunk: Chunk,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    dimension: usize,
    entry_count: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Builds an index from parallel chunk and vector sequences.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.len() != vectors.len() {
            return Err(IndexError::Build(format!(
                "vector count {} does not match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let dimension = vectors.first().map(|vector| vector.len()).unwrap_or(0);
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    found: vector.len(),
                });
            }
        }

        let entries = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| IndexEntry { vector, chunk })
            .collect();

        Ok(Self { dimension, entries })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persists the index under `dir`, replacing any previous index in one
    /// rename so a crashed save never leaves a half-written directory behind.
    pub fn save(&self, dir: &Path) -> Result<(), IndexError> {
        let staging = staging_dir(dir)?;
        fs::create_dir_all(&staging).map_err(|error| IndexError::Build(error.to_string()))?;

        let payload = IndexFile {
            format_version: FORMAT_VERSION,
            dimension: self.dimension,
            entry_count: self.entries.len(),
            entries: self.entries.clone(),
        };
        let serialized = serde_json::to_vec(&payload)
            .map_err(|error| IndexError::Build(error.to_string()))?;
        fs::write(staging.join(INDEX_FILE), serialized)
            .map_err(|error| IndexError::Build(error.to_string()))?;

        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|error| IndexError::Build(error.to_string()))?;
        }
        fs::rename(&staging, dir).map_err(|error| IndexError::Build(error.to_string()))?;

        Ok(())
    }

    /// Loads a persisted index, validating the payload structurally before
    /// trusting it.
    pub fn open(dir: &Path) -> Result<Self, IndexError> {
        let file_path = dir.join(INDEX_FILE);
        if !file_path.exists() {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }

        let bytes = fs::read(&file_path).map_err(|error| IndexError::Corrupt(error.to_string()))?;
        let payload: IndexFile = serde_json::from_slice(&bytes)
            .map_err(|error| IndexError::Corrupt(error.to_string()))?;

        if payload.format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                payload.format_version
            )));
        }
        if payload.entry_count != payload.entries.len() {
            return Err(IndexError::Corrupt(format!(
                "declared {} entries, found {}",
                payload.entry_count,
                payload.entries.len()
            )));
        }
        for entry in &payload.entries {
            if entry.vector.len() != payload.dimension {
                return Err(IndexError::Corrupt(format!(
                    "entry vector dimension {} does not match declared dimension {}",
                    entry.vector.len(),
                    payload.dimension
                )));
            }
        }

        Ok(Self {
            dimension: payload.dimension,
            entries: payload.entries,
        })
    }

    /// Two-stage similarity search: cosine top-`fetch_k`, then MMR selection
    /// down to `k` with diversity weight `1 - lambda`.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        fetch_k: usize,
        lambda: f32,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(query, &entry.vector)))
            .collect();
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        scored.truncate(fetch_k.max(k));

        let selected = mmr_select(&scored, &self.entries, k, lambda);

        Ok(selected
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: self.entries[position].chunk.clone(),
                score,
            })
            .collect())
    }
}

/// Iteratively picks the candidate maximizing
/// `lambda * sim(query, c) - (1 - lambda) * max sim(c, selected)`.
/// With `lambda = 1` this degenerates to plain top-k order.
fn mmr_select(
    candidates: &[(usize, f32)],
    entries: &[IndexEntry],
    k: usize,
    lambda: f32,
) -> Vec<(usize, f32)> {
    let mut remaining: Vec<(usize, f32)> = candidates.to_vec();
    let mut selected: Vec<(usize, f32)> = Vec::new();

    while selected.len() < k && !remaining.is_empty() {
        let mut best_slot = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (slot, (position, query_sim)) in remaining.iter().enumerate() {
            let max_selected_sim = selected
                .iter()
                .map(|(chosen, _)| {
                    cosine_similarity(&entries[*position].vector, &entries[*chosen].vector)
                })
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() {
                0.0
            } else {
                max_selected_sim
            };

            let mmr_score = lambda * query_sim - (1.0 - lambda) * redundancy;
            if mmr_score > best_score {
                best_score = mmr_score;
                best_slot = slot;
            }
        }

        selected.push(remaining.remove(best_slot));
    }

    selected
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn staging_dir(dir: &Path) -> Result<std::path::PathBuf, IndexError> {
    let name = dir
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IndexError::Build(format!("invalid index path: {}", dir.display())))?;
    Ok(dir.with_file_name(format!("{name}.staging")))
}
