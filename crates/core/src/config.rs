//! Environment-driven settings.
//!
//! `GOOGLE_API_KEY` is the only required variable; everything else falls back
//! to the service defaults. Unparseable values are a hard [`ConfigError`], not
//! a silent fallback.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_LLM_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Clone)]
pub struct Settings {
    pub google_api_key: String,
    pub embedding_model: String,
    pub llm_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retriever_search_k: usize,
    pub retriever_fetch_k: usize,
    pub api_host: String,
    pub api_port: u16,
    pub index_dir: PathBuf,
    pub history_file: PathBuf,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary lookup so tests do not have to poke
    /// at process-global environment state.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let google_api_key = lookup("GOOGLE_API_KEY")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let settings = Self {
            google_api_key,
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: parse_or(&lookup, "TEMPERATURE", 0.3)?,
            max_tokens: parse_or(&lookup, "MAX_TOKENS", 2_000)?,
            top_k: parse_or(&lookup, "TOP_K", 40)?,
            top_p: parse_or(&lookup, "TOP_P", 0.95)?,
            chunk_size: parse_or(&lookup, "CHUNK_SIZE", 2_000)?,
            chunk_overlap: parse_or(&lookup, "CHUNK_OVERLAP", 200)?,
            retriever_search_k: parse_or(&lookup, "RETRIEVER_SEARCH_K", 5)?,
            retriever_fetch_k: parse_or(&lookup, "RETRIEVER_FETCH_K", 10)?,
            api_host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: parse_or(&lookup, "API_PORT", 8_800)?,
            index_dir: lookup("INDEX_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("db/index")),
            history_file: lookup("HISTORY_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("conversation_history.jsonl")),
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)?),
        };

        if settings.chunk_overlap >= settings.chunk_size {
            return Err(ConfigError::Invalid {
                name: "CHUNK_OVERLAP",
                value: format!(
                    "{} (must be smaller than CHUNK_SIZE={})",
                    settings.chunk_overlap, settings.chunk_size
                ),
            });
        }
        if settings.retriever_fetch_k < settings.retriever_search_k {
            return Err(ConfigError::Invalid {
                name: "RETRIEVER_FETCH_K",
                value: format!(
                    "{} (must be at least RETRIEVER_SEARCH_K={})",
                    settings.retriever_fetch_k, settings.retriever_search_k
                ),
            });
        }

        Ok(settings)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}
