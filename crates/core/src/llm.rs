//! LLM synthesis client.
//!
//! [`LlmClient`] is the seam used by the orchestrator; [`GeminiChat`] is the
//! production implementation against the Generative Language
//! `generateContent` endpoint. No retries: a transient failure is surfaced to
//! the caller as-is, a timeout as the distinct [`LlmError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::embeddings::GEMINI_API_BASE;
use crate::error::LlmError;

/// System instructions for questions outside the legal domain.
pub const GENERAL_SYSTEM_PROMPT: &str = "\
You are a helpful assistant. Provide clear and concise responses.
Keep your answers brief and friendly.
Use **bold text** for emphasis when needed.";

/// System instructions for legal questions. The seven numbered sections
/// mirror the section captions the formatter expects, paragraph by paragraph.
pub const LEGAL_SYSTEM_PROMPT: &str = "\
You are a legal expert assistant. Provide detailed, accurate, and well-structured responses.
Format your response in the following sections:
1. Title: A clear title for the response
2. Legal Section: Relevant legal provisions or sections
3. Analysis: Detailed analysis of the legal aspects
4. Description: Comprehensive description of the legal concept
5. Legal Implications: Key implications and consequences
6. References: Relevant legal references and citations
7. Conclusion: A concise summary of key points and final thoughts

Use bullet points for lists and key points.
Include relevant legal references and citations where applicable.
Maintain a professional and authoritative tone.
Make your responses engaging and easy to understand.
Use **bold text** for important legal terms and concepts.
In the conclusion, summarize the main points and provide a clear final statement.";

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates an answer from a system instruction and a user message.
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Sampling parameters forwarded to the model.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2_000,
            top_p: 0.95,
            top_k: 40,
        }
    }
}

pub struct GeminiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    generation: GenerationConfig,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiChat {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        generation: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, GEMINI_API_BASE, generation, timeout)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        generation: GenerationConfig,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Service(error.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            generation,
            timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Service(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for GeminiChat {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": [{ "role": "user", "parts": [{ "text": user }] }],
            "generationConfig": {
                "temperature": self.generation.temperature,
                "maxOutputTokens": self.generation.max_output_tokens,
                "topP": self.generation.top_p,
                "topK": self.generation.top_k,
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            ))
            .json(&body)
            .send()
            .await
            .map_err(|error| self.classify(error))?;

        if !response.status().is_success() {
            return Err(LlmError::Service(format!(
                "generate request returned {}",
                response.status()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|error| self.classify(error))?;

        let text = parsed
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::Service(
                "model returned no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}
