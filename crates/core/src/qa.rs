//! Question-answering orchestration.
//!
//! [`QaEngine`] owns the retriever, LLM client, and history log explicitly,
//! with no module-level state, and wires the pipeline together: classify,
//! retrieve, prompt, synthesize, format, log.
//!
//! Error policy: a broken search degrades to a no-context prompt; broken
//! embedding or LLM calls abort the request with a typed [`QueryError`] that
//! the HTTP layer maps to a status code (with a friendly message preserved in
//! the body).

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::classify::{self, ResponseStyle};
use crate::error::{QueryError, RetrieveError};
use crate::format;
use crate::history::HistoryLog;
use crate::llm::{LlmClient, GENERAL_SYSTEM_PROMPT, LEGAL_SYSTEM_PROMPT};
use crate::models::{AnswerResult, SourceRef};
use crate::retriever::Retriever;

pub struct QaEngine {
    retriever: Retriever,
    llm: Arc<dyn LlmClient>,
    history: Mutex<HistoryLog>,
}

impl QaEngine {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmClient>, history: HistoryLog) -> Self {
        Self {
            retriever,
            llm,
            history: Mutex::new(history),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answers one question end to end.
    pub async fn answer(&self, question: &str) -> Result<AnswerResult, QueryError> {
        let style = classify::response_style(question);
        tracing::info!(style = style.as_str(), "classified question");

        let (context, sources) = if style.is_legal() {
            self.gather_context(question).await?
        } else {
            (String::new(), Vec::new())
        };

        let (system, user) = build_prompt(question, style, &context);
        let raw = self.llm.generate(system, &user).await?;

        // The section layout is keyed off the answer text, not the question;
        // the formatter takes that decision as an explicit flag.
        let use_sections = classify::is_legal_question(&raw);
        let text = format::format_response(&raw, style, use_sections);

        {
            let mut history = self.history.lock().await;
            history.append(question, &text)?;
        }

        Ok(AnswerResult {
            text,
            style,
            sources,
        })
    }

    /// Retrieves context chunks for a legal question. Search failures degrade
    /// to an empty context; embedding failures abort the request.
    async fn gather_context(
        &self,
        question: &str,
    ) -> Result<(String, Vec<SourceRef>), QueryError> {
        match self.retriever.retrieve(question).await {
            Ok(hits) => {
                let context = hits
                    .iter()
                    .map(|hit| hit.chunk.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let sources = hits.iter().map(SourceRef::from).collect();
                Ok((context, sources))
            }
            Err(RetrieveError::Embedding(error)) => Err(QueryError::Embedding(error)),
            Err(RetrieveError::Search(error)) => {
                tracing::warn!(%error, "retrieval failed; answering without context");
                Ok((String::new(), Vec::new()))
            }
        }
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

fn build_prompt(question: &str, style: ResponseStyle, context: &str) -> (&'static str, String) {
    if style.is_legal() {
        (
            LEGAL_SYSTEM_PROMPT,
            format!("Context: {context}\n\nQuestion: {question}"),
        )
    } else {
        (GENERAL_SYSTEM_PROMPT, question.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{CharacterNgramEmbedder, Embedder};
    use crate::error::{EmbedError, LlmError};
    use crate::index::FlatIndex;
    use crate::models::Chunk;
    use crate::retriever::RetrieverPolicy;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    struct FakeLlm {
        reply: String,
        prompts: StdMutex<Vec<(String, String)>>,
    }

    impl FakeLlm {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for FakeLlm {
        async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err(LlmError::Service("model unavailable".to_string()))
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError::Service("quota exhausted".to_string()))
        }
    }

    async fn corpus_index(embedder: &CharacterNgramEmbedder) -> FlatIndex {
        let texts = [
            "Article 21 protects life and personal liberty",
            "A writ of habeas corpus challenges unlawful detention",
            "The appellate court reviews the decree",
        ];
        let chunks: Vec<Chunk> = texts
            .iter()
            .map(|text| Chunk {
                text: text.to_string(),
                source_page: 1,
                source_doc_hash: "doc".to_string(),
            })
            .collect();
        let strings: Vec<String> = texts.iter().map(|text| text.to_string()).collect();
        let vectors = embedder.embed_batch(&strings).await.unwrap();
        FlatIndex::build(chunks, vectors).unwrap()
    }

    fn engine_with(
        retriever: Retriever,
        llm: Arc<dyn LlmClient>,
        history_path: &std::path::Path,
    ) -> QaEngine {
        let history = HistoryLog::load(history_path).unwrap();
        QaEngine::new(retriever, llm, history)
    }

    #[tokio::test]
    async fn legal_question_gets_context_and_sources() {
        let dir = tempdir().unwrap();
        let embedder = CharacterNgramEmbedder::default();
        let index = corpus_index(&embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), RetrieverPolicy::default());

        let llm = Arc::new(FakeLlm::replying("Title\n\nArticle 21 applies"));
        let engine = engine_with(retriever, llm.clone(), &dir.path().join("h.jsonl"));

        let result = engine
            .answer("what does article 21 of the constitution say")
            .await
            .unwrap();

        assert!(result.style.is_legal());
        assert!(!result.sources.is_empty());

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[0].0, LEGAL_SYSTEM_PROMPT);
        assert!(prompts[0].1.starts_with("Context: "));
        assert!(prompts[0].1.contains("Question: what does article 21"));
    }

    #[tokio::test]
    async fn general_question_skips_retrieval() {
        let dir = tempdir().unwrap();
        let embedder = CharacterNgramEmbedder::default();
        let index = corpus_index(&embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), RetrieverPolicy::default());

        let llm = Arc::new(FakeLlm::replying("It is blue."));
        let engine = engine_with(retriever, llm.clone(), &dir.path().join("h.jsonl"));

        let result = engine.answer("what color is the sky").await.unwrap();
        assert_eq!(result.style, ResponseStyle::General);
        assert!(result.sources.is_empty());
        assert_eq!(result.text, "\n👋 Response 👋\nIt is blue.\n");

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts[0].0, GENERAL_SYSTEM_PROMPT);
        assert_eq!(prompts[0].1, "what color is the sky");
    }

    #[tokio::test]
    async fn failing_embedder_aborts_with_typed_error() {
        let dir = tempdir().unwrap();
        let index = FlatIndex::build(Vec::new(), Vec::new()).unwrap();
        let retriever = Retriever::new(index, Arc::new(FailingEmbedder), RetrieverPolicy::default());

        let engine = engine_with(
            retriever,
            Arc::new(FakeLlm::replying("unused")),
            &dir.path().join("h.jsonl"),
        );

        let error = engine
            .answer("summarize the statute")
            .await
            .expect_err("embedding failure must abort");
        assert!(matches!(error, QueryError::Embedding(_)));
        assert!(error.user_message().contains("❌ Error:"));
        // Nothing was logged for the failed request.
        assert_eq!(engine.history_len().await, 0);
    }

    #[tokio::test]
    async fn failing_llm_aborts_with_typed_error() {
        let dir = tempdir().unwrap();
        let embedder = CharacterNgramEmbedder::default();
        let index = corpus_index(&embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), RetrieverPolicy::default());

        let engine = engine_with(retriever, Arc::new(FailingLlm), &dir.path().join("h.jsonl"));
        let error = engine.answer("explain the decree").await.unwrap_err();
        assert!(matches!(error, QueryError::Llm(_)));
    }

    #[tokio::test]
    async fn repeated_questions_append_two_history_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.jsonl");
        let embedder = CharacterNgramEmbedder::default();
        let index = corpus_index(&embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), RetrieverPolicy::default());

        let engine = engine_with(retriever, Arc::new(FakeLlm::replying("Answer.")), &path);
        engine.answer("what is a decree in civil law").await.unwrap();
        engine.answer("what is a decree in civil law").await.unwrap();
        assert_eq!(engine.history_len().await, 2);

        // Reload matches the in-memory log.
        let reloaded = HistoryLog::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn sectioned_answer_uses_the_caption_layout() {
        let dir = tempdir().unwrap();
        let embedder = CharacterNgramEmbedder::default();
        let index = corpus_index(&embedder).await;
        let retriever = Retriever::new(index, Arc::new(embedder), RetrieverPolicy::default());

        // The reply itself reads as legal text, so the section layout wins.
        let reply = "Writ Jurisdiction\n\nArticle 226 of the constitution\n\nThe court may issue writs";
        let engine = engine_with(
            retriever,
            Arc::new(FakeLlm::replying(reply)),
            &dir.path().join("h.jsonl"),
        );

        let result = engine.answer("explain the writ jurisdiction").await.unwrap();
        assert!(result.text.contains("📌 Title\nWrit Jurisdiction"));
        assert!(result.text.contains("📜 Legal Section\nArticle 226"));
    }
}
