//! HTTP API.
//!
//! Two endpoints: `POST /api/ask` answers a question, `GET /health` reports
//! liveness. Query-time failures arrive as typed [`QueryError`]s and are
//! mapped to status codes (504 for upstream timeouts, 502 for upstream
//! service failures, 500 for local state failures) while the body still
//! carries a friendly `answer` message for UI compatibility. A blank or
//! missing question is a 422.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lawgpt_core::{QaEngine, QueryError, SourceRef};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Clone)]
struct AppState {
    engine: Arc<QaEngine>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<SourceRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Binds the server and runs until the process is terminated.
pub async fn serve(engine: Arc<QaEngine>, bind_addr: &str) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { engine });

    info!(addr = bind_addr, "lawgpt api listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "LawGPT API",
    })
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Response {
    if request.question.trim().is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(AskResponse {
                answer: "question must not be empty".to_string(),
                sources: None,
                query_type: None,
            }),
        )
            .into_response();
    }

    info!(question = %request.question, "received question");

    match state.engine.answer(&request.question).await {
        Ok(result) => Json(AskResponse {
            answer: result.text,
            sources: if result.sources.is_empty() {
                None
            } else {
                Some(result.sources)
            },
            query_type: Some(result.style.as_str().to_string()),
        })
        .into_response(),
        Err(error) => {
            tracing::warn!(%error, "question failed");
            (
                status_for(&error),
                Json(AskResponse {
                    answer: error.user_message(),
                    sources: None,
                    query_type: None,
                }),
            )
                .into_response()
        }
    }
}

fn status_for(error: &QueryError) -> StatusCode {
    if error.is_timeout() {
        return StatusCode::GATEWAY_TIMEOUT;
    }
    match error {
        QueryError::Embedding(_) | QueryError::Llm(_) => StatusCode::BAD_GATEWAY,
        QueryError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawgpt_core::{EmbedError, LlmError};
    use std::time::Duration;

    #[test]
    fn health_body_matches_the_contract() {
        let body = serde_json::to_value(HealthResponse {
            status: "ok",
            service: "LawGPT API",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "status": "ok", "service": "LawGPT API" })
        );
    }

    #[test]
    fn upstream_failures_map_to_gateway_statuses() {
        let timeout = QueryError::Llm(LlmError::Timeout(Duration::from_secs(60)));
        assert_eq!(status_for(&timeout), StatusCode::GATEWAY_TIMEOUT);

        let embed = QueryError::Embedding(EmbedError::Service("quota".to_string()));
        assert_eq!(status_for(&embed), StatusCode::BAD_GATEWAY);

        let history = QueryError::History(std::io::Error::other("disk full"));
        assert_eq!(status_for(&history), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn empty_sources_are_omitted_from_the_body() {
        let body = serde_json::to_value(AskResponse {
            answer: "hi".to_string(),
            sources: None,
            query_type: Some("general".to_string()),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "answer": "hi", "query_type": "general" })
        );
    }
}
