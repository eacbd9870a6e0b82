use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cefr_analyzer::DictionaryEngine;
use cefr_dict::{DictError, DictionaryRecord, LookupOutcome};
use cefr_types::AnalysisResult;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub const DEFAULT_MAX_TEXT_BYTES: usize = 256 * 1024;
pub const MAX_LOOKUP_BATCH: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DictionaryEngine>,
    pub max_text_bytes: usize,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub word: String,
}

#[derive(Deserialize)]
pub struct LookupBatchRequest {
    pub words: Vec<String>,
}

#[derive(Serialize)]
pub struct LookupResponse {
    word: String,
    #[serde(flatten)]
    record: DictionaryRecord,
}

#[derive(Serialize)]
pub struct LookupBatchEntry {
    word: String,
    #[serde(flatten)]
    outcome: LookupOutcome,
}

#[derive(Serialize)]
pub struct LookupBatchResponse {
    results: Vec<LookupBatchEntry>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/analyze", post(analyze))
        .route("/v1/lookup", get(lookup).post(lookup_batch))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "lexicon_entries": state.engine.lexicon().len(),
        "dictionary": state.engine.has_dictionary(),
    }))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    if request.text.len() > state.max_text_bytes {
        return Err(ApiError::PayloadTooLarge {
            limit: state.max_text_bytes,
        });
    }
    let engine = Arc::clone(&state.engine);
    let result = tokio::task::spawn_blocking(move || engine.analyze(&request.text))
        .await
        .map_err(|err| {
            error!(error = %err, "analysis task failed");
            ApiError::Internal
        })?;
    Ok(Json(result))
}

async fn lookup(
    State(state): State<AppState>,
    Query(params): Query<LookupQuery>,
) -> Result<Response, ApiError> {
    let word = params.word.trim();
    if word.is_empty() {
        return Err(ApiError::bad_request("word is required"));
    }
    let record = state
        .engine
        .lookup_word(word)?
        .ok_or_else(|| ApiError::NotFound(word.to_string()))?;

    let response = LookupResponse {
        word: word.to_string(),
        record,
    };
    Ok((
        [(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=300"),
        )],
        Json(response),
    )
        .into_response())
}

async fn lookup_batch(
    State(state): State<AppState>,
    Json(request): Json<LookupBatchRequest>,
) -> Result<Json<LookupBatchResponse>, ApiError> {
    if request.words.is_empty() {
        return Err(ApiError::bad_request("words must not be empty"));
    }
    if request.words.len() > MAX_LOOKUP_BATCH {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_LOOKUP_BATCH} words per request"
        )));
    }
    let results = state
        .engine
        .lookup_words(&request.words)?
        .into_iter()
        .map(|(word, outcome)| LookupBatchEntry { word, outcome })
        .collect();
    Ok(Json(LookupBatchResponse { results }))
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("text exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("no dictionary entry for {0:?}")]
    NotFound(String),
    #[error("dictionary is not loaded")]
    Unavailable,
    #[error("{0}")]
    Unprocessable(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DictError> for ApiError {
    fn from(err: DictError) -> Self {
        match err {
            DictError::IndexNotLoaded | DictError::RecordsNotLoaded => ApiError::Unavailable,
            DictError::TruncatedRecord { .. } | DictError::CorruptRecord { .. } => {
                warn!(error = %err, "corrupt dictionary record");
                ApiError::Unprocessable(err.to_string())
            }
            other => {
                error!(error = %other, "dictionary lookup failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
