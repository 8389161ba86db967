//! Batch translation API used by the page translator script.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;

/// Request body for `POST /api/translate`.
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    /// Target language code, e.g. `en` or `zh-Hant`.
    pub target: String,
    pub texts: Vec<String>,
}

/// Response body: one entry per input text, in input order.
#[derive(Debug, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub texts: Vec<String>,
}

/// Translate a batch of page texts.
///
/// # Errors
///
/// Returns 503 when no translator is configured, 400 for invalid requests
/// and 502 when the provider fails.
#[instrument(skip(state, request), fields(target_lang = %request.target, count = request.texts.len()))]
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Json<TranslateResponse>, AppError> {
    let translator = state.translator().ok_or_else(|| {
        AppError::ServiceUnavailable("Translation is not configured".to_string())
    })?;

    let texts = translator
        .translate(request.target.trim(), request.texts)
        .await?;
    Ok(Json(TranslateResponse { texts }))
}
