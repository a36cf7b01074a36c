//! Progressive analysis and session endpoints

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::coaching::read_upload;
use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisSession, ClipAnalysis};

/// DELETE /session/:session_id response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionResponse {
    pub status: &'static str,
    pub session_id: String,
    /// Whether there was anything to delete.
    pub existed: bool,
}

/// POST /progressive_analysis
pub async fn progressive_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ClipAnalysis>> {
    let mut upload = read_upload(multipart).await?;
    let media = upload.require_media()?;
    let session_id = upload
        .field("sessionId")
        .ok_or_else(|| ApiError::BadRequest("missing 'sessionId' field".to_string()))?
        .to_string();

    let analysis = state.engine.submit_clip(&session_id, &media).await?;
    Ok(Json(analysis))
}

/// GET /session/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<AnalysisSession>> {
    let slot = state.sessions.get(&session_id).await?;
    Ok(Json(slot.snapshot().await))
}

/// DELETE /session/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<DeleteSessionResponse> {
    let existed = state.sessions.delete(&session_id).await;
    Json(DeleteSessionResponse {
        status: "deleted",
        session_id,
        existed,
    })
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/progressive_analysis", post(progressive_analysis))
        .route("/session/:session_id", get(get_session).delete(delete_session))
}
