//! Single-shot coaching endpoints
//!
//! `POST /analyze_sequence` parses the model reply into a coaching
//! response. `POST /video_feed` is the legacy single-frame endpoint and
//! returns the raw reply; it always answers 200, with errors folded into
//! the message.

use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

use super::AppState;
use crate::analysis::drills::{prompt_for, GENERAL_DRILL};
use crate::error::{ApiError, ApiResult, OracleError};
use crate::models::{CoachingResponse, Media};

/// Multipart part carrying the clip.
const MEDIA_FIELD: &str = "video";

/// MIME type assumed when the client does not send one.
const DEFAULT_VIDEO_MIME: &str = "video/mp4";

const FRAME_PROMPT: &str =
    "Analyze this image for basketball dribbling form and provide concise feedback.";

/// Parsed multipart upload: the clip plus any text fields.
#[derive(Debug, Default)]
pub struct ClipUpload {
    pub media: Option<Media>,
    pub fields: HashMap<String, String>,
}

impl ClipUpload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The clip, or a 400 if it is missing or empty.
    pub fn require_media(&mut self) -> ApiResult<Media> {
        match self.media.take() {
            Some(media) if !media.is_empty() => Ok(media),
            _ => Err(ApiError::BadRequest(format!(
                "missing or empty '{}' file",
                MEDIA_FIELD
            ))),
        }
    }
}

/// Drain a multipart body into a [`ClipUpload`].
pub async fn read_upload(mut multipart: Multipart) -> ApiResult<ClipUpload> {
    let mut upload = ClipUpload::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == MEDIA_FIELD {
            let mime_type = field
                .content_type()
                .unwrap_or(DEFAULT_VIDEO_MIME)
                .to_string();
            let data = field.bytes().await?;
            upload.media = Some(Media::new(mime_type, data));
        } else {
            let value = field.text().await?;
            upload.fields.insert(name, value);
        }
    }

    Ok(upload)
}

/// POST /analyze_sequence
pub async fn analyze_sequence(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<CoachingResponse>> {
    let mut upload = read_upload(multipart).await?;
    let media = upload.require_media()?;
    let drill = upload.field("drill").unwrap_or(GENERAL_DRILL).to_string();

    info!(
        "Analyzing {} clip ({} bytes) for drill '{}'",
        media.mime_type,
        media.len(),
        drill
    );

    let reply = state.oracle.generate(prompt_for(&drill), Some(&media)).await?;
    Ok(Json(state.parser.parse(&reply, &drill)))
}

/// Legacy frame upload.
#[derive(Debug, Deserialize)]
pub struct ImageData {
    /// Data URL, e.g. `data:image/jpeg;base64,...`
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct FrameMessage {
    pub message: String,
}

#[derive(Debug, Error)]
enum FrameError {
    #[error("{0}")]
    Body(String),
    #[error("image is not a data URL (missing ',' after the header)")]
    MissingHeader,
    #[error("invalid base64 image data: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

async fn analyze_frame(
    state: &AppState,
    payload: Result<Json<ImageData>, JsonRejection>,
) -> Result<String, FrameError> {
    let Json(payload) = payload.map_err(|e| FrameError::Body(e.body_text()))?;
    let (_, encoded) = payload
        .image
        .split_once(',')
        .ok_or(FrameError::MissingHeader)?;
    let image = STANDARD.decode(encoded.trim())?;

    let media = Media::new("image/jpeg", image);
    Ok(state.oracle.generate(FRAME_PROMPT, Some(&media)).await?)
}

/// POST /video_feed
pub async fn video_feed(
    State(state): State<AppState>,
    payload: Result<Json<ImageData>, JsonRejection>,
) -> Json<FrameMessage> {
    let message = match analyze_frame(&state, payload).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Frame analysis failed: {}", e);
            format!("Error processing image or Gemini API call: {}", e)
        }
    };
    Json(FrameMessage { message })
}

pub fn coaching_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze_sequence", post(analyze_sequence))
        .route("/video_feed", post(video_feed))
}
