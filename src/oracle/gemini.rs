//! Gemini `generateContent` client.
//!
//! Small media is sent inline as base64. Anything at or above the inline
//! limit goes through the Files API: upload, then poll until the file is
//! `ACTIVE` before referencing it from the prompt.

use crate::config::{MediaConfig, ModelConfig};
use crate::error::OracleError;
use crate::models::Media;
use crate::oracle::Oracle;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Media whose base64 encoding reaches this size is uploaded instead
    /// of inlined.
    pub inline_limit_bytes: usize,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl GeminiConfig {
    pub fn from_config(model: &ModelConfig, media: &MediaConfig) -> Self {
        Self {
            api_base: model.api_base.trim_end_matches('/').to_string(),
            api_key: model.api_key.clone(),
            model_name: model.name.clone(),
            temperature: model.temperature,
            timeout_seconds: model.timeout_seconds,
            inline_limit_bytes: media.inline_limit_bytes,
            poll_interval: Duration::from_secs(media.poll_interval_seconds),
            poll_timeout: Duration::from_secs(media.poll_timeout_seconds),
        }
    }
}

/// `generateContent` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
            file_data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// `generateContent` response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Files API upload response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

/// Files API resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// Size of `raw_len` bytes once base64 encoded with padding.
fn encoded_len(raw_len: usize) -> usize {
    raw_len.div_ceil(3) * 4
}

/// Gemini REST client.
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, OracleError> {
        info!(
            "Initializing Gemini client with model {} at {}",
            config.model_name, config.api_base
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| OracleError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn api_key(&self) -> Result<&str, OracleError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(OracleError::MissingApiKey)
    }

    fn map_send_error(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.config.timeout_seconds)
        } else if e.is_connect() {
            OracleError::Transport(format!("Cannot connect to {}", self.config.api_base))
        } else {
            OracleError::Transport(format!("Failed to send request: {}", e))
        }
    }

    /// Turn a non-success status into an error, passing successes through.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OracleError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(OracleError::Quota(body))
        } else {
            Err(OracleError::Api {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Build the media part, uploading through the Files API when needed.
    async fn media_part(&self, media: &Media) -> Result<Part, OracleError> {
        if encoded_len(media.len()) < self.config.inline_limit_bytes {
            return Ok(Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: media.mime_type.clone(),
                    data: STANDARD.encode(&media.data),
                }),
                file_data: None,
            });
        }

        let uploaded = self.upload(media).await?;
        let file = tokio::time::timeout(self.config.poll_timeout, self.wait_until_active(uploaded))
            .await
            .map_err(|_| OracleError::Timeout(self.config.poll_timeout.as_secs()))??;

        Ok(Part {
            text: None,
            inline_data: None,
            file_data: Some(FileData {
                mime_type: file.mime_type.unwrap_or_else(|| media.mime_type.clone()),
                file_uri: file.uri,
            }),
        })
    }

    async fn upload(&self, media: &Media) -> Result<RemoteFile, OracleError> {
        let url = format!("{}/upload/v1beta/files", self.config.api_base);
        info!("Uploading {} bytes of {} media", media.len(), media.mime_type);

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, media.mime_type.as_str())
            .body(media.data.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let uploaded: UploadResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;

        debug!("Uploaded media as {}", uploaded.file.name);
        Ok(uploaded.file)
    }

    async fn wait_until_active(&self, mut file: RemoteFile) -> Result<RemoteFile, OracleError> {
        loop {
            match file.state.as_deref() {
                Some("ACTIVE") | None => return Ok(file),
                Some("FAILED") => {
                    return Err(OracleError::Processing(format!(
                        "{} failed processing",
                        file.name
                    )))
                }
                Some(state) => debug!("Media {} is {}, polling", file.name, state),
            }

            tokio::time::sleep(self.config.poll_interval).await;

            let url = format!("{}/v1beta/{}", self.config.api_base, file.name);
            let response = self
                .http_client
                .get(&url)
                .query(&[("key", self.api_key()?)])
                .send()
                .await
                .map_err(|e| self.map_send_error(e))?;

            file = Self::check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| OracleError::Decode(e.to_string()))?;
        }
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn generate(&self, prompt: &str, media: Option<&Media>) -> Result<String, OracleError> {
        let key = self.api_key()?;

        let mut parts = vec![Part::text(prompt)];
        if let Some(media) = media {
            parts.push(self.media_part(media).await?);
        }

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base, self.config.model_name
        );
        debug!("Sending prompt of {} chars", prompt.len());

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let reply: GenerateResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| OracleError::Decode(e.to_string()))?;

        let text = reply_text(reply);
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        debug!("Received reply of {} chars", text.len());
        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(reply: GenerateResponse) -> String {
    reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
