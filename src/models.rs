//! Data models for the dribbling coach.
//!
//! This module contains the core data structures shared by the analysis
//! pipeline, the session store and the HTTP layer. Everything serializes
//! with camelCase field names, which is the wire format the web client
//! expects.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default skill level assigned to a new session.
pub const DEFAULT_SKILL_LEVEL: &str = "intermediate";

/// Coarse skill category detected in free-text feedback.
///
/// Declaration order is the order in which areas are reported by the
/// signal extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyArea {
    #[serde(rename = "Ball Control")]
    BallControl,
    #[serde(rename = "Rhythm & Timing")]
    RhythmTiming,
    #[serde(rename = "Body Position")]
    BodyPosition,
    #[serde(rename = "Dribble Height")]
    DribbleHeight,
    #[serde(rename = "Hand Technique")]
    HandTechnique,
    #[serde(rename = "Court Awareness")]
    CourtAwareness,
}

impl KeyArea {
    /// Human-readable label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            KeyArea::BallControl => "Ball Control",
            KeyArea::RhythmTiming => "Rhythm & Timing",
            KeyArea::BodyPosition => "Body Position",
            KeyArea::DribbleHeight => "Dribble Height",
            KeyArea::HandTechnique => "Hand Technique",
            KeyArea::CourtAwareness => "Court Awareness",
        }
    }
}

impl fmt::Display for KeyArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Structured coaching result returned to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingResponse {
    /// Free-text assessment.
    pub feedback: String,
    /// Primary technique to work on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    /// Up to three actionable tips.
    #[serde(default)]
    pub tips: Vec<String>,
    /// Suggested drill name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drill_suggestion: Option<String>,
}

/// Feedback recorded for a single clip of a progressive session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveFeedback {
    /// 1-based position of the clip within its session.
    pub clip_number: usize,
    /// Raw oracle reply.
    pub feedback: String,
    pub key_areas: Vec<KeyArea>,
    pub tips: Vec<String>,
    /// RFC 3339 timestamp of when the clip was analyzed.
    pub timestamp: String,
}

/// Accumulated state of one progressive analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub session_id: String,
    pub feedback_list: Vec<ProgressiveFeedback>,
    /// Union of every clip's key areas, in first-seen order.
    pub key_themes: Vec<KeyArea>,
    pub saturated: bool,
    pub consolidated_feedback: Option<CoachingResponse>,
    pub skill_level: String,
}

impl AnalysisSession {
    /// Creates an empty session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            feedback_list: Vec::new(),
            key_themes: Vec::new(),
            saturated: false,
            consolidated_feedback: None,
            skill_level: DEFAULT_SKILL_LEVEL.to_string(),
        }
    }

    /// Number of clips analyzed so far.
    pub fn clip_count(&self) -> usize {
        self.feedback_list.len()
    }

    /// Appends a clip's feedback and folds its key areas into the themes.
    pub fn record(&mut self, entry: ProgressiveFeedback) {
        for area in &entry.key_areas {
            if !self.key_themes.contains(area) {
                self.key_themes.push(*area);
            }
        }
        self.feedback_list.push(entry);
    }

    /// Marks the session saturated with its consolidated result.
    ///
    /// Both fields change together so `consolidated_feedback` is set
    /// exactly when `saturated` is.
    pub fn saturate(&mut self, consolidated: CoachingResponse) {
        self.consolidated_feedback = Some(consolidated);
        self.saturated = true;
    }
}

/// Media payload forwarded to the oracle.
#[derive(Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    /// Shared buffer; clones do not copy the payload.
    pub data: Bytes,
}

impl Media {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Result of submitting one clip to a progressive session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipAnalysis {
    pub clip_number: usize,
    pub feedback: String,
    pub saturated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidated_feedback: Option<CoachingResponse>,
    pub feedback_list: Vec<ProgressiveFeedback>,
    pub key_themes: Vec<KeyArea>,
    /// "n/threshold" while the session is still collecting clips.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<String>,
}
