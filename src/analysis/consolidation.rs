//! Merging a saturated session into one coaching response.
//!
//! All clip feedback is summarized by a second model call. When the model
//! is unavailable the result is assembled from the per-clip signals so a
//! saturated session always ends up with a consolidated response.

use crate::analysis::drills::BASELINE_DRILL;
use crate::analysis::parser::ResponseParser;
use crate::analysis::signals::MAX_TIPS;
use crate::models::{AnalysisSession, CoachingResponse, KeyArea};
use crate::oracle::Oracle;
use std::sync::Arc;
use tracing::{info, warn};

/// Drill type passed to the parser; disables keyword drill inference.
pub const CONSOLIDATION_DRILL_TYPE: &str = "consolidation";

/// Technique used by the fallback when no key area was ever detected.
pub const BASELINE_TECHNIQUE: &str = "Ball Control";

/// Signals gathered from every clip of a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionDigest {
    pub clip_count: usize,
    /// Every clip's feedback joined by single spaces.
    pub all_feedback: String,
    /// Union of key areas, first-seen order.
    pub key_areas: Vec<KeyArea>,
    /// Union of tips, first-seen order.
    pub tips: Vec<String>,
}

impl SessionDigest {
    pub fn from_session(session: &AnalysisSession) -> Self {
        let mut key_areas: Vec<KeyArea> = Vec::new();
        let mut tips: Vec<String> = Vec::new();

        for entry in &session.feedback_list {
            for area in &entry.key_areas {
                if !key_areas.contains(area) {
                    key_areas.push(*area);
                }
            }
            for tip in &entry.tips {
                if !tips.contains(tip) {
                    tips.push(tip.clone());
                }
            }
        }

        Self {
            clip_count: session.feedback_list.len(),
            all_feedback: session
                .feedback_list
                .iter()
                .map(|f| f.feedback.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            key_areas,
            tips,
        }
    }

    fn area_labels(&self, limit: usize) -> String {
        self.key_areas
            .iter()
            .take(limit)
            .map(KeyArea::label)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn first_tips(&self) -> Vec<String> {
        self.tips.iter().take(MAX_TIPS).cloned().collect()
    }

    /// Prompt asking the model to merge the accumulated feedback.
    pub fn prompt(&self) -> String {
        format!(
            "Based on {} basketball dribbling video clips, provide a comprehensive assessment.\n\n\
             Accumulated feedback: {}\n\n\
             Key areas identified: {}\n\n\
             Please consolidate this into:\n\
             1. A comprehensive assessment of a few sentences highlighting the main patterns\n\
             2. The top 3 most important areas to focus on, listed under 'Tips:'\n\
             3. A specific drill recommendation based on the identified needs, on a 'Drill:' line\n\
             4. The primary technique focus area, on a 'Technique:' line\n",
            self.clip_count,
            self.all_feedback,
            self.area_labels(usize::MAX),
        )
    }

    /// Deterministic result used when the model call fails.
    pub fn fallback(&self) -> CoachingResponse {
        CoachingResponse {
            feedback: format!(
                "Based on {} clips, focus on {}",
                self.clip_count,
                self.area_labels(3)
            ),
            technique: Some(
                self.key_areas
                    .first()
                    .map(|a| a.label())
                    .unwrap_or(BASELINE_TECHNIQUE)
                    .to_string(),
            ),
            tips: self.first_tips(),
            drill_suggestion: Some(BASELINE_DRILL.to_string()),
        }
    }
}

/// Produces the consolidated response for a saturated session.
pub struct ConsolidationEngine {
    oracle: Arc<dyn Oracle>,
    parser: Arc<dyn ResponseParser>,
}

impl ConsolidationEngine {
    pub fn new(oracle: Arc<dyn Oracle>, parser: Arc<dyn ResponseParser>) -> Self {
        Self { oracle, parser }
    }

    /// Consolidate every clip of `session`. Never fails.
    pub async fn consolidate(&self, session: &AnalysisSession) -> CoachingResponse {
        let digest = SessionDigest::from_session(session);
        info!(
            "Consolidating session {} ({} clips, {} key areas)",
            session.session_id,
            digest.clip_count,
            digest.key_areas.len()
        );

        let reply = match self.oracle.generate(&digest.prompt(), None).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    "Consolidation call failed for session {}, using fallback: {}",
                    session.session_id, e
                );
                return digest.fallback();
            }
        };

        let mut response = self.parser.parse(&reply, CONSOLIDATION_DRILL_TYPE);
        if response.tips.is_empty() {
            response.tips = digest.first_tips();
        }
        if response.technique.is_none() {
            response.technique = digest.key_areas.first().map(|a| a.label().to_string());
        }
        response
    }
}
