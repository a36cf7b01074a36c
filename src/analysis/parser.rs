//! Turns a free-text model reply into a structured coaching response.
//!
//! The model is asked for `Tips:`, `Technique:` and `Drill:` sections but
//! rarely follows the format exactly, so this is a best-effort section
//! scanner. Callers go through [`ResponseParser`] so a stricter parser for
//! structured model output can replace it later.

use crate::analysis::drills::{infer_drill, GENERAL_DRILL};
use crate::analysis::signals::{strip_bullet, MAX_TIPS};
use crate::models::CoachingResponse;
use thiserror::Error;
use tracing::{debug, warn};

/// Tip returned when a reply could not be parsed at all.
pub const FALLBACK_TIP: &str = "Keep practicing with focus on ball control";

/// Parses model replies into coaching responses. Never fails.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, response_text: &str, drill_type: &str) -> CoachingResponse;
}

/// Internal parse failure, always converted to the fallback response.
#[derive(Debug, Error)]
enum ParseError {
    #[error("response text is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Feedback,
    Tips,
    Technique,
    Drill,
}

/// Keyword and section-header heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicParser;

impl ResponseParser for HeuristicParser {
    fn parse(&self, response_text: &str, drill_type: &str) -> CoachingResponse {
        parse(response_text, drill_type)
    }
}

/// Parse a reply with the heuristic parser.
pub fn parse(response_text: &str, drill_type: &str) -> CoachingResponse {
    match try_parse(response_text, drill_type) {
        Ok(response) => response,
        Err(e) => {
            warn!("Falling back to raw feedback: {}", e);
            CoachingResponse {
                feedback: response_text.to_string(),
                technique: None,
                tips: vec![FALLBACK_TIP.to_string()],
                drill_suggestion: None,
            }
        }
    }
}

/// Text after the first colon, or the whole line when there is none.
fn header_value(line: &str) -> Option<String> {
    let value = match line.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => line,
    };
    (!value.is_empty()).then(|| value.to_string())
}

fn try_parse(response_text: &str, drill_type: &str) -> Result<CoachingResponse, ParseError> {
    if response_text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut section = Section::Feedback;
    let mut feedback_lines: Vec<&str> = Vec::new();
    let mut tips: Vec<String> = Vec::new();
    let mut technique = None;
    let mut drill_suggestion = None;

    for line in response_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();

        if lower.contains("tips:") || lower.contains("suggestions:") {
            section = Section::Tips;
        } else if lower.contains("technique:") {
            section = Section::Technique;
            technique = header_value(line);
        } else if lower.contains("drill:") || lower.contains("recommend:") {
            section = Section::Drill;
            drill_suggestion = header_value(line);
        } else {
            match section {
                Section::Feedback => feedback_lines.push(line),
                Section::Tips => {
                    let tip = strip_bullet(line);
                    if !tip.is_empty() {
                        tips.push(tip.to_string());
                    }
                }
                Section::Technique | Section::Drill => {}
            }
        }
    }

    let feedback = if feedback_lines.is_empty() {
        response_text.to_string()
    } else {
        feedback_lines.join(" ")
    };

    if drill_suggestion.is_none() && drill_type == GENERAL_DRILL {
        drill_suggestion = Some(infer_drill(response_text).to_string());
    }

    tips.truncate(MAX_TIPS);
    debug!(
        tips = tips.len(),
        has_technique = technique.is_some(),
        "Parsed coaching response"
    );

    Ok(CoachingResponse {
        feedback,
        technique,
        tips,
        drill_suggestion,
    })
}
