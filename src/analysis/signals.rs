//! Keyword signals in free-text coaching feedback.
//!
//! Both extractors are case-insensitive substring matches over fixed
//! keyword tables.

use crate::models::KeyArea;

/// Trigger words per key area, matched case-insensitively as substrings.
pub const KEY_AREA_TRIGGERS: &[(KeyArea, &[&str])] = &[
    (KeyArea::BallControl, &["control", "grip"]),
    (KeyArea::RhythmTiming, &["rhythm", "timing", "consistency"]),
    (KeyArea::BodyPosition, &["posture", "stance", "position"]),
    (KeyArea::DribbleHeight, &["height", "bounce"]),
    (KeyArea::HandTechnique, &["hand", "finger"]),
    (KeyArea::CourtAwareness, &["head", "eyes", "awareness"]),
];

/// Line markers that flag a line as a tip.
const TIP_STARTERS: &[&str] = &["tip:", "try", "focus on", "practice", "work on", "remember"];

/// Words that make a sentence a tip when no line qualified.
const TIP_SENTENCE_WORDS: &[&str] = &["should", "try", "focus", "keep", "maintain", "improve"];

/// Leading characters stripped from list items.
pub const BULLET_CHARS: &str = "\u{2022}-*123456789. ";

/// Maximum number of tips returned.
pub const MAX_TIPS: usize = 3;

const MIN_LINE_TIP_LEN: usize = 10;
const MIN_SENTENCE_TIP_LEN: usize = 15;

/// Extract key skill areas mentioned in the text, in category order.
pub fn extract_key_areas(text: &str) -> Vec<KeyArea> {
    let lower = text.to_lowercase();

    KEY_AREA_TRIGGERS
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| lower.contains(t)))
        .map(|(area, _)| *area)
        .collect()
}

/// Strip bullets and numbering from the start of a list item.
pub fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(|c| BULLET_CHARS.contains(c)).trim()
}

/// Extract up to three actionable tips from the text.
///
/// Lines containing a tip marker win; sentences with advice words are the
/// fallback when no line qualifies.
pub fn extract_tips(text: &str) -> Vec<String> {
    let mut tips: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            TIP_STARTERS.iter().any(|s| lower.contains(s))
        })
        .map(strip_bullet)
        .filter(|tip| tip.chars().count() > MIN_LINE_TIP_LEN)
        .map(String::from)
        .collect();

    if tips.is_empty() {
        tips = text
            .split('.')
            .filter(|sentence| {
                let lower = sentence.to_lowercase();
                TIP_SENTENCE_WORDS.iter().any(|w| lower.contains(w))
            })
            .map(str::trim)
            .filter(|sentence| sentence.chars().count() > MIN_SENTENCE_TIP_LEN)
            .map(String::from)
            .collect();
    }

    tips.truncate(MAX_TIPS);
    tips
}
