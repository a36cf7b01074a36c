//! Drill reference data and keyword-based drill inference.
//!
//! The keyword tables below are ordered: the first matching rule wins.

use serde::Serialize;

/// Drill suggested when nothing more specific matches.
pub const BASELINE_DRILL: &str = "Basic Stationary Dribble";

/// Drill type that enables keyword inference in the parser.
pub const GENERAL_DRILL: &str = "general";

/// Technique mentions, checked before any skill-level keyword.
const TECHNIQUE_RULES: &[(&str, &str)] = &[
    ("crossover", "Crossover Practice"),
    ("between-the-legs", "Between the Legs Drill"),
    ("behind-the-back", "Behind the Back Drill"),
    ("figure-8", "Figure 8 Drill"),
    ("hesitation", "Hesitation Dribble"),
    ("in-and-out", "In and Out Dribble"),
];

const BEGINNER_WORDS: &[&str] = &["basic", "fundamental", "beginner", "start"];
const CONTROL_WORDS: &[&str] = &["control", "fingertip"];
const POWER_WORDS: &[&str] = &["power", "strength"];
const ADVANCED_WORDS: &[&str] = &["advanced", "complex", "combination"];
const HEIGHT_WORDS: &[&str] = &["height", "high", "low"];

fn mentions_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// Infer a drill name from the model's reply.
pub fn infer_drill(text: &str) -> &'static str {
    let lower = text.to_lowercase();

    if let Some((_, drill)) = TECHNIQUE_RULES.iter().find(|(kw, _)| lower.contains(kw)) {
        return drill;
    }

    if mentions_any(&lower, BEGINNER_WORDS) {
        if mentions_any(&lower, CONTROL_WORDS) {
            return "Fingertip Control Drill";
        }
        if mentions_any(&lower, POWER_WORDS) {
            return "Power Dribble Drill";
        }
        return BASELINE_DRILL;
    }
    if mentions_any(&lower, ADVANCED_WORDS) {
        return "Combination Moves Drill";
    }
    if mentions_any(&lower, HEIGHT_WORDS) {
        return "Dribble Height Control";
    }
    if lower.contains("quick") && lower.contains("hands") {
        return "Quick Hands Drill";
    }

    BASELINE_DRILL
}

/// Catalog entry for a drill the coach can analyze.
#[derive(Debug, Clone, Serialize)]
pub struct Drill {
    pub slug: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub difficulty: &'static str,
    pub description: &'static str,
    /// Prompt sent to the model alongside footage of this drill.
    pub prompt: &'static str,
}

/// Prompt used for `general` and unknown drills.
pub const GENERAL_PROMPT: &str = "Analyze this basketball dribbling video. Provide feedback on \
the player's form, then a 'Tips:' section with up to three specific tips, a 'Technique:' line \
naming the primary technique to work on, and a 'Drill:' line recommending one drill.";

pub const CATEGORIES: &[&str] = &["fundamentals", "ball_handling", "advanced"];

pub const DRILLS: &[Drill] = &[
    Drill {
        slug: "stationary",
        name: BASELINE_DRILL,
        category: "fundamentals",
        difficulty: "beginner",
        description: "Pound the ball at waist height while standing in an athletic stance.",
        prompt: "Analyze this stationary dribbling video. Focus on stance, ball height, \
fingertip control and whether the player keeps their eyes up. Provide feedback, a 'Tips:' \
section with up to three tips, and a 'Technique:' line.",
    },
    Drill {
        slug: "fingertip",
        name: "Fingertip Control Drill",
        category: "fundamentals",
        difficulty: "beginner",
        description: "Dribble using only the fingertips, keeping the palm off the ball.",
        prompt: "Analyze this fingertip control drill. Check whether the palm touches the ball, \
wrist snap and rhythm. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "power",
        name: "Power Dribble Drill",
        category: "fundamentals",
        difficulty: "beginner",
        description: "Hard, fast dribbles that build hand strength.",
        prompt: "Analyze this power dribble drill. Evaluate force, consistency of bounce and \
body position. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "height",
        name: "Dribble Height Control",
        category: "fundamentals",
        difficulty: "intermediate",
        description: "Alternate low, medium and high dribbles on command.",
        prompt: "Analyze this dribble height drill. Judge how well the player controls low and \
high bounces and transitions between them. Provide feedback, a 'Tips:' section, and a \
'Technique:' line.",
    },
    Drill {
        slug: "crossover",
        name: "Crossover Practice",
        category: "ball_handling",
        difficulty: "intermediate",
        description: "Quick low crossovers in front of the body.",
        prompt: "Analyze this crossover drill. Evaluate how low and quick the ball crosses, \
shoulder movement and protection of the ball. Provide feedback, a 'Tips:' section, and a \
'Technique:' line.",
    },
    Drill {
        slug: "between-the-legs",
        name: "Between the Legs Drill",
        category: "ball_handling",
        difficulty: "intermediate",
        description: "Pass the ball between the legs with a staggered stance.",
        prompt: "Analyze this between-the-legs drill. Check stance width, ball path and \
hand exchange timing. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "behind-the-back",
        name: "Behind the Back Drill",
        category: "ball_handling",
        difficulty: "intermediate",
        description: "Wrap the ball behind the back without breaking stride.",
        prompt: "Analyze this behind-the-back drill. Evaluate wrap-around control, hip \
rotation and head position. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "quick-hands",
        name: "Quick Hands Drill",
        category: "ball_handling",
        difficulty: "intermediate",
        description: "Rapid low taps alternating hands.",
        prompt: "Analyze this quick hands drill. Judge hand speed, ball height and rhythm. \
Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "figure-8",
        name: "Figure 8 Drill",
        category: "advanced",
        difficulty: "advanced",
        description: "Dribble in a figure eight pattern through and around the legs.",
        prompt: "Analyze this figure-8 drill. Evaluate flow, ball control around each leg and \
posture. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "hesitation",
        name: "Hesitation Dribble",
        category: "advanced",
        difficulty: "advanced",
        description: "Change of pace move that freezes the defender.",
        prompt: "Analyze this hesitation dribble. Judge the change of pace, head fake and \
explosiveness out of the move. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "in-and-out",
        name: "In and Out Dribble",
        category: "advanced",
        difficulty: "advanced",
        description: "Fake crossover with a single hand.",
        prompt: "Analyze this in-and-out dribble. Evaluate wrist action, shoulder fake and \
ball protection. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
    Drill {
        slug: "combination",
        name: "Combination Moves Drill",
        category: "advanced",
        difficulty: "advanced",
        description: "Chain several moves together at game speed.",
        prompt: "Analyze this combination moves drill. Evaluate transitions between moves, \
rhythm and court awareness. Provide feedback, a 'Tips:' section, and a 'Technique:' line.",
    },
];

/// Look up a drill by slug or display name, case-insensitively.
pub fn find_drill(name: &str) -> Option<&'static Drill> {
    DRILLS
        .iter()
        .find(|d| d.slug.eq_ignore_ascii_case(name) || d.name.eq_ignore_ascii_case(name))
}

/// All drills in a category. Unknown categories yield an empty list.
pub fn drills_in_category(category: &str) -> Vec<&'static Drill> {
    DRILLS
        .iter()
        .filter(|d| d.category.eq_ignore_ascii_case(category))
        .collect()
}

/// Prompt for analyzing footage of the named drill.
pub fn prompt_for(drill: &str) -> &'static str {
    find_drill(drill).map(|d| d.prompt).unwrap_or(GENERAL_PROMPT)
}
