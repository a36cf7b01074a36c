//! Analysis modules.
//!
//! Text heuristics over model replies, plus the progressive session
//! pipeline built on top of them.

pub mod consolidation;
pub mod drills;
pub mod parser;
pub mod progressive;
pub mod signals;

pub use consolidation::ConsolidationEngine;
pub use parser::{HeuristicParser, ResponseParser};
pub use progressive::ProgressiveAnalysisEngine;
