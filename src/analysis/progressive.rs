//! Progressive multi-clip analysis.
//!
//! Each clip is analyzed on its own and folded into the session. Once a
//! session holds `saturation_threshold` clips it is consolidated and
//! frozen; later clips get the consolidated result back without another
//! model call.

use crate::analysis::consolidation::ConsolidationEngine;
use crate::analysis::signals::{extract_key_areas, extract_tips};
use crate::error::OracleError;
use crate::models::{AnalysisSession, ClipAnalysis, Media, ProgressiveFeedback};
use crate::oracle::Oracle;
use crate::session::{SessionHandle, SessionStore};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

/// Coaching prompt for one clip of a session.
pub fn clip_prompt(clip_number: usize) -> String {
    format!(
        "This is clip #{} of a basketball dribbling training session. Analyze the player's \
         dribbling form in this clip and give concise coaching feedback on ball control, \
         rhythm, body position, dribble height, hand technique and court awareness. \
         End with a few specific things to try or focus on in the next clip.",
        clip_number
    )
}

/// Orchestrates per-clip analysis, saturation and consolidation.
pub struct ProgressiveAnalysisEngine {
    oracle: Arc<dyn Oracle>,
    sessions: Arc<dyn SessionStore>,
    consolidator: ConsolidationEngine,
    saturation_threshold: usize,
}

impl ProgressiveAnalysisEngine {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        sessions: Arc<dyn SessionStore>,
        consolidator: ConsolidationEngine,
        saturation_threshold: usize,
    ) -> Self {
        Self {
            oracle,
            sessions,
            consolidator,
            saturation_threshold,
        }
    }

    /// Analyze one clip for `session_id`.
    ///
    /// On oracle failure the session is left exactly as it was.
    pub async fn submit_clip(
        &self,
        session_id: &str,
        clip: &Media,
    ) -> Result<ClipAnalysis, OracleError> {
        let (slot, _writer) = self.acquire(session_id).await;
        let session = slot.snapshot().await;

        if session.saturated {
            debug!(
                "Session {} already saturated, returning consolidated feedback",
                session_id
            );
            return Ok(self.saturated_result(session));
        }

        let clip_number = session.clip_count() + 1;
        info!(
            "Analyzing clip {} for session {} ({} bytes)",
            clip_number,
            session_id,
            clip.len()
        );

        let feedback = self
            .oracle
            .generate(&clip_prompt(clip_number), Some(clip))
            .await
            .map_err(|e| {
                warn!(
                    "Clip {} for session {} failed: {}",
                    clip_number, session_id, e
                );
                e
            })?;

        let entry = ProgressiveFeedback {
            clip_number,
            key_areas: extract_key_areas(&feedback),
            tips: extract_tips(&feedback),
            feedback: feedback.clone(),
            timestamp: Utc::now().to_rfc3339(),
        };

        let session = slot
            .update(|s| {
                s.record(entry);
                s.clone()
            })
            .await;

        if session.clip_count() < self.saturation_threshold {
            return Ok(ClipAnalysis {
                clip_number,
                feedback,
                saturated: false,
                consolidated_feedback: None,
                progress: Some(format!(
                    "{}/{}",
                    session.clip_count(),
                    self.saturation_threshold
                )),
                feedback_list: session.feedback_list,
                key_themes: session.key_themes,
            });
        }

        let consolidated = self.consolidator.consolidate(&session).await;
        let session = slot
            .update(|s| {
                s.saturate(consolidated);
                s.clone()
            })
            .await;
        info!(
            "Session {} saturated after {} clips",
            session_id,
            session.clip_count()
        );

        Ok(ClipAnalysis {
            clip_number,
            feedback,
            saturated: true,
            consolidated_feedback: session.consolidated_feedback,
            progress: None,
            feedback_list: session.feedback_list,
            key_themes: session.key_themes,
        })
    }

    /// Slot for `session_id` with its writer gate held.
    ///
    /// A slot deleted while we waited on its gate is detached from the
    /// store, so start over with whatever the store maps the id to now.
    async fn acquire(&self, session_id: &str) -> (SessionHandle, OwnedMutexGuard<()>) {
        loop {
            let slot = self.sessions.get_or_create(session_id).await;
            let writer = slot.lock_writer().await;
            match self.sessions.get(session_id).await {
                Ok(current) if Arc::ptr_eq(&current, &slot) => return (slot, writer),
                _ => debug!(
                    "Session {} was deleted while waiting, reacquiring",
                    session_id
                ),
            }
        }
    }

    fn saturated_result(&self, session: AnalysisSession) -> ClipAnalysis {
        let consolidated = session.consolidated_feedback;
        ClipAnalysis {
            clip_number: session.feedback_list.len(),
            feedback: consolidated
                .as_ref()
                .map(|c| c.feedback.clone())
                .unwrap_or_default(),
            saturated: true,
            consolidated_feedback: consolidated,
            progress: None,
            feedback_list: session.feedback_list,
            key_themes: session.key_themes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::HeuristicParser;
    use crate::config::SATURATION_THRESHOLD;
    use crate::models::KeyArea;
    use crate::oracle::testing::ScriptedOracle;
    use crate::session::InMemorySessionStore;
    use std::time::Duration;

    const CLIP_REPLY: &str = "Good rhythm but your fingertip control slips.\n\
                              - Try keeping the ball below your waist\n\
                              - Focus on your off hand";

    fn engine_with(
        oracle: Arc<ScriptedOracle>,
    ) -> (ProgressiveAnalysisEngine, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::default());
        let consolidator = ConsolidationEngine::new(oracle.clone(), Arc::new(HeuristicParser));
        let engine =
            ProgressiveAnalysisEngine::new(oracle, store.clone(), consolidator, SATURATION_THRESHOLD);
        (engine, store)
    }

    fn clip() -> Media {
        Media::new("video/mp4", vec![0u8; 8])
    }

    #[tokio::test]
    async fn test_first_clip_reports_progress() {
        let oracle = Arc::new(ScriptedOracle::answering(CLIP_REPLY));
        let (engine, _) = engine_with(oracle.clone());

        let result = engine.submit_clip("s1", &clip()).await.unwrap();

        assert_eq!(result.clip_number, 1);
        assert!(!result.saturated);
        assert_eq!(result.progress.as_deref(), Some("1/5"));
        assert!(result.consolidated_feedback.is_none());
        assert_eq!(
            result.key_themes,
            vec![
                KeyArea::BallControl,
                KeyArea::RhythmTiming,
                KeyArea::HandTechnique
            ]
        );
        assert_eq!(result.feedback_list[0].tips.len(), 2);

        let prompts = oracle.prompts();
        assert!(prompts[0].0.contains("clip #1"));
        assert!(prompts[0].1, "clip must be attached");
    }

    #[tokio::test]
    async fn test_saturates_on_fifth_clip_only() {
        let oracle = Arc::new(ScriptedOracle::answering(CLIP_REPLY));
        let (engine, store) = engine_with(oracle.clone());

        for expected in 1..SATURATION_THRESHOLD {
            let result = engine.submit_clip("s1", &clip()).await.unwrap();
            assert_eq!(result.clip_number, expected);
            assert!(!result.saturated);
        }

        let fifth = engine.submit_clip("s1", &clip()).await.unwrap();
        assert_eq!(fifth.clip_number, 5);
        assert!(fifth.saturated);
        assert!(fifth.progress.is_none());
        let consolidated = fifth.consolidated_feedback.clone().unwrap();
        // Five clip calls plus one consolidation call
        assert_eq!(oracle.calls(), 6);

        let sixth = engine.submit_clip("s1", &clip()).await.unwrap();
        assert_eq!(sixth.clip_number, 5);
        assert!(sixth.saturated);
        assert_eq!(sixth.consolidated_feedback, Some(consolidated));
        assert_eq!(sixth.feedback_list.len(), 5);
        assert_eq!(oracle.calls(), 6, "saturated sessions must not call the model");

        let session = store.get("s1").await.unwrap().snapshot().await;
        assert!(session.saturated);
        assert!(session.consolidated_feedback.is_some());
        let numbers: Vec<usize> = session.feedback_list.iter().map(|f| f.clip_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_oracle_failure_leaves_session_untouched() {
        let oracle = Arc::new(
            ScriptedOracle::answering(CLIP_REPLY)
                .then(Ok(CLIP_REPLY.to_string()))
                .then(Err(OracleError::Timeout(60))),
        );
        let (engine, store) = engine_with(oracle);

        engine.submit_clip("s1", &clip()).await.unwrap();
        let err = engine.submit_clip("s1", &clip()).await.unwrap_err();
        assert!(matches!(err, OracleError::Timeout(60)));

        let session = store.get("s1").await.unwrap().snapshot().await;
        assert_eq!(session.clip_count(), 1);

        // The retry gets the clip number the failed clip would have had
        let retry = engine.submit_clip("s1", &clip()).await.unwrap();
        assert_eq!(retry.clip_number, 2);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let oracle = Arc::new(ScriptedOracle::answering(CLIP_REPLY));
        let (engine, _) = engine_with(oracle);

        engine.submit_clip("a", &clip()).await.unwrap();
        engine.submit_clip("a", &clip()).await.unwrap();
        let b = engine.submit_clip("b", &clip()).await.unwrap();
        assert_eq!(b.clip_number, 1);
        assert_eq!(b.progress.as_deref(), Some("1/5"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_clips_get_distinct_numbers() {
        let oracle = Arc::new(
            ScriptedOracle::answering(CLIP_REPLY).with_delay(Duration::from_millis(50)),
        );
        let (engine, store) = engine_with(oracle);
        let engine = Arc::new(engine);

        let first = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.submit_clip("race", &clip()).await })
        };
        let second = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.submit_clip("race", &clip()).await })
        };

        let (first, second) = futures::future::join(first, second).await;
        let mut numbers = vec![
            first.unwrap().unwrap().clip_number,
            second.unwrap().unwrap().clip_number,
        ];
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2]);

        let session = store.get("race").await.unwrap().snapshot().await;
        let recorded: Vec<usize> = session.feedback_list.iter().map(|f| f.clip_number).collect();
        assert_eq!(recorded, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_clip_waiting_on_deleted_session_starts_fresh() {
        let oracle = Arc::new(
            ScriptedOracle::answering(CLIP_REPLY).with_delay(Duration::from_millis(100)),
        );
        let (engine, store) = engine_with(oracle);

        let first_clip = clip();
        let first = engine.submit_clip("s1", &first_clip);
        let second = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            engine.submit_clip("s1", &clip()).await
        };
        let delete = async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            store.delete("s1").await
        };

        let (first, second, deleted) = tokio::join!(first, second, delete);
        assert!(deleted);
        assert_eq!(first.unwrap().clip_number, 1);

        let second = second.unwrap();
        assert_eq!(second.clip_number, 1);
        assert_eq!(second.feedback_list.len(), 1);

        let session = store.get("s1").await.unwrap().snapshot().await;
        assert_eq!(session.clip_count(), 1);
    }

    #[tokio::test]
    async fn test_consolidation_failure_still_saturates() {
        let mut oracle = ScriptedOracle::default();
        for _ in 0..SATURATION_THRESHOLD {
            oracle = oracle.then(Ok(CLIP_REPLY.to_string()));
        }
        // Default reply is unset, so the consolidation call fails
        let (engine, _) = engine_with(Arc::new(oracle));

        let mut last = None;
        for _ in 0..SATURATION_THRESHOLD {
            last = Some(engine.submit_clip("s1", &clip()).await.unwrap());
        }
        let last = last.unwrap();
        assert!(last.saturated);
        let consolidated = last.consolidated_feedback.unwrap();
        assert!(consolidated.feedback.starts_with("Based on 5 clips, focus on Ball Control"));
    }
}
