//! Generative model boundary.
//!
//! The rest of the service sees the model as an opaque text oracle: a
//! prompt plus optional media goes in, free text comes out.

pub mod gemini;

use crate::error::OracleError;
use crate::models::Media;
use async_trait::async_trait;

pub use gemini::{GeminiClient, GeminiConfig};

/// Text completion over an optional image or video attachment.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate a reply to `prompt`, optionally grounded on `media`.
    async fn generate(&self, prompt: &str, media: Option<&Media>) -> Result<String, OracleError>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted oracle for unit tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays queued replies, then repeats a default reply.
    #[derive(Default)]
    pub struct ScriptedOracle {
        replies: Mutex<VecDeque<Result<String, OracleError>>>,
        default_reply: Option<String>,
        prompts: Mutex<Vec<(String, bool)>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedOracle {
        /// Always answers with `reply`.
        pub fn answering(reply: &str) -> Self {
            Self {
                default_reply: Some(reply.to_string()),
                ..Default::default()
            }
        }

        /// Queue a reply ahead of the default.
        pub fn then(self, reply: Result<String, OracleError>) -> Self {
            self.replies.lock().unwrap().push_back(reply);
            self
        }

        /// Sleep before every reply.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Prompts received, with whether media was attached.
        pub fn prompts(&self) -> Vec<(String, bool)> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn generate(
            &self,
            prompt: &str,
            media: Option<&Media>,
        ) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), media.is_some()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let queued = self.replies.lock().unwrap().pop_front();
            match queued {
                Some(reply) => reply,
                None => self
                    .default_reply
                    .clone()
                    .ok_or(OracleError::EmptyResponse),
            }
        }
    }
}
