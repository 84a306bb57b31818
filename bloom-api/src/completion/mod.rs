//! Language-model completion service
//!
//! The pipeline only sees the [`CompletionService`] trait. The production
//! implementation is [`OpenAiClient`]; tests inject scripted services.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// One completion call: a single user message plus sampling limits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// Generated text, possibly wrapped in prose around the JSON payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub text: String,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network or protocol failure talking to the service
    #[error("Completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("Completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Service answered without any generated text
    #[error("Completion service returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError>;
}

/// Span from the first `{` to the last `}` of `text`
///
/// Models often add commentary around the requested JSON; this keeps only the
/// outermost object candidate.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted reply for one call
    pub enum Reply {
        Text(String),
        Fail,
        /// Reply after a delay, to scramble completion order
        Delayed(Duration, String),
    }

    /// Replies keyed by a marker found in the prompt, falling back to a FIFO queue
    pub struct ScriptedCompletion {
        keyed: Vec<(String, Mutex<Option<Reply>>)>,
        queue: Mutex<VecDeque<Reply>>,
        pub calls: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        pub fn new() -> Self {
            Self {
                keyed: Vec::new(),
                queue: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn on(mut self, marker: &str, reply: Reply) -> Self {
            self.keyed.push((marker.to_string(), Mutex::new(Some(reply))));
            self
        }

        pub fn then(self, reply: Reply) -> Self {
            self.queue.lock().unwrap().push_back(reply);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
            let reply = self
                .keyed
                .iter()
                .find(|(marker, _)| request.prompt.contains(marker.as_str()))
                .and_then(|(_, slot)| slot.lock().unwrap().take())
                .or_else(|| self.queue.lock().unwrap().pop_front());
            self.calls.lock().unwrap().push(request);

            match reply {
                Some(Reply::Text(text)) => Ok(CompletionResponse { text }),
                Some(Reply::Delayed(delay, text)) => {
                    tokio::time::sleep(delay).await;
                    Ok(CompletionResponse { text })
                }
                Some(Reply::Fail) | None => Err(CompletionError::Status {
                    status: 503,
                    body: "scripted failure".to_string(),
                }),
            }
        }
    }
}
