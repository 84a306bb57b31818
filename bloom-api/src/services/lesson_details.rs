//! Learning objectives and core concepts for a single lesson

use crate::completion::{extract_json_object, CompletionError, CompletionRequest, CompletionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const MAX_OUTPUT_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.2;

/// Comma-separated objectives and concepts; empty when the model reply was unusable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetails {
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub core_concepts: String,
}

pub struct LessonDetailsService {
    service: Arc<dyn CompletionService>,
    model: String,
}

impl LessonDetailsService {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    /// Ask for objectives and core concepts of `lesson_name`
    ///
    /// Transport failures propagate; an unparseable reply degrades to empty strings.
    pub async fn describe(&self, lesson_name: &str) -> Result<LessonDetails, CompletionError> {
        let response = self
            .service
            .complete(CompletionRequest {
                model: self.model.clone(),
                prompt: build_prompt(lesson_name),
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            })
            .await?;

        Ok(parse_lesson_details(&response.text))
    }
}

fn build_prompt(lesson_name: &str) -> String {
    format!(
        r#"For the lesson titled "{}", provide:
1. 3-5 concise learning objectives (as a single string, comma-separated)
2. 3-5 core concepts (as a single string, comma-separated)
Format your response as JSON:
{{
  "objectives": "...",
  "coreConcepts": "..."
}}"#,
        lesson_name
    )
}

pub fn parse_lesson_details(text: &str) -> LessonDetails {
    extract_json_object(text)
        .and_then(|json| match serde_json::from_str::<LessonDetails>(json) {
            Ok(details) => Some(details),
            Err(e) => {
                debug!("Discarding unparseable lesson details: {}", e);
                None
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::testing::{Reply, ScriptedCompletion};

    #[test]
    fn test_parse_reads_camel_case_fields() {
        let details = parse_lesson_details(
            "```json\n{\"objectives\": \"define, apply\", \"coreConcepts\": \"limits\"}\n```",
        );
        assert_eq!(details.objectives, "define, apply");
        assert_eq!(details.core_concepts, "limits");
    }

    #[test]
    fn test_unusable_reply_degrades_to_empty() {
        assert_eq!(parse_lesson_details("no idea"), LessonDetails::default());
        assert_eq!(parse_lesson_details("{\"objectives\": 3}"), LessonDetails::default());

        let partial = parse_lesson_details("{\"objectives\": \"only this\"}");
        assert_eq!(partial.objectives, "only this");
        assert!(partial.core_concepts.is_empty());
    }

    #[tokio::test]
    async fn test_describe_uses_short_low_temperature_call() {
        let scripted = Arc::new(
            ScriptedCompletion::new().then(Reply::Text("{\"objectives\":\"o\",\"coreConcepts\":\"c\"}".into())),
        );
        let service = LessonDetailsService::new(scripted.clone(), "gpt-4");

        let details = service.describe("Integration by parts").await.unwrap();

        assert_eq!(details.core_concepts, "c");
        let calls = scripted.calls.lock().unwrap();
        assert_eq!(calls[0].max_output_tokens, 300);
        assert!(calls[0].prompt.contains("\"Integration by parts\""));
    }
}
