//! Subject learning roadmaps
//!
//! A roadmap is a list of milestones, each broken into tasks with suggested
//! resources.

use crate::completion::{extract_json_object, CompletionError, CompletionRequest, CompletionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

const MAX_OUTPUT_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapTask {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<RoadmapTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roadmap {
    pub title: String,
    pub description: String,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Invalid roadmap format: {0}")]
    InvalidFormat(String),
}

pub struct RoadmapService {
    service: Arc<dyn CompletionService>,
    model: String,
}

impl RoadmapService {
    pub fn new(service: Arc<dyn CompletionService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
        }
    }

    pub async fn generate(&self, subject: &str) -> Result<Roadmap, RoadmapError> {
        let response = self
            .service
            .complete(CompletionRequest {
                model: self.model.clone(),
                prompt: build_prompt(subject),
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            })
            .await?;

        parse_roadmap(&response.text)
    }
}

fn build_prompt(subject: &str) -> String {
    format!(
        r#"You are an expert curriculum designer. Create a detailed learning roadmap for {subject} that will help students master the subject. The roadmap should be in JSON format with the following structure:

{{
  "title": "Comprehensive {subject} Learning Roadmap",
  "description": "A detailed guide to mastering {subject}, covering fundamental concepts to advanced topics",
  "milestones": [
    {{
      "title": "Milestone title",
      "description": "Detailed description of what this milestone covers",
      "tasks": [
        {{
          "title": "Task title",
          "description": "Detailed description of the task",
          "resources": ["Resource 1", "Resource 2"]
        }}
      ]
    }}
  ]
}}

Requirements:
1. Create 4-6 major milestones that cover the entire subject
2. Each milestone should have 3-5 specific tasks
3. Each task should have 2-3 relevant resources
4. Ensure logical progression from basic to advanced concepts
5. Include practical applications and real-world examples where relevant

Respond ONLY with valid JSON. Do not include any explanation or commentary."#,
        subject = subject
    )
}

pub fn parse_roadmap(text: &str) -> Result<Roadmap, RoadmapError> {
    let json = extract_json_object(text)
        .ok_or_else(|| RoadmapError::InvalidFormat("no JSON object in response".to_string()))?;
    let roadmap: Roadmap =
        serde_json::from_str(json).map_err(|e| RoadmapError::InvalidFormat(e.to_string()))?;

    if roadmap.milestones.is_empty() {
        return Err(RoadmapError::InvalidFormat("roadmap has no milestones".to_string()));
    }

    Ok(roadmap)
}
