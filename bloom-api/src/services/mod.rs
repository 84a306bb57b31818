//! Completion-backed planning services
//!
//! Single-shot completion calls outside the chunked curriculum pipeline.

pub mod lesson_details;
pub mod roadmap;

pub use lesson_details::{LessonDetails, LessonDetailsService};
pub use roadmap::{Milestone, Roadmap, RoadmapError, RoadmapService, RoadmapTask};
