//! Configuration resolution for bloom-api
//!
//! Completion API key priority: Database → ENV → TOML.
//! Generation settings live in the settings table; missing keys are written
//! back with their defaults on load.

use crate::completion::openai::DEFAULT_BASE_URL;
use crate::curriculum::chunker::DEFAULT_CHUNK_MAX_CHARS;
use crate::curriculum::extractor::DEFAULT_EXTRACTION_CHAR_BUDGET;
use crate::curriculum::{ChapterOrdering, GenerationParams};
use crate::db::settings::{get_completion_api_key, get_or_init, set_completion_api_key};
use bloom_common::config::{load_toml_config_or_default, write_toml_config, TomlConfig};
use bloom_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variables checked for the completion API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["BLOOM_COMPLETION_API_KEY", "OPENAI_API_KEY"];

/// Where a resolved API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Database,
    Environment,
    Toml,
}

impl KeySource {
    fn label(self) -> &'static str {
        match self {
            KeySource::Database => "database",
            KeySource::Environment => "environment",
            KeySource::Toml => "TOML",
        }
    }
}

/// Resolve the completion API key from database, environment, then TOML
pub async fn resolve_completion_api_key(
    db: &SqlitePool,
    toml_config: &TomlConfig,
) -> Result<(String, KeySource)> {
    let db_key = get_completion_api_key(db).await?.filter(|k| is_valid_key(k));
    let env_key = API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|k| is_valid_key(k));
    let toml_key = toml_config
        .completion_api_key
        .clone()
        .filter(|k| is_valid_key(k));

    let candidates = [
        (db_key, KeySource::Database),
        (env_key, KeySource::Environment),
        (toml_key, KeySource::Toml),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(key, _)| key.is_some())
        .map(|(_, source)| source.label())
        .collect();
    if sources.len() > 1 {
        warn!(
            "Completion API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match candidates.into_iter().find_map(|(key, source)| key.map(|k| (k, source))) {
        Some((key, source)) => {
            info!("Completion API key loaded from {}", source.label());
            Ok((key, source))
        }
        None => Err(Error::Config(
            "Completion API key not configured. Configure it using one of:\n\
             1. POST /api/settings/completion_api_key {\"api_key\": \"...\"}\n\
             2. Environment: BLOOM_COMPLETION_API_KEY or OPENAI_API_KEY\n\
             3. TOML config: ~/.config/bloom/bloom.toml (completion_api_key = \"...\")"
                .to_string(),
        )),
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Copy settings into the TOML file, keeping every other field
///
/// Write failures are logged and swallowed; the database stays authoritative.
pub async fn sync_settings_to_toml(settings: HashMap<String, String>, toml_path: &Path) -> Result<()> {
    let mut config = load_toml_config_or_default(toml_path);

    if let Some(key) = settings.get("completion_api_key") {
        config.completion_api_key = Some(key.clone());
    }

    match write_toml_config(&config, toml_path) {
        Ok(()) => {
            info!("Settings synced to TOML: {}", toml_path.display());
        }
        Err(e) => {
            warn!("TOML write failed (database write succeeded): {}", e);
        }
    }
    Ok(())
}

/// Persist a key found in the environment or TOML into the database
pub async fn migrate_key_to_database(
    key: &str,
    source: KeySource,
    db: &SqlitePool,
    toml_path: Option<&Path>,
) -> Result<()> {
    if source == KeySource::Database {
        return Ok(());
    }

    set_completion_api_key(db, key).await?;

    if let (KeySource::Environment, Some(path)) = (source, toml_path) {
        let mut settings = HashMap::new();
        settings.insert("completion_api_key".to_string(), key.to_string());
        sync_settings_to_toml(settings, path).await?;
    }

    info!("Completion API key migrated from {} to database", source.label());
    Ok(())
}

/// Runtime settings for the curriculum pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub completion_model: String,
    pub completion_base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub chunk_max_chars: usize,
    /// 0 disables truncation
    pub extraction_char_budget: usize,
    pub completion_timeout_secs: u64,
    pub chapter_ordering: ChapterOrdering,
    pub max_upload_bytes: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            completion_model: "gpt-4".to_string(),
            completion_base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: 1500,
            temperature: 0.2,
            chunk_max_chars: DEFAULT_CHUNK_MAX_CHARS,
            extraction_char_budget: DEFAULT_EXTRACTION_CHAR_BUDGET,
            completion_timeout_secs: 120,
            chapter_ordering: ChapterOrdering::default(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl GenerationSettings {
    /// Load from the settings table, writing defaults for missing keys
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        let defaults = Self::default();

        let settings = Self {
            completion_model: get_or_init(db, "completion_model", defaults.completion_model).await?,
            completion_base_url: get_or_init(db, "completion_base_url", defaults.completion_base_url).await?,
            max_output_tokens: get_or_init(db, "max_output_tokens", defaults.max_output_tokens).await?,
            temperature: get_or_init(db, "temperature", defaults.temperature).await?,
            chunk_max_chars: get_or_init(db, "chunk_max_chars", defaults.chunk_max_chars).await?,
            extraction_char_budget: get_or_init(db, "extraction_char_budget", defaults.extraction_char_budget)
                .await?,
            completion_timeout_secs: get_or_init(db, "completion_timeout_secs", defaults.completion_timeout_secs)
                .await?,
            chapter_ordering: get_or_init(db, "chapter_ordering", defaults.chapter_ordering).await?,
            max_upload_bytes: get_or_init(db, "max_upload_bytes", defaults.max_upload_bytes).await?,
        };

        if !(0.0..=2.0).contains(&settings.temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                settings.temperature
            )));
        }

        Ok(settings)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            model: self.completion_model.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            timeout: self.completion_timeout(),
        }
    }

    /// Extraction budget, `None` when disabled
    pub fn extraction_budget(&self) -> Option<usize> {
        match self.extraction_char_budget {
            0 => None,
            budget => Some(budget),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_common::db::{init_memory_database, set_setting};

    #[tokio::test]
    async fn test_load_writes_defaults_back() {
        let pool = init_memory_database().await.unwrap();

        let settings = GenerationSettings::load(&pool).await.unwrap();
        assert_eq!(settings, GenerationSettings::default());

        let stored = bloom_common::db::get_setting(&pool, "chapter_ordering").await.unwrap();
        assert_eq!(stored.as_deref(), Some("numbered"));
    }

    #[tokio::test]
    async fn test_load_reads_overrides() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, "chunk_max_chars", "1000").await.unwrap();
        set_setting(&pool, "chapter_ordering", "content_length").await.unwrap();
        set_setting(&pool, "extraction_char_budget", "0").await.unwrap();

        let settings = GenerationSettings::load(&pool).await.unwrap();

        assert_eq!(settings.chunk_max_chars, 1000);
        assert_eq!(settings.chapter_ordering, ChapterOrdering::ContentLength);
        assert_eq!(settings.extraction_budget(), None);
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_is_rejected() {
        let pool = init_memory_database().await.unwrap();
        set_setting(&pool, "temperature", "3.5").await.unwrap();

        assert!(matches!(GenerationSettings::load(&pool).await, Err(Error::Config(_))));
    }

    #[test]
    fn test_generation_params_follow_settings() {
        let settings = GenerationSettings {
            completion_timeout_secs: 7,
            ..GenerationSettings::default()
        };
        let params = settings.generation_params();

        assert_eq!(params.timeout, Duration::from_secs(7));
        assert_eq!(params.max_output_tokens, 1500);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("  \t"));
    }
}
