//! Typed accessors over the settings key-value table

use bloom_common::db::{get_setting, set_setting};
use bloom_common::{Error, Result};
use sqlx::SqlitePool;

pub const COMPLETION_API_KEY: &str = "completion_api_key";

pub async fn get_completion_api_key(db: &SqlitePool) -> Result<Option<String>> {
    get_setting(db, COMPLETION_API_KEY).await
}

pub async fn set_completion_api_key(db: &SqlitePool, key: &str) -> Result<()> {
    set_setting(db, COMPLETION_API_KEY, key).await
}

/// Read and parse a setting
pub async fn get_parsed<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_setting(db, key).await? {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Parse setting {} failed: {}", key, e))),
        None => Ok(None),
    }
}

/// Read a setting, writing `default` back when it is missing
pub async fn get_or_init<T>(db: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match get_parsed(db, key).await? {
        Some(value) => Ok(value),
        None => {
            set_setting(db, key, &default.to_string()).await?;
            tracing::debug!(key, value = %default, "Initialized setting with default");
            Ok(default)
        }
    }
}
