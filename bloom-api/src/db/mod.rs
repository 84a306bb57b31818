//! Persistence gateway
//!
//! One module per table family. Identifiers are stored as UUID text,
//! timestamps as RFC 3339 text and JSON columns as serialized text.

pub mod enrollments;
pub mod materials;
pub mod modules;
pub mod roadmaps;
pub mod settings;
pub mod students;
pub mod subjects;
pub mod teachers;

use bloom_common::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Internal(format!("Corrupt id '{}': {}", value, e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}': {}", value, e)))
}

pub(crate) fn parse_json<T: DeserializeOwned>(value: Option<String>) -> Result<Option<T>> {
    value
        .map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(Error::from)
}

/// Current time as fixed-width RFC 3339, so text ordering matches time ordering
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Whether `err` is a UNIQUE constraint violation
pub fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Whether `err` is a FOREIGN KEY constraint violation
pub fn is_foreign_key_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db_err)) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}
