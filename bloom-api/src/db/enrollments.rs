//! Student enrollment in subjects

use super::parse_uuid;
use bloom_common::{Error, Result};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub student_id: Uuid,
    pub progress: i64,
}

/// Enroll a student with progress 0
///
/// Enrolling twice is a unique violation; unknown subject or student is `NotFound`.
pub async fn enroll(pool: &SqlitePool, subject_id: Uuid, student_id: Uuid) -> Result<Enrollment> {
    let id = Uuid::new_v4();

    sqlx::query("INSERT INTO enrollments (id, subject_id, student_id, progress) VALUES (?, ?, ?, 0)")
        .bind(id.to_string())
        .bind(subject_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::from(e);
            if super::is_foreign_key_violation(&err) {
                Error::NotFound(format!("Subject {} or student {}", subject_id, student_id))
            } else {
                err
            }
        })?;

    Ok(Enrollment {
        id,
        subject_id,
        student_id,
        progress: 0,
    })
}

/// Remove an enrollment; returns whether one existed
pub async fn unenroll(pool: &SqlitePool, subject_id: Uuid, student_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM enrollments WHERE subject_id = ? AND student_id = ?")
        .bind(subject_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Set progress (0–100) of an existing enrollment
pub async fn set_progress(pool: &SqlitePool, subject_id: Uuid, student_id: Uuid, progress: i64) -> Result<Enrollment> {
    if !(0..=100).contains(&progress) {
        return Err(Error::InvalidInput(format!(
            "Progress must be between 0 and 100, got {}",
            progress
        )));
    }

    let row = sqlx::query(
        "UPDATE enrollments SET progress = ? WHERE subject_id = ? AND student_id = ? RETURNING id",
    )
    .bind(progress)
    .bind(subject_id.to_string())
    .bind(student_id.to_string())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Enrollment of student {} in subject {}", student_id, subject_id)))?;

    Ok(Enrollment {
        id: parse_uuid(row.get("id"))?,
        subject_id,
        student_id,
        progress,
    })
}
