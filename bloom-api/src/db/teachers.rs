//! Teacher records and the teacher–student roster

use super::{now, parse_timestamp, parse_uuid};
use bloom_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_TEACHER_NAME: &str = "Default Teacher";
pub const DEFAULT_TEACHER_USERNAME: &str = "default-teacher";
pub const DEFAULT_TEACHER_EMAIL: &str = "default-teacher@example.com";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn from_row(row: &SqliteRow) -> Result<Teacher> {
    Ok(Teacher {
        id: parse_uuid(row.get("id"))?,
        name: row.get("name"),
        username: row.get("username"),
        email: row.get("email"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

pub async fn create_teacher(
    pool: &SqlitePool,
    name: &str,
    username: &str,
    email: Option<&str>,
) -> Result<Teacher> {
    let id = Uuid::new_v4();
    let created_at = now();

    sqlx::query("INSERT INTO teachers (id, name, username, email, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(username)
        .bind(email)
        .bind(&created_at)
        .execute(pool)
        .await?;

    Ok(Teacher {
        id,
        name: name.to_string(),
        username: username.to_string(),
        email: email.map(str::to_string),
        created_at: parse_timestamp(&created_at)?,
    })
}

pub async fn get_teacher(pool: &SqlitePool, id: Uuid) -> Result<Option<Teacher>> {
    sqlx::query("SELECT * FROM teachers WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

pub async fn find_teacher_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Teacher>> {
    sqlx::query("SELECT * FROM teachers WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

/// Oldest teacher, if any
pub async fn first_teacher(pool: &SqlitePool) -> Result<Option<Teacher>> {
    sqlx::query("SELECT * FROM teachers ORDER BY created_at, rowid LIMIT 1")
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

/// First teacher, creating the default teacher when the table is empty
pub async fn ensure_default_teacher(pool: &SqlitePool) -> Result<Teacher> {
    let mut conn = pool.acquire().await?;
    ensure_default_teacher_on(&mut conn).await
}

/// [`ensure_default_teacher`] on a caller-held connection or transaction
///
/// The conditional insert runs first so it takes the write lock before
/// anything is read; two first uploads cannot both create the teacher.
pub async fn ensure_default_teacher_on(conn: &mut SqliteConnection) -> Result<Teacher> {
    let result = sqlx::query(
        r#"
        INSERT INTO teachers (id, name, username, email, created_at)
        SELECT ?, ?, ?, ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM teachers)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(DEFAULT_TEACHER_NAME)
    .bind(DEFAULT_TEACHER_USERNAME)
    .bind(DEFAULT_TEACHER_EMAIL)
    .bind(now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        info!("No teachers found, created default teacher");
    }

    sqlx::query("SELECT * FROM teachers ORDER BY created_at, rowid LIMIT 1")
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()?
        .ok_or_else(|| Error::Internal("Default teacher missing after insert".to_string()))
}

/// Link a student to a teacher; linking twice is a no-op
pub async fn add_student(pool: &SqlitePool, teacher_id: Uuid, student_id: Uuid) -> Result<()> {
    let result = sqlx::query("INSERT OR IGNORE INTO teacher_students (teacher_id, student_id) VALUES (?, ?)")
        .bind(teacher_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            let err = Error::from(e);
            if super::is_foreign_key_violation(&err) {
                Err(Error::NotFound(format!("Teacher {}", teacher_id)))
            } else {
                Err(err)
            }
        }
    }
}

/// Unlink a student; returns whether a link existed
pub async fn remove_student(pool: &SqlitePool, teacher_id: Uuid, student_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM teacher_students WHERE teacher_id = ? AND student_id = ?")
        .bind(teacher_id.to_string())
        .bind(student_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
