//! Student records

use super::{now, parse_json, parse_timestamp, parse_uuid};
use bloom_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub image_url: Option<String>,
    pub preferences: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// A subject a student is enrolled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrolledSubject {
    pub name: String,
    pub progress: i64,
}

/// Student with their enrollments, as listed to teachers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(flatten)]
    pub student: Student,
    pub enrolled: Vec<EnrolledSubject>,
}

fn from_row(row: &SqliteRow) -> Result<Student> {
    Ok(Student {
        id: parse_uuid(row.get("id"))?,
        name: row.get("name"),
        username: row.get("username"),
        image_url: row.get("image_url"),
        preferences: parse_json(row.get("preferences"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

pub async fn create_student(
    pool: &SqlitePool,
    name: &str,
    username: &str,
    preferences: Option<&Value>,
) -> Result<Student> {
    let id = Uuid::new_v4();
    let created_at = now();
    let preferences_text = preferences.map(serde_json::to_string).transpose()?;

    sqlx::query("INSERT INTO students (id, name, username, preferences, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(username)
        .bind(&preferences_text)
        .bind(&created_at)
        .execute(pool)
        .await?;

    Ok(Student {
        id,
        name: name.to_string(),
        username: username.to_string(),
        image_url: None,
        preferences: preferences.cloned(),
        created_at: parse_timestamp(&created_at)?,
    })
}

pub async fn find_student_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Student>> {
    sqlx::query("SELECT * FROM students WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

/// All students, or only those on `teacher_id`'s roster
pub async fn list_students(pool: &SqlitePool, teacher_id: Option<Uuid>) -> Result<Vec<StudentSummary>> {
    let rows = match teacher_id {
        Some(teacher_id) => {
            sqlx::query(
                r#"
                SELECT s.* FROM students s
                JOIN teacher_students ts ON ts.student_id = s.id
                WHERE ts.teacher_id = ?
                ORDER BY s.name, s.username
                "#,
            )
            .bind(teacher_id.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query("SELECT * FROM students ORDER BY name, username")
                .fetch_all(pool)
                .await?
        }
    };

    let mut summaries = Vec::with_capacity(rows.len());
    for row in &rows {
        let student = from_row(row)?;
        let enrolled = enrolled_subjects(pool, student.id).await?;
        summaries.push(StudentSummary { student, enrolled });
    }

    Ok(summaries)
}

async fn enrolled_subjects(pool: &SqlitePool, student_id: Uuid) -> Result<Vec<EnrolledSubject>> {
    let rows = sqlx::query(
        r#"
        SELECT sub.name AS name, e.progress AS progress
        FROM enrollments e
        JOIN subjects sub ON sub.id = e.subject_id
        WHERE e.student_id = ?
        ORDER BY sub.name
        "#,
    )
    .bind(student_id.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| EnrolledSubject {
            name: row.get("name"),
            progress: row.get("progress"),
        })
        .collect())
}
