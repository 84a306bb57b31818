//! Subjects taught by a teacher

use super::{now, parse_timestamp, parse_uuid};
use bloom_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrolledStudent {
    pub id: Uuid,
    pub name: String,
    pub progress: i64,
}

/// Subject with its enrolled students
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub id: Uuid,
    pub name: String,
    pub enrolled: Vec<EnrolledStudent>,
}

fn from_row(row: &SqliteRow) -> Result<Subject> {
    Ok(Subject {
        id: parse_uuid(row.get("id"))?,
        name: row.get("name"),
        teacher_id: parse_uuid(row.get("teacher_id"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

/// Create a subject; an unknown teacher is reported as `NotFound`
pub async fn create_subject(pool: &SqlitePool, name: &str, teacher_id: Uuid) -> Result<Subject> {
    let id = Uuid::new_v4();
    let created_at = now();

    sqlx::query("INSERT INTO subjects (id, name, teacher_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(teacher_id.to_string())
        .bind(&created_at)
        .execute(pool)
        .await
        .map_err(|e| {
            let err = Error::from(e);
            if super::is_foreign_key_violation(&err) {
                Error::NotFound(format!("Teacher {}", teacher_id))
            } else {
                err
            }
        })?;

    Ok(Subject {
        id,
        name: name.to_string(),
        teacher_id,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub async fn get_subject(pool: &SqlitePool, id: Uuid) -> Result<Option<Subject>> {
    sqlx::query("SELECT * FROM subjects WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

pub async fn list_subjects(pool: &SqlitePool) -> Result<Vec<SubjectSummary>> {
    let subjects = sqlx::query("SELECT * FROM subjects ORDER BY name, created_at")
        .fetch_all(pool)
        .await?;

    let mut summaries = Vec::with_capacity(subjects.len());
    for row in &subjects {
        let subject = from_row(row)?;
        let students = sqlx::query(
            r#"
            SELECT s.id AS id, s.name AS name, e.progress AS progress
            FROM enrollments e
            JOIN students s ON s.id = e.student_id
            WHERE e.subject_id = ?
            ORDER BY s.name
            "#,
        )
        .bind(subject.id.to_string())
        .fetch_all(pool)
        .await?;

        let enrolled = students
            .iter()
            .map(|row| {
                Ok(EnrolledStudent {
                    id: parse_uuid(row.get("id"))?,
                    name: row.get("name"),
                    progress: row.get("progress"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        summaries.push(SubjectSummary {
            id: subject.id,
            name: subject.name,
            enrolled,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{enrollments, students, teachers};
    use bloom_common::db::init_memory_database;

    #[tokio::test]
    async fn test_unknown_teacher_is_not_found() {
        let pool = init_memory_database().await.unwrap();

        let err = create_subject(&pool, "Physics", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_includes_enrolled_students() {
        let pool = init_memory_database().await.unwrap();
        let teacher = teachers::create_teacher(&pool, "Ada", "ada", None).await.unwrap();
        let physics = create_subject(&pool, "Physics", teacher.id).await.unwrap();
        create_subject(&pool, "Art", teacher.id).await.unwrap();
        let bo = students::create_student(&pool, "Bo", "bo", None).await.unwrap();
        enrollments::enroll(&pool, physics.id, bo.id).await.unwrap();
        enrollments::set_progress(&pool, physics.id, bo.id, 40).await.unwrap();

        let listed = list_subjects(&pool).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Art");
        assert!(listed[0].enrolled.is_empty());
        assert_eq!(listed[1].enrolled[0].progress, 40);
        assert_eq!(get_subject(&pool, physics.id).await.unwrap().unwrap().teacher_id, teacher.id);
    }
}
