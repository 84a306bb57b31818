//! Course materials attached to subjects

use super::{now, parse_timestamp, parse_uuid};
use bloom_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub title: String,
    pub content_url: String,
    pub subject_id: Uuid,
    /// Blob store path, when the file lives in the blob store
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub title: String,
    pub content_url: String,
    pub subject_id: Uuid,
    pub storage_path: Option<String>,
}

fn from_row(row: &SqliteRow) -> Result<Material> {
    Ok(Material {
        id: parse_uuid(row.get("id"))?,
        title: row.get("title"),
        content_url: row.get("content_url"),
        subject_id: parse_uuid(row.get("subject_id"))?,
        storage_path: row.get("storage_path"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

pub async fn create_material(pool: &SqlitePool, new: NewMaterial) -> Result<Material> {
    let id = Uuid::new_v4();
    let created_at = now();

    sqlx::query(
        "INSERT INTO materials (id, title, content_url, subject_id, storage_path, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&new.title)
    .bind(&new.content_url)
    .bind(new.subject_id.to_string())
    .bind(&new.storage_path)
    .bind(&created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        let err = Error::from(e);
        if super::is_foreign_key_violation(&err) {
            Error::NotFound(format!("Subject {}", new.subject_id))
        } else {
            err
        }
    })?;

    Ok(Material {
        id,
        title: new.title,
        content_url: new.content_url,
        subject_id: new.subject_id,
        storage_path: new.storage_path,
        created_at: parse_timestamp(&created_at)?,
    })
}

pub async fn get_material(pool: &SqlitePool, id: Uuid) -> Result<Option<Material>> {
    sqlx::query("SELECT * FROM materials WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

/// Materials of a subject, newest first
pub async fn list_materials(pool: &SqlitePool, subject_id: Uuid) -> Result<Vec<Material>> {
    sqlx::query("SELECT * FROM materials WHERE subject_id = ? ORDER BY created_at DESC, rowid DESC")
        .bind(subject_id.to_string())
        .fetch_all(pool)
        .await?
        .iter()
        .map(from_row)
        .collect()
}

pub async fn delete_material(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM materials WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{subjects, teachers};
    use bloom_common::db::init_memory_database;

    #[tokio::test]
    async fn test_create_list_delete() {
        let pool = init_memory_database().await.unwrap();
        let teacher = teachers::create_teacher(&pool, "Ada", "ada", None).await.unwrap();
        let subject = subjects::create_subject(&pool, "Physics", teacher.id).await.unwrap();

        let first = create_material(
            &pool,
            NewMaterial {
                title: "Syllabus".into(),
                content_url: "/api/blobs/physics/syllabus.pdf".into(),
                subject_id: subject.id,
                storage_path: Some("physics/syllabus.pdf".into()),
            },
        )
        .await
        .unwrap();
        let second = create_material(
            &pool,
            NewMaterial {
                title: "Lab notes".into(),
                content_url: "https://example.com/lab".into(),
                subject_id: subject.id,
                storage_path: None,
            },
        )
        .await
        .unwrap();

        let listed = list_materials(&pool, subject.id).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        assert!(delete_material(&pool, first.id).await.unwrap());
        assert!(get_material(&pool, first.id).await.unwrap().is_none());
        assert!(!delete_material(&pool, first.id).await.unwrap());
    }
}
