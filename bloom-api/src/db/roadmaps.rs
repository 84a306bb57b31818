//! Published subject roadmaps (one per subject name)

use super::{now, parse_timestamp};
use bloom_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRoadmap {
    pub subject: String,
    pub roadmap: Value,
    pub updated_at: DateTime<Utc>,
}

/// Insert or replace the published roadmap for `subject`
pub async fn publish_roadmap(pool: &SqlitePool, subject: &str, roadmap: &Value) -> Result<PublishedRoadmap> {
    let updated_at = now();

    sqlx::query(
        r#"
        INSERT INTO published_roadmaps (subject, roadmap, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(subject) DO UPDATE SET
            roadmap = excluded.roadmap,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(subject)
    .bind(serde_json::to_string(roadmap)?)
    .bind(&updated_at)
    .execute(pool)
    .await?;

    Ok(PublishedRoadmap {
        subject: subject.to_string(),
        roadmap: roadmap.clone(),
        updated_at: parse_timestamp(&updated_at)?,
    })
}

pub async fn get_published_roadmap(pool: &SqlitePool, subject: &str) -> Result<Option<PublishedRoadmap>> {
    let row = sqlx::query("SELECT subject, roadmap, updated_at FROM published_roadmaps WHERE subject = ?")
        .bind(subject)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(PublishedRoadmap {
            subject: row.get("subject"),
            roadmap: serde_json::from_str(row.get("roadmap"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloom_common::db::init_memory_database;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_is_upsert() {
        let pool = init_memory_database().await.unwrap();

        publish_roadmap(&pool, "Chemistry", &json!({"title": "v1"})).await.unwrap();
        publish_roadmap(&pool, "Chemistry", &json!({"title": "v2"})).await.unwrap();

        let stored = get_published_roadmap(&pool, "Chemistry").await.unwrap().unwrap();
        assert_eq!(stored.roadmap["title"], "v2");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM published_roadmaps")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
