//! Curriculum modules
//!
//! A module is the persisted result of one upload: its curriculum plus the
//! optional roadmap and lesson details attached later.

use super::{now, parse_json, parse_timestamp, parse_uuid};
use crate::curriculum::Curriculum;
use bloom_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: Uuid,
    pub title: String,
    pub teacher_id: Uuid,
    pub curriculum: Curriculum,
    pub textbook_or_subject: String,
    pub roadmap: Option<Value>,
    pub lesson_details: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub teacher_id: Uuid,
    pub curriculum: Curriculum,
    pub textbook_or_subject: String,
}

fn from_row(row: &SqliteRow) -> Result<Module> {
    Ok(Module {
        id: parse_uuid(row.get("id"))?,
        title: row.get("title"),
        teacher_id: parse_uuid(row.get("teacher_id"))?,
        curriculum: serde_json::from_str(row.get("curriculum"))?,
        textbook_or_subject: row.get("textbook_or_subject"),
        roadmap: parse_json(row.get("roadmap"))?,
        lesson_details: parse_json(row.get("lesson_details"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

/// Insert a module through a pool, connection or open transaction
pub async fn insert_module<'e, E>(executor: E, new: NewModule) -> Result<Module>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let id = Uuid::new_v4();
    let timestamp = now();

    sqlx::query(
        r#"
        INSERT INTO modules (id, title, teacher_id, curriculum, textbook_or_subject, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&new.title)
    .bind(new.teacher_id.to_string())
    .bind(serde_json::to_string(&new.curriculum)?)
    .bind(&new.textbook_or_subject)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(executor)
    .await?;

    let created = parse_timestamp(&timestamp)?;
    Ok(Module {
        id,
        title: new.title,
        teacher_id: new.teacher_id,
        curriculum: new.curriculum,
        textbook_or_subject: new.textbook_or_subject,
        roadmap: None,
        lesson_details: None,
        created_at: created,
        updated_at: created,
    })
}

pub async fn get_module(pool: &SqlitePool, id: Uuid) -> Result<Option<Module>> {
    sqlx::query("SELECT * FROM modules WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .as_ref()
        .map(from_row)
        .transpose()
}

/// All modules ordered by title
pub async fn list_modules(pool: &SqlitePool) -> Result<Vec<Module>> {
    sqlx::query("SELECT * FROM modules ORDER BY title, created_at")
        .fetch_all(pool)
        .await?
        .iter()
        .map(from_row)
        .collect()
}

/// Replace title and/or curriculum; `NotFound` when the module does not exist
pub async fn update_module(
    pool: &SqlitePool,
    id: Uuid,
    title: Option<&str>,
    curriculum: Option<&Curriculum>,
) -> Result<Module> {
    let curriculum_text = curriculum.map(serde_json::to_string).transpose()?;

    let result = sqlx::query(
        r#"
        UPDATE modules SET
            title = COALESCE(?, title),
            curriculum = COALESCE(?, curriculum),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(curriculum_text)
    .bind(now())
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Module {}", id)));
    }

    get_module(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Module {}", id)))
}

/// Store `curriculum` only if the stored curriculum still equals `expected`
///
/// Returns `None` when the module is gone or another writer changed its
/// curriculum after `expected` was read.
pub async fn replace_curriculum(
    pool: &SqlitePool,
    id: Uuid,
    expected: &Curriculum,
    curriculum: &Curriculum,
) -> Result<Option<Module>> {
    let result = sqlx::query("UPDATE modules SET curriculum = ?, updated_at = ? WHERE id = ? AND curriculum = ?")
        .bind(serde_json::to_string(curriculum)?)
        .bind(now())
        .bind(id.to_string())
        .bind(serde_json::to_string(expected)?)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_module(pool, id).await
}

pub async fn set_roadmap(pool: &SqlitePool, id: Uuid, roadmap: &Value) -> Result<Module> {
    set_json_column(pool, id, "roadmap", roadmap).await
}

pub async fn set_lesson_details(pool: &SqlitePool, id: Uuid, details: &Value) -> Result<Module> {
    set_json_column(pool, id, "lesson_details", details).await
}

async fn set_json_column(pool: &SqlitePool, id: Uuid, column: &'static str, value: &Value) -> Result<Module> {
    // Column names come from the two callers above, never from input
    let sql = format!("UPDATE modules SET {} = ?, updated_at = ? WHERE id = ?", column);
    let result = sqlx::query(&sql)
        .bind(serde_json::to_string(value)?)
        .bind(now())
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Module {}", id)));
    }

    get_module(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Module {}", id)))
}

pub async fn delete_module(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM modules WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
