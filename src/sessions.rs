//! Chat session anchor entities. Sessions exist so messages and analyses
//! have something to hang off; there is no deeper modeling here.

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::models::{ChatMessage, ChatSession, MessageRole};

pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    title: Option<&str>,
) -> Result<ChatSession> {
    let now = chrono::Utc::now().timestamp();
    let session = ChatSession {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.title)
    .bind(session.created_at)
    .bind(session.updated_at)
    .execute(pool)
    .await?;

    Ok(session)
}

pub async fn fetch_session(pool: &SqlitePool, session_id: &str) -> Result<ChatSession> {
    let row = sqlx::query(
        "SELECT id, user_id, title, created_at, updated_at FROM chat_sessions WHERE id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AdvisorError::NotFound(format!("session {session_id} not found")))?;

    Ok(ChatSession {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Messages in chronological order.
pub async fn list_messages(pool: &SqlitePool, session_id: &str) -> Result<Vec<ChatMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT id, session_id, user_id, role, content, image_url, message_type, created_at
        FROM chat_messages WHERE session_id = ? ORDER BY created_at, id
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| {
            let role: String = row.get("role");
            ChatMessage {
                id: row.get("id"),
                session_id: row.get("session_id"),
                user_id: row.get("user_id"),
                role: if role == "assistant" {
                    MessageRole::Assistant
                } else {
                    MessageRole::User
                },
                content: row.get("content"),
                image_url: row.get("image_url"),
                message_type: row.get("message_type"),
                created_at: row.get("created_at"),
            }
        })
        .collect())
}
