//! Persistence coordinator for generation results.
//!
//! The generation call has already completed by the time anything here
//! runs; these functions only turn a validated [`AnalysisDraft`] into
//! rows. Each turn is one `sqlx` transaction covering the user message
//! (plus a synthesized session for consultations), the analysis record,
//! the optional draft routine with its steps, and the assistant message.
//! Any failure rolls the whole transaction back, so a failed request
//! leaves zero rows behind. Dropping the future before commit has the
//! same effect through the transaction's drop guard.

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::generate::{AnalysisDraft, RoutineDraft};
use crate::models::{message_type, MessageRole, RoutineStatus};

/// Row ids created by one persisted turn.
#[derive(Debug, Clone)]
pub struct PersistedTurn {
    pub session_id: String,
    pub user_message_id: String,
    pub assistant_message_id: String,
    pub analysis_id: String,
    pub routine_id: Option<String>,
}

/// Persist one turn against an existing chat session.
pub async fn persist_chat_turn(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
    text: &str,
    image_url: Option<&str>,
    draft: &AnalysisDraft,
    reply: &str,
) -> Result<PersistedTurn> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    let persisted =
        write_turn(&mut tx, session_id, user_id, text, image_url, draft, reply, now).await?;

    sqlx::query("UPDATE chat_sessions SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(persisted)
}

/// Persist a consultation: synthesizes the session row in the same
/// transaction as everything else.
pub async fn persist_consultation(
    pool: &SqlitePool,
    user_id: &str,
    text: &str,
    image_url: Option<&str>,
    draft: &AnalysisDraft,
    reply: &str,
) -> Result<PersistedTurn> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();
    let session_id = Uuid::new_v4().to_string();

    let title: String = text.trim().chars().take(60).collect();
    sqlx::query(
        r#"
        INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(&title)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let persisted =
        write_turn(&mut tx, &session_id, user_id, text, image_url, draft, reply, now).await?;

    tx.commit().await?;
    Ok(persisted)
}

#[allow(clippy::too_many_arguments)]
async fn write_turn(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: &str,
    user_id: &str,
    text: &str,
    image_url: Option<&str>,
    draft: &AnalysisDraft,
    reply: &str,
    now: i64,
) -> Result<PersistedTurn> {
    let user_message_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO chat_messages
            (id, session_id, user_id, role, content, image_url, message_type, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user_message_id)
    .bind(session_id)
    .bind(user_id)
    .bind(MessageRole::User.as_str())
    .bind(text)
    .bind(image_url)
    .bind(message_type(!text.trim().is_empty(), image_url.is_some()))
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let analysis_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO analyses
            (id, user_id, message_id, raw_input, result, confidence, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&analysis_id)
    .bind(user_id)
    .bind(&user_message_id)
    .bind(text)
    .bind(&draft.raw)
    .bind(draft.confidence)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    let routine_id = match draft.routine {
        Some(ref routine) => {
            Some(write_routine(tx, user_id, &analysis_id, routine, now).await?)
        }
        None => None,
    };

    let assistant_message_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO chat_messages
            (id, session_id, user_id, role, content, image_url, message_type, created_at)
        VALUES (?, ?, NULL, ?, ?, NULL, 'text', ?)
        "#,
    )
    .bind(&assistant_message_id)
    .bind(session_id)
    .bind(MessageRole::Assistant.as_str())
    .bind(reply)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    Ok(PersistedTurn {
        session_id: session_id.to_string(),
        user_message_id,
        assistant_message_id,
        analysis_id,
        routine_id,
    })
}

/// Generation-path routines always start as draft, version 1.
async fn write_routine(
    tx: &mut Transaction<'_, Sqlite>,
    user_id: &str,
    analysis_id: &str,
    routine: &RoutineDraft,
    now: i64,
) -> Result<String> {
    let routine_id = Uuid::new_v4().to_string();
    let conditions = if routine.target_conditions.is_empty() {
        None
    } else {
        Some(routine.target_conditions.join(","))
    };

    sqlx::query(
        r#"
        INSERT INTO routines
            (id, user_id, analysis_id, parent_id, description, target_skin_type,
             target_conditions, status, version, created_at, updated_at)
        VALUES (?, ?, ?, NULL, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&routine_id)
    .bind(user_id)
    .bind(analysis_id)
    .bind(&routine.description)
    .bind(&routine.target_skin_type)
    .bind(conditions)
    .bind(RoutineStatus::Draft.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    for step in &routine.steps {
        sqlx::query(
            r#"
            INSERT INTO routine_steps
                (id, routine_id, step_order, instruction, time_of_day, frequency)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&routine_id)
        .bind(step.order)
        .bind(&step.instruction)
        .bind(step.time_of_day.as_str())
        .bind(step.frequency.as_str())
        .execute(&mut **tx)
        .await?;
    }

    Ok(routine_id)
}
