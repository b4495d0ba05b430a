//! Routine lifecycle management.
//!
//! Draft routines come out of the generation path; this module owns the
//! transitions after that. `archived` is terminal for the pipeline: only
//! the explicit [`update_routine`] admin path can set a status on an
//! archived routine again.

use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::{AdvisorError, Result};
use crate::generate::{RoutineDraft, RoutineStepDraft};
use crate::models::{Frequency, Routine, RoutineStatus, RoutineStep, TimeOfDay};

/// Optional fields for an admin update. `None` leaves the stored value
/// untouched; `steps` replaces the whole set when present.
#[derive(Debug, Clone, Default)]
pub struct RoutineUpdate {
    pub description: Option<String>,
    pub target_skin_type: Option<String>,
    pub target_conditions: Option<Vec<String>>,
    pub status: Option<String>,
    pub steps: Option<Vec<RoutineStepDraft>>,
}

/// Persist a standalone generated draft (no analysis backing it).
pub async fn save_draft(
    pool: &SqlitePool,
    user_id: &str,
    draft: &RoutineDraft,
) -> Result<String> {
    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();
    let routine_id = Uuid::new_v4().to_string();

    let conditions = if draft.target_conditions.is_empty() {
        None
    } else {
        Some(draft.target_conditions.join(","))
    };

    sqlx::query(
        r#"
        INSERT INTO routines
            (id, user_id, analysis_id, parent_id, description, target_skin_type,
             target_conditions, status, version, created_at, updated_at)
        VALUES (?, ?, NULL, NULL, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&routine_id)
    .bind(user_id)
    .bind(&draft.description)
    .bind(&draft.target_skin_type)
    .bind(conditions)
    .bind(RoutineStatus::Draft.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for step in &draft.steps {
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
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(routine_id = %routine_id, steps = draft.steps.len(), "routine draft saved");
    Ok(routine_id)
}

/// draft or published → published. Archived routines cannot be published.
pub async fn publish_routine(pool: &SqlitePool, routine_id: &str) -> Result<()> {
    let status = fetch_status(pool, routine_id).await?;
    if status == RoutineStatus::Archived {
        return Err(AdvisorError::InvalidState(
            "archived routines cannot be published".into(),
        ));
    }

    sqlx::query("UPDATE routines SET status = ?, updated_at = ? WHERE id = ?")
        .bind(RoutineStatus::Published.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(routine_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Any status → archived. Idempotent.
pub async fn archive_routine(pool: &SqlitePool, routine_id: &str) -> Result<()> {
    fetch_status(pool, routine_id).await?;

    sqlx::query("UPDATE routines SET status = ?, updated_at = ? WHERE id = ?")
        .bind(RoutineStatus::Archived.as_str())
        .bind(chrono::Utc::now().timestamp())
        .bind(routine_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Admin update. Field edits and the optional wholesale step replacement
/// happen in one transaction; step orders are rewritten densely from 1
/// regardless of what the caller passed.
pub async fn update_routine(
    pool: &SqlitePool,
    routine_id: &str,
    update: &RoutineUpdate,
) -> Result<()> {
    let status = match update.status {
        Some(ref value) => Some(RoutineStatus::parse(value)?),
        None => None,
    };
    if let Some(ref steps) = update.steps {
        if steps.is_empty() {
            return Err(AdvisorError::InvalidInput(
                "step replacement requires at least one step".into(),
            ));
        }
    }

    fetch_status(pool, routine_id).await?;

    let mut tx = pool.begin().await?;
    let now = chrono::Utc::now().timestamp();

    if let Some(ref description) = update.description {
        sqlx::query("UPDATE routines SET description = ? WHERE id = ?")
            .bind(description)
            .bind(routine_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(ref skin_type) = update.target_skin_type {
        sqlx::query("UPDATE routines SET target_skin_type = ? WHERE id = ?")
            .bind(skin_type)
            .bind(routine_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(ref conditions) = update.target_conditions {
        let joined = if conditions.is_empty() {
            None
        } else {
            Some(conditions.join(","))
        };
        sqlx::query("UPDATE routines SET target_conditions = ? WHERE id = ?")
            .bind(joined)
            .bind(routine_id)
            .execute(&mut *tx)
            .await?;
    }
    if let Some(status) = status {
        sqlx::query("UPDATE routines SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(routine_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(ref steps) = update.steps {
        sqlx::query("DELETE FROM routine_steps WHERE routine_id = ?")
            .bind(routine_id)
            .execute(&mut *tx)
            .await?;
        for (index, step) in steps.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO routine_steps
                    (id, routine_id, step_order, instruction, time_of_day, frequency)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(routine_id)
            .bind(index as i64 + 1)
            .bind(&step.instruction)
            .bind(step.time_of_day.as_str())
            .bind(step.frequency.as_str())
            .execute(&mut *tx)
            .await?;
        }
    }

    sqlx::query("UPDATE routines SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(routine_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Load a routine with its steps in order.
pub async fn fetch_routine(
    pool: &SqlitePool,
    routine_id: &str,
) -> Result<(Routine, Vec<RoutineStep>)> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, analysis_id, parent_id, description, target_skin_type,
               target_conditions, status, version, created_at, updated_at
        FROM routines WHERE id = ?
        "#,
    )
    .bind(routine_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AdvisorError::NotFound(format!("routine {routine_id} not found")))?;

    let status: String = row.get("status");
    let routine = Routine {
        id: row.get("id"),
        user_id: row.get("user_id"),
        analysis_id: row.get("analysis_id"),
        parent_id: row.get("parent_id"),
        description: row.get("description"),
        target_skin_type: row.get("target_skin_type"),
        target_conditions: row.get("target_conditions"),
        status: RoutineStatus::from_stored(&status),
        version: row.get("version"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    };

    let step_rows = sqlx::query(
        r#"
        SELECT id, routine_id, step_order, instruction, time_of_day, frequency
        FROM routine_steps WHERE routine_id = ? ORDER BY step_order
        "#,
    )
    .bind(routine_id)
    .fetch_all(pool)
    .await?;

    let steps = step_rows
        .iter()
        .map(|row| {
            let time_of_day: String = row.get("time_of_day");
            let frequency: String = row.get("frequency");
            RoutineStep {
                id: row.get("id"),
                routine_id: row.get("routine_id"),
                step_order: row.get("step_order"),
                instruction: row.get("instruction"),
                time_of_day: TimeOfDay::normalize(Some(&time_of_day)),
                frequency: Frequency::normalize(Some(&frequency)),
            }
        })
        .collect();

    Ok((routine, steps))
}

async fn fetch_status(pool: &SqlitePool, routine_id: &str) -> Result<RoutineStatus> {
    let row = sqlx::query("SELECT status FROM routines WHERE id = ?")
        .bind(routine_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AdvisorError::NotFound(format!("routine {routine_id} not found")))?;
    let status: String = row.get("status");
    Ok(RoutineStatus::from_stored(&status))
}
