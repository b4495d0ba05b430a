use sqlx::SqlitePool;

use crate::error::Result;

/// Create all tables and indexes. Idempotent; safe to run at every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            source TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            content TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_assets (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            file_url TEXT NOT NULL,
            public_id TEXT NOT NULL,
            provider TEXT NOT NULL DEFAULT 'local',
            mime_type TEXT,
            size_bytes INTEGER NOT NULL DEFAULT 0,
            width INTEGER,
            height INTEGER,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chunks are immutable once created; re-embedding replaces the whole set.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            FOREIGN KEY (document_id) REFERENCES documents(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            user_id TEXT,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            image_url TEXT,
            message_type TEXT NOT NULL DEFAULT 'text',
            created_at INTEGER NOT NULL,
            FOREIGN KEY (session_id) REFERENCES chat_sessions(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            message_id TEXT,
            raw_input TEXT NOT NULL,
            result TEXT NOT NULL,
            confidence REAL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (message_id) REFERENCES chat_messages(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routines (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            analysis_id TEXT,
            parent_id TEXT,
            description TEXT NOT NULL,
            target_skin_type TEXT,
            target_conditions TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            version INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (analysis_id) REFERENCES analyses(id),
            FOREIGN KEY (parent_id) REFERENCES routines(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // UNIQUE(routine_id, step_order) backs the step-density invariant.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS routine_steps (
            id TEXT PRIMARY KEY,
            routine_id TEXT NOT NULL,
            step_order INTEGER NOT NULL,
            instruction TEXT NOT NULL,
            time_of_day TEXT NOT NULL DEFAULT 'both',
            frequency TEXT NOT NULL DEFAULT 'daily',
            UNIQUE(routine_id, step_order),
            FOREIGN KEY (routine_id) REFERENCES routines(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assets_document_id ON document_assets(document_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_status ON documents(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_session_id ON chat_messages(session_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_routines_user_id ON routines(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_steps_routine_id ON routine_steps(routine_id)")
        .execute(pool)
        .await?;

    Ok(())
}
