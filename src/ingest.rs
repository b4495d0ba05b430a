//! Document ingestion pipeline.
//!
//! Two independently invocable phases:
//!
//! 1. **Ingest**: store uploaded binaries through the [`AssetStore`],
//!    extract text from extractable files, and persist the document with
//!    its aggregated content. A failed upload or insert aborts the whole
//!    ingest and already-stored binaries are deleted best-effort; a
//!    failed extraction is logged and skipped.
//! 2. **Embed**: chunk the document's content, embed every chunk, and
//!    replace the document's chunk set. Chunks committed before an
//!    embedding failure are kept; the call reports the failure and the
//!    document stays partially embedded until the next successful run.
//!
//! Concurrent re-embeds of the same document are serialized through
//! [`EmbedLocks`], so delete-then-insert never interleaves.

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assets::{AssetStore, StoredAsset, UploadFile};
use crate::chunk::chunk_text;
use crate::embedding::{vec_to_blob, EmbeddingClient};
use crate::error::{AdvisorError, Result};
use crate::extract;
use crate::models::DocumentStatus;

/// Chunk size floor applied during the embed phase.
const MIN_CHUNK_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub title: String,
    pub source: Option<String>,
    pub status: Option<String>,
    pub files: Vec<UploadFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// Aggregate content present; the document is ready for the embed phase.
    Queued,
    /// Assets stored but no extractable text was found.
    AssetsUploaded,
}

impl IngestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStatus::Queued => "queued",
            IngestStatus::AssetsUploaded => "assets_uploaded",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub document_id: String,
    pub asset_count: usize,
    pub ingest_status: IngestStatus,
}

/// Phase 1: validate, upload binaries, extract text, persist the document.
pub async fn ingest_document(
    pool: &SqlitePool,
    store: &dyn AssetStore,
    request: IngestRequest,
) -> Result<IngestOutcome> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AdvisorError::InvalidInput("title is required".to_string()));
    }

    let status = DocumentStatus::parse(request.status.as_deref())?;

    let files: Vec<&UploadFile> = request.files.iter().filter(|f| !f.bytes.is_empty()).collect();
    if files.is_empty() {
        return Err(AdvisorError::InvalidInput(
            "at least one non-empty file is required".to_string(),
        ));
    }

    let mut stored_assets = Vec::new();
    match ingest_inner(pool, store, title, request.source.as_deref(), status, &files, &mut stored_assets).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            // Uploads that landed before the failure would otherwise leak.
            for (asset, _) in &stored_assets {
                if let Err(del_err) = store.delete(&asset.public_id).await {
                    warn!(public_id = %asset.public_id, error = %del_err, "asset cleanup failed");
                }
            }
            Err(e)
        }
    }
}

async fn ingest_inner(
    pool: &SqlitePool,
    store: &dyn AssetStore,
    title: &str,
    source: Option<&str>,
    status: DocumentStatus,
    files: &[&UploadFile],
    stored_assets: &mut Vec<(StoredAsset, UploadFile)>,
) -> Result<IngestOutcome> {
    let document_id = Uuid::new_v4().to_string();
    let mut aggregated = String::new();

    for file in files {
        // Storage is mandatory: one failed upload aborts the whole ingest.
        let asset = store.upload(file, "documents").await?;
        stored_assets.push((asset, (*file).clone()));

        if extract::is_text_extractable(&file.name) {
            match extract::extract_text(&file.bytes, &file.name) {
                Ok(text) if !text.trim().is_empty() => {
                    if !aggregated.is_empty() {
                        aggregated.push_str("\n\n");
                    }
                    aggregated.push_str(text.trim());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %file.name, error = %e, "extraction failed, continuing without its content");
                }
            }
        }
    }

    let now = chrono::Utc::now().timestamp();
    let source = source.map(str::trim).filter(|s| !s.is_empty());

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO documents (id, title, source, status, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&document_id)
    .bind(title)
    .bind(source)
    .bind(status.as_str())
    .bind(&aggregated)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for (asset, file) in stored_assets.iter() {
        sqlx::query(
            r#"
            INSERT INTO document_assets
                (id, document_id, file_url, public_id, provider, mime_type, size_bytes, width, height, created_at)
            VALUES (?, ?, ?, ?, 'local', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&document_id)
        .bind(&asset.url)
        .bind(&asset.public_id)
        .bind(&file.mime_type)
        .bind(asset.bytes)
        .bind(asset.width)
        .bind(asset.height)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let ingest_status = if aggregated.trim().is_empty() {
        IngestStatus::AssetsUploaded
    } else {
        IngestStatus::Queued
    };

    info!(
        document_id = %document_id,
        assets = stored_assets.len(),
        status = ingest_status.as_str(),
        "document ingested"
    );

    Ok(IngestOutcome {
        document_id,
        asset_count: stored_assets.len(),
        ingest_status,
    })
}

#[derive(Debug, Clone)]
pub struct EmbedOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub model: Option<String>,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 150,
            model: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbedOutcome {
    pub chunk_count: usize,
}

/// Serializes embed runs per document id.
#[derive(Default)]
pub struct EmbedLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl EmbedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    async fn acquire(&self, document_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(document_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Phase 2: delete existing chunks, re-chunk, embed, and persist.
///
/// An embedding failure aborts the remaining chunks for this call;
/// already-committed chunks are not rolled back.
pub async fn embed_document(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    locks: &EmbedLocks,
    document_id: &str,
    options: &EmbedOptions,
) -> Result<EmbedOutcome> {
    let _guard = locks.acquire(document_id).await;

    let row: Option<(String,)> = sqlx::query_as("SELECT content FROM documents WHERE id = ?")
        .bind(document_id)
        .fetch_optional(pool)
        .await?;

    let content = match row {
        Some((content,)) => content,
        None => return Err(AdvisorError::NotFound(format!("document {document_id}"))),
    };

    if content.trim().is_empty() {
        return Err(AdvisorError::InvalidState(
            "document content is empty; upload text-based files first".to_string(),
        ));
    }

    let chunk_size = options.chunk_size.max(MIN_CHUNK_SIZE);
    let overlap = options.overlap.min(chunk_size - 1);

    let chunks = chunk_text(&content, chunk_size, overlap);
    if chunks.is_empty() {
        return Err(AdvisorError::InvalidState(
            "unable to chunk document content".to_string(),
        ));
    }

    // Idempotent re-embedding: drop the previous chunk set first.
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(pool)
        .await?;

    let now = chrono::Utc::now().timestamp();

    for chunk in &chunks {
        let vector = embedder.embed(chunk, options.model.as_deref()).await?;

        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_text, embedding, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(document_id)
        .bind(chunk)
        .bind(vec_to_blob(&vector))
        .bind(now)
        .execute(pool)
        .await?;
    }

    sqlx::query("UPDATE documents SET updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(document_id)
        .execute(pool)
        .await?;

    info!(document_id = %document_id, chunks = chunks.len(), "document embedded");

    Ok(EmbedOutcome {
        chunk_count: chunks.len(),
    })
}
