//! Vector retriever.
//!
//! Embeds a query and ranks stored chunk vectors by cosine distance,
//! restricted to chunks of `active` documents and an optional document-id
//! allow-list or source-tag filter. Similarity scores are derived as
//! `max(0, 1 − distance)` so they always land in [0, 1].
//!
//! Retrieval failure must never block the generation step: any upstream or
//! storage error degrades to an empty hit list and the pipeline proceeds
//! with zero context.

use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::embedding::{blob_to_vec, cosine_similarity, EmbeddingClient};
use crate::error::Result;
use crate::models::RetrievalHit;

const MIN_K: i64 = 1;
const MAX_K: i64 = 50;

/// Optional restrictions applied to the similarity query.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub doc_ids: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
}

/// Ranked nearest-neighbor search over stored chunk vectors.
///
/// Returns an empty list on any failure; the error is logged, not raised.
pub async fn search(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    query: &str,
    k: i64,
    filter: &SearchFilter,
    model: Option<&str>,
) -> Vec<RetrievalHit> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    match search_inner(pool, embedder, query, k, filter, model).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "retrieval degraded to empty hit list");
            Vec::new()
        }
    }
}

async fn search_inner(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    query: &str,
    k: i64,
    filter: &SearchFilter,
    model: Option<&str>,
) -> Result<Vec<RetrievalHit>> {
    let k = k.clamp(MIN_K, MAX_K);

    let query_vec = embedder.embed(query, model).await?;

    let mut sql = String::from(
        r#"
        SELECT c.id AS chunk_id, c.document_id, c.chunk_text, c.embedding,
               d.title, d.source
        FROM chunks c
        JOIN documents d ON d.id = c.document_id
        WHERE d.status = 'active'
        "#,
    );

    if let Some(ref doc_ids) = filter.doc_ids {
        if doc_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; doc_ids.len()].join(", ");
        sql.push_str(&format!(" AND c.document_id IN ({placeholders})"));
    }
    if let Some(ref sources) = filter.sources {
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; sources.len()].join(", ");
        sql.push_str(&format!(" AND d.source IN ({placeholders})"));
    }

    let mut db_query = sqlx::query(&sql);
    if let Some(ref doc_ids) = filter.doc_ids {
        for id in doc_ids {
            db_query = db_query.bind(id);
        }
    }
    if let Some(ref sources) = filter.sources {
        for source in sources {
            db_query = db_query.bind(source);
        }
    }

    let rows = db_query.fetch_all(pool).await?;

    struct Scored {
        chunk_id: String,
        document_id: String,
        title: Option<String>,
        source: Option<String>,
        content: String,
        distance: f64,
    }

    let mut scored: Vec<Scored> = rows
        .iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            let vec = blob_to_vec(&blob);
            let distance = 1.0 - cosine_similarity(&query_vec, &vec) as f64;
            Scored {
                chunk_id: row.get("chunk_id"),
                document_id: row.get("document_id"),
                title: row.get("title"),
                source: row.get("source"),
                content: row.get("chunk_text"),
                distance,
            }
        })
        .collect();

    // Ascending distance: most similar first.
    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k as usize);

    let mut hits = Vec::with_capacity(scored.len());
    for item in scored {
        let asset_urls = fetch_asset_urls(pool, &item.document_id).await?;
        hits.push(RetrievalHit {
            chunk_id: item.chunk_id,
            document_id: item.document_id,
            title: item.title,
            source: item.source,
            content: item.content,
            score: (1.0 - item.distance).max(0.0),
            asset_urls,
        });
    }

    Ok(hits)
}

/// Up to 3 most recent asset URLs for a document.
async fn fetch_asset_urls(pool: &SqlitePool, document_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT file_url FROM document_assets
        WHERE document_id = ?
        ORDER BY created_at DESC
        LIMIT 3
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get("file_url")).collect())
}
