//! End-to-end pipeline tests over an in-memory SQLite database.
//!
//! Covers ingest → embed → search, retrieval degradation, generation
//! validation on the persisted path, transactional rollback, and the
//! routine lifecycle. Provider boundaries are replaced with deterministic
//! stubs so every assertion is reproducible offline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tempfile::TempDir;
use uuid::Uuid;

use derm_advisor::assets::{AssetStore, LocalAssetStore, StoredAsset, UploadFile};
use derm_advisor::config::{Config, DbConfig};
use derm_advisor::context::{assemble_context, NO_KNOWLEDGE_SENTINEL};
use derm_advisor::embedding::{vec_to_blob, EmbeddingClient};
use derm_advisor::error::{AdvisorError, Result};
use derm_advisor::generate::{
    self, AnalysisDraft, Recommendation, RoutineDraft, RoutineStepDraft, DISCLAIMER_TEXT,
};
use derm_advisor::ingest::{self, EmbedLocks, EmbedOptions, IngestRequest, IngestStatus};
use derm_advisor::llm::GenerativeClient;
use derm_advisor::migrate::run_migrations;
use derm_advisor::models::{Frequency, MessageRole, RoutineStatus, TimeOfDay};
use derm_advisor::persist;
use derm_advisor::retrieve::{search, SearchFilter};
use derm_advisor::{routine, sessions};

/// Single connection so every query sees the same in-memory database.
async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

fn test_config() -> Config {
    Config {
        db: DbConfig {
            path: "unused.sqlite".into(),
        },
        chunking: Default::default(),
        retrieval: Default::default(),
        openai: Default::default(),
        assets: Default::default(),
    }
}

/// Keyword-counting embedder: axis 0 tracks "sun", axis 1 tracks "ret".
struct StubEmbedder;

#[async_trait]
impl EmbeddingClient for StubEmbedder {
    async fn embed(&self, text: &str, _model: Option<&str>) -> Result<Vec<f32>> {
        let sun = text.matches("sun").count() as f32;
        let ret = text.matches("ret").count() as f32;
        Ok(vec![sun + 0.01, ret + 0.01])
    }

    fn dims(&self) -> usize {
        2
    }
}

/// Fails after a fixed number of successful calls.
struct FlakyEmbedder {
    calls: AtomicUsize,
    fail_after: usize,
}

#[async_trait]
impl EmbeddingClient for FlakyEmbedder {
    async fn embed(&self, _text: &str, _model: Option<&str>) -> Result<Vec<f32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_after {
            Err(AdvisorError::UpstreamUnavailable("provider down".into()))
        } else {
            Ok(vec![1.0, 0.0])
        }
    }

    fn dims(&self) -> usize {
        2
    }
}

struct CannedLlm(String);

#[async_trait]
impl GenerativeClient for CannedLlm {
    async fn complete_json(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _schema: &serde_json::Value,
        _model: Option<&str>,
    ) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct FailingLlm;

#[async_trait]
impl GenerativeClient for FailingLlm {
    async fn complete_json(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _schema: &serde_json::Value,
        _model: Option<&str>,
    ) -> Result<String> {
        Err(AdvisorError::UpstreamUnavailable("provider down".into()))
    }
}

/// In-memory store that records deletions and fails after a fixed number
/// of successful uploads.
struct RecordingStore {
    uploads: AtomicUsize,
    fail_after: usize,
    deleted: Mutex<Vec<String>>,
}

impl RecordingStore {
    fn failing_after(fail_after: usize) -> Self {
        Self {
            uploads: AtomicUsize::new(0),
            fail_after,
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AssetStore for RecordingStore {
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredAsset> {
        let call = self.uploads.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_after {
            return Err(AdvisorError::UpstreamUnavailable("store down".into()));
        }
        Ok(StoredAsset {
            url: format!("mem://{folder}/{}", file.name),
            public_id: format!("{folder}/{}", file.name),
            bytes: file.bytes.len() as i64,
            width: None,
            height: None,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

async fn insert_document(pool: &SqlitePool, status: &str, source: Option<&str>) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO documents (id, title, source, status, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, 0)",
    )
    .bind(&id)
    .bind(format!("doc {id}"))
    .bind(source)
    .bind(status)
    .bind("placeholder content")
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn insert_chunk(pool: &SqlitePool, document_id: &str, text: &str, vector: &[f32]) {
    sqlx::query(
        "INSERT INTO chunks (id, document_id, chunk_text, embedding, created_at) \
         VALUES (?, ?, ?, ?, 0)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(document_id)
    .bind(text)
    .bind(vec_to_blob(vector))
    .execute(pool)
    .await
    .unwrap();
}

async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
        .get("n")
}

// ============ Ingest and embed ============

#[tokio::test]
async fn ingest_then_embed_then_search() {
    let pool = test_pool().await;
    let assets_dir = TempDir::new().unwrap();
    let store = LocalAssetStore::new(assets_dir.path().to_path_buf());

    let text = "Apply sunscreen every morning. Reapply sunscreen after swimming. \
                Sunscreen protects against sun damage."
        .repeat(3);
    let outcome = ingest::ingest_document(
        &pool,
        &store,
        IngestRequest {
            title: "Sunscreen guide".into(),
            source: Some("faq".into()),
            status: None,
            files: vec![UploadFile {
                name: "guide.txt".into(),
                mime_type: Some("text/plain".into()),
                bytes: text.into_bytes(),
            }],
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome.asset_count, 1);
    assert_eq!(outcome.ingest_status, IngestStatus::Queued);
    assert_eq!(count_rows(&pool, "documents").await, 1);
    assert_eq!(count_rows(&pool, "document_assets").await, 1);

    let locks = EmbedLocks::new();
    let embed = ingest::embed_document(
        &pool,
        &StubEmbedder,
        &locks,
        &outcome.document_id,
        &EmbedOptions::default(),
    )
    .await
    .unwrap();
    assert!(embed.chunk_count >= 1);
    assert_eq!(count_rows(&pool, "chunks").await, embed.chunk_count as i64);

    let hits = search(
        &pool,
        &StubEmbedder,
        "sunscreen advice",
        5,
        &SearchFilter::default(),
        None,
    )
    .await;
    assert!(!hits.is_empty());
    assert_eq!(hits[0].document_id, outcome.document_id);
    assert_eq!(hits[0].asset_urls.len(), 1);
}

#[tokio::test]
async fn ingest_rejects_missing_title_and_empty_files() {
    let pool = test_pool().await;
    let assets_dir = TempDir::new().unwrap();
    let store = LocalAssetStore::new(assets_dir.path().to_path_buf());

    let err = ingest::ingest_document(
        &pool,
        &store,
        IngestRequest {
            title: "   ".into(),
            source: None,
            status: None,
            files: vec![],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let err = ingest::ingest_document(
        &pool,
        &store,
        IngestRequest {
            title: "ok".into(),
            source: None,
            status: None,
            files: vec![UploadFile {
                name: "empty.txt".into(),
                mime_type: None,
                bytes: vec![],
            }],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(count_rows(&pool, "documents").await, 0);
}

#[tokio::test]
async fn failed_ingest_deletes_already_stored_assets() {
    let pool = test_pool().await;
    let store = RecordingStore::failing_after(1);

    let err = ingest::ingest_document(
        &pool,
        &store,
        IngestRequest {
            title: "two files".into(),
            source: None,
            status: None,
            files: vec![
                UploadFile {
                    name: "first.txt".into(),
                    mime_type: Some("text/plain".into()),
                    bytes: b"sun advice".to_vec(),
                },
                UploadFile {
                    name: "second.txt".into(),
                    mime_type: Some("text/plain".into()),
                    bytes: b"more advice".to_vec(),
                },
            ],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "upstream_unavailable");

    let deleted = store.deleted.lock().unwrap().clone();
    assert_eq!(deleted, vec!["documents/first.txt".to_string()]);
    assert_eq!(count_rows(&pool, "documents").await, 0);
    assert_eq!(count_rows(&pool, "document_assets").await, 0);
}

#[tokio::test]
async fn embed_failure_keeps_already_written_chunks() {
    let pool = test_pool().await;
    // Enough sentences for several 200-char chunks.
    let content = "The sun rises over the clinic every single day without fail. ".repeat(12);
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO documents (id, title, source, status, content, created_at, updated_at) \
         VALUES (?, 'doc', NULL, 'active', ?, 0, 0)",
    )
    .bind(&id)
    .bind(&content)
    .execute(&pool)
    .await
    .unwrap();

    let locks = EmbedLocks::new();
    let embedder = FlakyEmbedder {
        calls: AtomicUsize::new(0),
        fail_after: 1,
    };
    let err = ingest::embed_document(
        &pool,
        &embedder,
        &locks,
        &id,
        &EmbedOptions {
            chunk_size: 200,
            overlap: 20,
            model: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "upstream_unavailable");
    assert_eq!(count_rows(&pool, "chunks").await, 1);
}

// ============ Retrieval ============

#[tokio::test]
async fn search_scores_bounded_and_non_increasing() {
    let pool = test_pool().await;
    let doc = insert_document(&pool, "active", Some("faq")).await;
    insert_chunk(&pool, &doc, "about sun", &[5.0, 0.1]).await;
    insert_chunk(&pool, &doc, "about ret", &[0.1, 5.0]).await;
    insert_chunk(&pool, &doc, "mixed", &[1.0, 1.0]).await;

    let hits = search(&pool, &StubEmbedder, "sun sun", 10, &SearchFilter::default(), None).await;
    assert_eq!(hits.len(), 3);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for hit in &hits {
        assert!(hit.score >= 0.0 && hit.score <= 1.0);
    }
    assert_eq!(hits[0].content, "about sun");
}

#[tokio::test]
async fn search_excludes_inactive_and_untrusted_documents() {
    let pool = test_pool().await;
    let inactive = insert_document(&pool, "inactive", Some("faq")).await;
    insert_chunk(&pool, &inactive, "hidden sun text", &[5.0, 0.1]).await;
    let untagged = insert_document(&pool, "active", Some("blog")).await;
    insert_chunk(&pool, &untagged, "blog sun text", &[5.0, 0.1]).await;

    let filter = SearchFilter {
        doc_ids: None,
        sources: Some(vec!["guideline:vn-2024".into(), "faq".into()]),
    };
    let hits = search(&pool, &StubEmbedder, "sun", 10, &filter, None).await;
    assert!(hits.is_empty());

    let context = assemble_context(&hits, 3500);
    assert_eq!(context, NO_KNOWLEDGE_SENTINEL);
}

#[tokio::test]
async fn search_degrades_to_empty_on_embedder_failure() {
    let pool = test_pool().await;
    let doc = insert_document(&pool, "active", None).await;
    insert_chunk(&pool, &doc, "some sun text", &[1.0, 0.0]).await;

    let embedder = FlakyEmbedder {
        calls: AtomicUsize::new(0),
        fail_after: 0,
    };
    let hits = search(&pool, &embedder, "sun", 10, &SearchFilter::default(), None).await;
    assert!(hits.is_empty());
}

#[tokio::test]
async fn search_clamps_k() {
    let pool = test_pool().await;
    let doc = insert_document(&pool, "active", None).await;
    for i in 0..3 {
        insert_chunk(&pool, &doc, &format!("sun text {i}"), &[1.0, 0.1 * i as f32]).await;
    }

    let hits = search(&pool, &StubEmbedder, "sun", -5, &SearchFilter::default(), None).await;
    assert_eq!(hits.len(), 1);
    let hits = search(&pool, &StubEmbedder, "sun", 500, &SearchFilter::default(), None).await;
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn doc_id_filter_restricts_hits_and_keeps_status_gate() {
    let pool = test_pool().await;
    let inactive = insert_document(&pool, "inactive", Some("faq")).await;
    insert_chunk(&pool, &inactive, "sun care basics", &[5.0, 0.1]).await;
    let active = insert_document(&pool, "active", Some("faq")).await;
    insert_chunk(&pool, &active, "more sun advice", &[5.0, 0.1]).await;

    // Restricting to an inactive document yields nothing, and context
    // assembly falls back to the sentinel.
    let filter = SearchFilter {
        doc_ids: Some(vec![inactive.clone()]),
        sources: None,
    };
    let hits = search(&pool, &StubEmbedder, "sun", 10, &filter, None).await;
    assert!(hits.is_empty());
    assert_eq!(assemble_context(&hits, 3500), NO_KNOWLEDGE_SENTINEL);

    // Restricting to the active document excludes everything else.
    let filter = SearchFilter {
        doc_ids: Some(vec![active.clone()]),
        sources: None,
    };
    let hits = search(&pool, &StubEmbedder, "sun", 10, &filter, None).await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document_id, active);
}

// ============ Generation and persistence ============

#[tokio::test]
async fn consultation_persists_validated_result() {
    let pool = test_pool().await;
    let cfg = test_config();
    let raw = r#"{
        "summary": "Signs of dehydration",
        "confidence": 1.4,
        "recommendations": [
            {"type": "product", "title": "Moisturizer", "details": "Use nightly"}
        ],
        "routine": {
            "description": "Evening repair routine",
            "target_skin_type": "dry",
            "target_conditions": ["dehydration"],
            "steps": [
                {"order": 5, "instruction": "Moisturize", "time_of_day": "evening", "frequency": "daily"},
                {"order": 2, "instruction": "Cleanse", "time_of_day": "evening", "frequency": "daily"}
            ]
        }
    }"#;

    let outcome = generate::run_consultation(
        &pool,
        &StubEmbedder,
        &CannedLlm(raw.to_string()),
        &cfg,
        "user-1",
        "my skin feels tight and flaky",
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.confidence, Some(1.0));
    assert!(outcome.reply.contains("Moisturizer"));
    assert!(outcome.reply.contains(DISCLAIMER_TEXT));

    assert_eq!(count_rows(&pool, "chat_sessions").await, 1);
    assert_eq!(count_rows(&pool, "chat_messages").await, 2);
    assert_eq!(count_rows(&pool, "analyses").await, 1);
    assert_eq!(count_rows(&pool, "routines").await, 1);

    let stored_confidence: Option<f64> = sqlx::query("SELECT confidence FROM analyses")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("confidence");
    assert_eq!(stored_confidence, Some(1.0));

    let routine_id = outcome.routine_id.unwrap();
    let (stored, steps) = routine::fetch_routine(&pool, &routine_id).await.unwrap();
    assert_eq!(stored.status, RoutineStatus::Draft);
    assert_eq!(stored.version, 1);
    let orders: Vec<i64> = steps.iter().map(|s| s.step_order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(steps[0].instruction, "Cleanse");
}

#[tokio::test]
async fn consultation_provider_failure_writes_nothing() {
    let pool = test_pool().await;
    let cfg = test_config();

    let err = generate::run_consultation(
        &pool,
        &StubEmbedder,
        &FailingLlm,
        &cfg,
        "user-1",
        "my skin itches",
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "upstream_unavailable");

    assert_eq!(count_rows(&pool, "chat_sessions").await, 0);
    assert_eq!(count_rows(&pool, "chat_messages").await, 0);
    assert_eq!(count_rows(&pool, "analyses").await, 0);
}

#[tokio::test]
async fn failed_persistence_rolls_back_every_row() {
    let pool = test_pool().await;
    // Duplicate step orders violate UNIQUE(routine_id, step_order) mid-write.
    let draft = AnalysisDraft {
        summary: "s".into(),
        recommendations: vec![Recommendation {
            kind: "disclaimer".into(),
            title: "Note".into(),
            details: DISCLAIMER_TEXT.into(),
        }],
        routine: Some(RoutineDraft {
            description: "d".into(),
            target_skin_type: None,
            target_conditions: vec![],
            steps: vec![
                RoutineStepDraft {
                    order: 1,
                    instruction: "a".into(),
                    time_of_day: TimeOfDay::Morning,
                    frequency: Frequency::Daily,
                },
                RoutineStepDraft {
                    order: 1,
                    instruction: "b".into(),
                    time_of_day: TimeOfDay::Evening,
                    frequency: Frequency::Daily,
                },
            ],
        }),
        confidence: Some(0.5),
        raw: "{}".into(),
    };

    let err = persist::persist_consultation(&pool, "user-1", "hello", None, &draft, "reply")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_failure");

    for table in [
        "chat_sessions",
        "chat_messages",
        "analyses",
        "routines",
        "routine_steps",
    ] {
        assert_eq!(count_rows(&pool, table).await, 0, "{table} not empty");
    }
}

#[tokio::test]
async fn chat_turn_requires_session_and_content() {
    let pool = test_pool().await;
    let cfg = test_config();

    let err = generate::run_chat_turn(
        &pool,
        &StubEmbedder,
        &CannedLlm("{}".into()),
        &cfg,
        "missing-session",
        "user-1",
        "",
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let err = generate::run_chat_turn(
        &pool,
        &StubEmbedder,
        &CannedLlm("{}".into()),
        &cfg,
        "missing-session",
        "user-1",
        "hello",
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn chat_turn_persists_both_messages() {
    let pool = test_pool().await;
    let cfg = test_config();
    let session = sessions::create_session(&pool, "user-1", Some("dry skin"))
        .await
        .unwrap();

    let raw = r#"{"summary":"ok","recommendations":[],"confidence":"0.6"}"#;
    let outcome = generate::run_chat_turn(
        &pool,
        &StubEmbedder,
        &CannedLlm(raw.to_string()),
        &cfg,
        &session.id,
        "user-1",
        "it itches at night",
        Some("file://images/cheek.jpg"),
    )
    .await
    .unwrap();

    assert_eq!(outcome.session_id, session.id);
    assert_eq!(outcome.confidence, Some(0.6));
    assert!(outcome.routine_id.is_none());

    let messages = sessions::list_messages(&pool, &session.id).await.unwrap();
    assert_eq!(messages.len(), 2);
    let user_msg = messages.iter().find(|m| m.role == MessageRole::User).unwrap();
    let assistant_msg = messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant)
        .unwrap();
    assert_eq!(user_msg.message_type, "mixed");
    assert_eq!(assistant_msg.content, outcome.reply);
}

#[tokio::test]
async fn chat_turn_rejects_another_users_session() {
    let pool = test_pool().await;
    let cfg = test_config();
    let session = sessions::create_session(&pool, "user-1", Some("dry skin"))
        .await
        .unwrap();

    let raw = r#"{"summary":"ok","recommendations":[]}"#;
    let err = generate::run_chat_turn(
        &pool,
        &StubEmbedder,
        &CannedLlm(raw.to_string()),
        &cfg,
        &session.id,
        "user-2",
        "hello",
        None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert_eq!(count_rows(&pool, "chat_messages").await, 0);
    assert_eq!(count_rows(&pool, "analyses").await, 0);
}

// ============ Routine lifecycle ============

fn sample_draft() -> RoutineDraft {
    RoutineDraft {
        description: "morning basics".into(),
        target_skin_type: Some("oily".into()),
        target_conditions: vec!["acne".into()],
        steps: vec![RoutineStepDraft {
            order: 1,
            instruction: "Cleanse".into(),
            time_of_day: TimeOfDay::Morning,
            frequency: Frequency::Daily,
        }],
    }
}

#[tokio::test]
async fn routine_publish_and_archive_transitions() {
    let pool = test_pool().await;
    let id = routine::save_draft(&pool, "user-1", &sample_draft()).await.unwrap();

    routine::publish_routine(&pool, &id).await.unwrap();
    let (stored, _) = routine::fetch_routine(&pool, &id).await.unwrap();
    assert_eq!(stored.status, RoutineStatus::Published);

    // Republishing a published routine is allowed.
    routine::publish_routine(&pool, &id).await.unwrap();

    routine::archive_routine(&pool, &id).await.unwrap();
    routine::archive_routine(&pool, &id).await.unwrap();
    let (stored, _) = routine::fetch_routine(&pool, &id).await.unwrap();
    assert_eq!(stored.status, RoutineStatus::Archived);

    let err = routine::publish_routine(&pool, &id).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_state");
}

#[tokio::test]
async fn routine_update_replaces_steps_densely() {
    let pool = test_pool().await;
    let id = routine::save_draft(&pool, "user-1", &sample_draft()).await.unwrap();

    let update = routine::RoutineUpdate {
        description: Some("rebuilt".into()),
        steps: Some(vec![
            RoutineStepDraft {
                order: 99,
                instruction: "Tone".into(),
                time_of_day: TimeOfDay::Evening,
                frequency: Frequency::Daily,
            },
            RoutineStepDraft {
                order: 42,
                instruction: "Treat".into(),
                time_of_day: TimeOfDay::Evening,
                frequency: Frequency::Weekly,
            },
        ]),
        ..Default::default()
    };
    routine::update_routine(&pool, &id, &update).await.unwrap();

    let (stored, steps) = routine::fetch_routine(&pool, &id).await.unwrap();
    assert_eq!(stored.description, "rebuilt");
    let orders: Vec<i64> = steps.iter().map(|s| s.step_order).collect();
    assert_eq!(orders, vec![1, 2]);
    assert_eq!(steps[0].instruction, "Tone");
}

#[tokio::test]
async fn routine_update_validates_status() {
    let pool = test_pool().await;
    let id = routine::save_draft(&pool, "user-1", &sample_draft()).await.unwrap();

    let err = routine::update_routine(
        &pool,
        &id,
        &routine::RoutineUpdate {
            status: Some("deleted".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), "invalid_input");

    let err = routine::update_routine(&pool, "nope", &Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn routine_generation_always_yields_saveable_draft() {
    let pool = test_pool().await;
    let request = generate::RoutineRequest {
        query: "calm redness".into(),
        ..Default::default()
    };
    let draft = generate::generate_routine(&FailingLlm, &request).await;
    let id = routine::save_draft(&pool, "user-1", &draft).await.unwrap();
    let (stored, steps) = routine::fetch_routine(&pool, &id).await.unwrap();
    assert_eq!(stored.status, RoutineStatus::Draft);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_order, 1);
}
