//! Core data models used throughout the advisor pipeline.
//!
//! Persisted entities mirror the SQLite schema in [`crate::migrate`];
//! [`RetrievalHit`] is ephemeral and produced per query, never stored.
//!
//! The closed enumerations ([`DocumentStatus`], [`RoutineStatus`],
//! [`TimeOfDay`], [`Frequency`]) each carry a single parse/normalize
//! function used uniformly by ingestion, generation, and lifecycle
//! management, so enum validation lives in exactly one place.

use crate::error::AdvisorError;

/// Domain document whose content feeds the vector store.
/// Content stays mutable until chunked.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub source: Option<String>,
    pub status: DocumentStatus,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Reference to an uploaded binary stored by the asset service.
#[derive(Debug, Clone)]
pub struct DocumentAsset {
    pub id: String,
    pub document_id: String,
    pub file_url: String,
    pub public_id: String,
    pub provider: String,
    pub mime_type: Option<String>,
    pub size_bytes: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub created_at: i64,
}

/// A bounded slice of document text with its embedding vector.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_text: String,
    pub embedding: Vec<f32>,
    pub created_at: i64,
}

/// Ranked retrieval result. Ephemeral; `score` is always in [0, 1].
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub chunk_id: String,
    pub document_id: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub content: String,
    pub score: f64,
    pub asset_urls: Vec<String>,
}

/// Immutable record of one generation call, including the raw structured
/// result as an audit trail.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub message_id: Option<String>,
    pub raw_input: String,
    pub result: String,
    pub confidence: Option<f64>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct Routine {
    pub id: String,
    pub user_id: String,
    pub analysis_id: Option<String>,
    pub parent_id: Option<String>,
    pub description: String,
    pub target_skin_type: Option<String>,
    pub target_conditions: Option<String>,
    pub status: RoutineStatus,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One step of a routine. Steps are replaced as a whole set on update,
/// never partially patched; `step_order` is dense from 1.
#[derive(Debug, Clone)]
pub struct RoutineStep {
    pub id: String,
    pub routine_id: String,
    pub step_order: i64,
    pub instruction: String,
    pub time_of_day: TimeOfDay,
    pub frequency: Frequency,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub role: MessageRole,
    pub content: String,
    pub image_url: Option<String>,
    pub message_type: String,
    pub created_at: i64,
}

// ============ Closed enumerations ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Active,
    Inactive,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Active => "active",
            DocumentStatus::Inactive => "inactive",
        }
    }

    /// Strict parse; empty/None defaults to active, anything else is rejected.
    pub fn parse(value: Option<&str>) -> Result<Self, AdvisorError> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") => Ok(DocumentStatus::Active),
            Some("active") => Ok(DocumentStatus::Active),
            Some("inactive") => Ok(DocumentStatus::Inactive),
            Some(other) => Err(AdvisorError::InvalidInput(format!(
                "status must be 'active' or 'inactive', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineStatus {
    Draft,
    Published,
    Archived,
}

impl RoutineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineStatus::Draft => "draft",
            RoutineStatus::Published => "published",
            RoutineStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AdvisorError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(RoutineStatus::Draft),
            "published" => Ok(RoutineStatus::Published),
            "archived" => Ok(RoutineStatus::Archived),
            other => Err(AdvisorError::InvalidInput(format!(
                "status must be draft, published, or archived, got '{other}'"
            ))),
        }
    }

    /// For reading stored rows; unknown values are treated as draft rather
    /// than failing the read.
    pub fn from_stored(value: &str) -> Self {
        Self::parse(value).unwrap_or(RoutineStatus::Draft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Evening,
    Both,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Both => "both",
        }
    }

    /// Lenient normalization: unrecognized or missing values map to `both`.
    /// Provider output must never fail a request on a bad enum value.
    pub fn normalize(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("morning") => TimeOfDay::Morning,
            Some("evening") => TimeOfDay::Evening,
            _ => TimeOfDay::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    TwiceDaily,
    Weekly,
    AsNeeded,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::TwiceDaily => "twice_daily",
            Frequency::Weekly => "weekly",
            Frequency::AsNeeded => "as_needed",
        }
    }

    /// Lenient normalization: unrecognized or missing values map to `daily`.
    pub fn normalize(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("daily") => Frequency::Daily,
            Some("twice_daily") => Frequency::TwiceDaily,
            Some("weekly") => Frequency::Weekly,
            Some("as_needed") => Frequency::AsNeeded,
            _ => Frequency::Daily,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Message type derived from which parts of the turn are present.
pub fn message_type(has_text: bool, has_image: bool) -> &'static str {
    match (has_text, has_image) {
        (true, true) => "mixed",
        (false, true) => "image",
        _ => "text",
    }
}
