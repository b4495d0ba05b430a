//! # Derm Advisor
//!
//! A retrieval-augmented skincare consultation engine.
//!
//! Derm Advisor ingests reference documents (guidelines, FAQs, product
//! sheets), chunks and embeds them into a local SQLite vector store, and
//! answers user consultations by retrieving relevant knowledge and asking
//! a schema-constrained generative model for a structured analysis. Every
//! analysis is validated before persistence: a medical disclaimer is always
//! present, confidence is clamped, and generated routines come out with
//! densely ordered steps.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │ Ingest    │──▶│ Chunk+Embed │──▶│  SQLite   │
//! │ txt/pdf/ │   │             │   │ vectors  │
//! │ docx     │   └─────────────┘   └────┬─────┘
//! └──────────┘                          │
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │ Retrieve  │──────▶│ Generate  │
//!              │ (cosine) │       │ +Validate│
//!              └──────────┘       └────┬─────┘
//!                                      ▼
//!                                 ┌──────────┐
//!                                 │ Persist   │
//!                                 │ (one tx) │
//!                                 └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! derm init                          # create database
//! derm ingest --title "SPF guide" guide.pdf
//! derm embed <document-id>           # chunk + embed
//! derm search "sunscreen for oily skin"
//! derm consult --user u1 --text "my skin is dry and itchy"
//! derm routine generate --user u1 --query "evening routine for acne"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and closed enumerations |
//! | [`chunk`] | Sentence-aware text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Schema-constrained chat completion |
//! | [`extract`] | Plain-text extraction from uploads |
//! | [`assets`] | Binary asset storage |
//! | [`ingest`] | Document ingestion and embedding pipeline |
//! | [`retrieve`] | Cosine-similarity vector retrieval |
//! | [`context`] | Context block assembly |
//! | [`generate`] | Generation orchestration and validation |
//! | [`persist`] | Transactional multi-entity persistence |
//! | [`routine`] | Routine lifecycle management |
//! | [`sessions`] | Chat session anchors |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod assets;
pub mod chunk;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod persist;
pub mod retrieve;
pub mod routine;
pub mod sessions;
