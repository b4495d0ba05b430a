//! # Derm Advisor CLI (`derm`)
//!
//! The `derm` binary drives the full consultation pipeline: database
//! initialization, document ingestion, embedding, retrieval, chat and
//! consultation turns, and routine lifecycle management.
//!
//! ## Usage
//!
//! ```bash
//! derm --config ./config/derm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `derm init` | Create the SQLite database and run schema migrations |
//! | `derm ingest` | Upload files, extract text, create a document |
//! | `derm embed <id>` | Chunk and embed a document's content |
//! | `derm search "<query>"` | Rank stored chunks against a query |
//! | `derm chat` | Run one chat turn against a session |
//! | `derm consult` | Run a full consultation (session synthesized) |
//! | `derm routine <action>` | Generate, publish, archive, update, show routines |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use derm_advisor::assets::{LocalAssetStore, UploadFile};
use derm_advisor::embedding::OpenAiEmbeddingClient;
use derm_advisor::generate::{self, RoutineRequest, RoutineStepDraft};
use derm_advisor::ingest::{self, EmbedLocks, EmbedOptions, IngestRequest};
use derm_advisor::llm::OpenAiChatClient;
use derm_advisor::models::{Frequency, TimeOfDay};
use derm_advisor::retrieve::{self, SearchFilter};
use derm_advisor::{config, db, migrate, routine, sessions};

/// Derm Advisor CLI, a retrieval-augmented skincare consultation engine.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/derm.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "derm",
    about = "Derm Advisor - a retrieval-augmented skincare consultation engine",
    version,
    long_about = "Derm Advisor ingests reference documents into a local SQLite vector store \
    and answers skincare consultations by retrieving relevant knowledge and asking a \
    schema-constrained generative model for a validated, structured analysis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/derm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. This
    /// command is idempotent, running it multiple times is safe.
    Init,

    /// Ingest one or more files as a new document.
    ///
    /// Uploads every file to the asset store, extracts plain text from
    /// txt/md/csv/pdf/docx files, and creates the document row. Run
    /// `derm embed <id>` afterwards to make it searchable.
    Ingest {
        /// Document title.
        #[arg(long)]
        title: String,

        /// Source tag (e.g. `guideline:vn-2024`, `faq`).
        #[arg(long)]
        source: Option<String>,

        /// Document status: `active` or `inactive`. Defaults to active.
        #[arg(long)]
        status: Option<String>,

        /// Files to upload (at least one).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Chunk and embed a document's extracted content.
    ///
    /// Replaces any existing chunks for the document. Concurrent embed
    /// runs for the same document are serialized.
    Embed {
        /// Document UUID.
        id: String,

        /// Override the chunk size from config.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override the chunk overlap from config.
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Rank stored chunks against a query.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of hits to return (clamped to [1, 50]).
        #[arg(long, default_value_t = 6)]
        k: i64,

        /// Restrict hits to these source tags (repeatable).
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Restrict hits to these document ids (repeatable).
        #[arg(long = "doc")]
        doc_ids: Vec<String>,
    },

    /// Run one chat turn against an existing (or new) session.
    Chat {
        /// User id the turn belongs to.
        #[arg(long)]
        user: String,

        /// Existing session id. Omit to start a new session.
        #[arg(long)]
        session: Option<String>,

        /// Message text.
        #[arg(long, default_value = "")]
        text: String,

        /// Image reference URL attached to the message.
        #[arg(long)]
        image: Option<String>,
    },

    /// Run a full consultation. Synthesizes a session, asks for a routine
    /// in the same structured response, and persists everything in one
    /// transaction.
    Consult {
        /// User id the consultation belongs to.
        #[arg(long)]
        user: String,

        /// Skin condition description.
        #[arg(long)]
        text: String,

        /// Image reference URL.
        #[arg(long)]
        image: Option<String>,
    },

    /// Generate, publish, archive, update, or show routines.
    Routine {
        #[command(subcommand)]
        action: RoutineAction,
    },
}

/// Routine lifecycle subcommands.
#[derive(Subcommand)]
enum RoutineAction {
    /// Generate a routine draft from a free-text goal.
    ///
    /// Falls back to a deterministic single-step template if the provider
    /// is unavailable, so this always saves a draft.
    Generate {
        /// User id the routine belongs to.
        #[arg(long)]
        user: String,

        /// What the routine should achieve.
        #[arg(long)]
        query: String,

        /// Target skin type (e.g. `oily`, `dry`, `combination`).
        #[arg(long)]
        skin_type: Option<String>,

        /// Target condition (repeatable).
        #[arg(long = "condition")]
        conditions: Vec<String>,

        /// Maximum number of steps.
        #[arg(long, default_value_t = 8)]
        max_steps: usize,

        /// Image reference URL (repeatable).
        #[arg(long = "image")]
        images: Vec<String>,
    },

    /// Generate a routine draft seeded from a document file.
    ///
    /// Extracts text from the file (txt/md/csv/pdf/docx) and passes it to
    /// the provider as additional context.
    FromFile {
        /// User id the routine belongs to.
        #[arg(long)]
        user: String,

        /// What the routine should achieve.
        #[arg(long)]
        query: String,

        /// Document file to extract context from.
        file: PathBuf,

        /// Maximum number of steps.
        #[arg(long, default_value_t = 8)]
        max_steps: usize,
    },

    /// Publish a draft routine. Archived routines are rejected.
    Publish {
        /// Routine UUID.
        id: String,
    },

    /// Archive a routine. Idempotent.
    Archive {
        /// Routine UUID.
        id: String,
    },

    /// Update routine fields and optionally replace all steps.
    Update {
        /// Routine UUID.
        id: String,

        /// New description.
        #[arg(long)]
        description: Option<String>,

        /// New target skin type.
        #[arg(long)]
        skin_type: Option<String>,

        /// New target condition (repeatable, replaces the stored set).
        #[arg(long = "condition")]
        conditions: Vec<String>,

        /// New status: `draft`, `published`, or `archived`.
        #[arg(long)]
        status: Option<String>,

        /// Replacement step as `instruction|time_of_day|frequency`
        /// (repeatable; later parts optional). Replaces all stored steps.
        #[arg(long = "step", value_parser = parse_step)]
        steps: Vec<RoutineStepDraft>,
    },

    /// Print a routine with its steps.
    Show {
        /// Routine UUID.
        id: String,
    },
}

/// Parse `instruction|time_of_day|frequency` into a step draft.
fn parse_step(s: &str) -> Result<RoutineStepDraft, String> {
    let mut parts = s.splitn(3, '|');
    let instruction = parts.next().unwrap_or_default().trim().to_string();
    if instruction.is_empty() {
        return Err("step instruction must not be empty".to_string());
    }
    Ok(RoutineStepDraft {
        order: 0,
        instruction,
        time_of_day: TimeOfDay::normalize(parts.next()),
        frequency: Frequency::normalize(parts.next()),
    })
}

/// Guess a MIME type from the file extension; provider-facing only.
fn guess_mime(path: &PathBuf) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "md" | "markdown" => "text/plain",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    };
    Some(mime.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let pool = db::connect(&cfg).await?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            title,
            source,
            status,
            files,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = tokio::fs::read(path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload.bin".to_string());
                uploads.push(UploadFile {
                    mime_type: guess_mime(path),
                    name,
                    bytes,
                });
            }

            let store = LocalAssetStore::new(cfg.assets.root.clone());
            let outcome = ingest::ingest_document(
                &pool,
                &store,
                IngestRequest {
                    title,
                    source,
                    status,
                    files: uploads,
                },
            )
            .await?;
            println!("Document created: {}", outcome.document_id);
            println!(
                "  assets: {}  status: {}",
                outcome.asset_count,
                outcome.ingest_status.as_str()
            );
        }
        Commands::Embed {
            id,
            chunk_size,
            overlap,
        } => {
            let embedder = OpenAiEmbeddingClient::new(&cfg.openai)?;
            // The lock set guards concurrent embeds within one process;
            // this command runs exactly one.
            let locks = EmbedLocks::new();
            let options = EmbedOptions {
                chunk_size: chunk_size.unwrap_or(cfg.chunking.chunk_size),
                overlap: overlap.unwrap_or(cfg.chunking.overlap),
                model: None,
            };
            let outcome = ingest::embed_document(&pool, &embedder, &locks, &id, &options).await?;
            println!("Embedded {} chunks for document {}", outcome.chunk_count, id);
        }
        Commands::Search {
            query,
            k,
            sources,
            doc_ids,
        } => {
            let embedder = OpenAiEmbeddingClient::new(&cfg.openai)?;
            let filter = SearchFilter {
                doc_ids: if doc_ids.is_empty() { None } else { Some(doc_ids) },
                sources: if sources.is_empty() { None } else { Some(sources) },
            };
            let hits = retrieve::search(&pool, &embedder, &query, k, &filter, None).await;
            if hits.is_empty() {
                println!("No results.");
            }
            for (index, hit) in hits.iter().enumerate() {
                println!(
                    "{}. [{:.3}] {} ({})",
                    index + 1,
                    hit.score,
                    hit.title.as_deref().unwrap_or("(untitled)"),
                    hit.source.as_deref().unwrap_or("-")
                );
                let snippet: String = hit.content.chars().take(160).collect();
                println!("   {}", snippet.replace('\n', " "));
            }
        }
        Commands::Chat {
            user,
            session,
            text,
            image,
        } => {
            let embedder = OpenAiEmbeddingClient::new(&cfg.openai)?;
            let llm = OpenAiChatClient::new(&cfg.openai)?;

            let session_id = match session {
                Some(id) => id,
                None => {
                    let created = sessions::create_session(&pool, &user, None).await?;
                    println!("Session created: {}", created.id);
                    created.id
                }
            };

            let outcome = generate::run_chat_turn(
                &pool,
                &embedder,
                &llm,
                &cfg,
                &session_id,
                &user,
                &text,
                image.as_deref(),
            )
            .await?;
            println!("{}", outcome.reply);
            println!("analysis: {}", outcome.analysis_id);
        }
        Commands::Consult { user, text, image } => {
            let embedder = OpenAiEmbeddingClient::new(&cfg.openai)?;
            let llm = OpenAiChatClient::new(&cfg.openai)?;

            let outcome = generate::run_consultation(
                &pool,
                &embedder,
                &llm,
                &cfg,
                &user,
                &text,
                image.as_deref(),
            )
            .await?;
            println!("{}", outcome.reply);
            println!("session: {}", outcome.session_id);
            println!("analysis: {}", outcome.analysis_id);
            if let Some(routine_id) = outcome.routine_id {
                println!("routine: {routine_id} (draft)");
            }
        }
        Commands::Routine { action } => match action {
            RoutineAction::Generate {
                user,
                query,
                skin_type,
                conditions,
                max_steps,
                images,
            } => {
                let llm = OpenAiChatClient::new(&cfg.openai)?;
                let request = RoutineRequest {
                    query,
                    target_skin_type: skin_type,
                    target_conditions: conditions,
                    max_steps,
                    image_urls: images,
                    additional_context: None,
                };
                let draft = generate::generate_routine(&llm, &request).await;
                let id = routine::save_draft(&pool, &user, &draft).await?;
                println!("Routine draft saved: {id}");
                print_steps(&draft.steps);
            }
            RoutineAction::FromFile {
                user,
                query,
                file,
                max_steps,
            } => {
                let llm = OpenAiChatClient::new(&cfg.openai)?;
                let bytes = tokio::fs::read(&file).await?;
                let name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let request = RoutineRequest {
                    query,
                    max_steps,
                    ..Default::default()
                };
                let draft =
                    generate::generate_routine_from_upload(&llm, &request, &name, &bytes).await;
                let id = routine::save_draft(&pool, &user, &draft).await?;
                println!("Routine draft saved: {id}");
                print_steps(&draft.steps);
            }
            RoutineAction::Publish { id } => {
                routine::publish_routine(&pool, &id).await?;
                println!("Routine {id} published.");
            }
            RoutineAction::Archive { id } => {
                routine::archive_routine(&pool, &id).await?;
                println!("Routine {id} archived.");
            }
            RoutineAction::Update {
                id,
                description,
                skin_type,
                conditions,
                status,
                steps,
            } => {
                let update = routine::RoutineUpdate {
                    description,
                    target_skin_type: skin_type,
                    target_conditions: if conditions.is_empty() {
                        None
                    } else {
                        Some(conditions)
                    },
                    status,
                    steps: if steps.is_empty() { None } else { Some(steps) },
                };
                routine::update_routine(&pool, &id, &update).await?;
                println!("Routine {id} updated.");
            }
            RoutineAction::Show { id } => {
                let (routine, steps) = routine::fetch_routine(&pool, &id).await?;
                println!("{} (v{}, {})", routine.id, routine.version, routine.status.as_str());
                println!("{}", routine.description);
                if let Some(skin_type) = routine.target_skin_type {
                    println!("target skin type: {skin_type}");
                }
                if let Some(conditions) = routine.target_conditions {
                    println!("target conditions: {conditions}");
                }
                for step in &steps {
                    println!(
                        "  {}. {} [{} / {}]",
                        step.step_order,
                        step.instruction,
                        step.time_of_day.as_str(),
                        step.frequency.as_str()
                    );
                }
            }
        },
    }

    Ok(())
}

fn print_steps(steps: &[RoutineStepDraft]) {
    for step in steps {
        println!(
            "  {}. {} [{} / {}]",
            step.order,
            step.instruction,
            step.time_of_day.as_str(),
            step.frequency.as_str()
        );
    }
}
