//! Generation orchestrator.
//!
//! Turns retrieved context plus the user's message into a validated
//! [`AnalysisDraft`] through a schema-constrained provider call. All
//! provider output passes through [`parse_analysis`], which enforces the
//! invariants the provider cannot be trusted with: a disclaimer
//! recommendation is always present, confidence is clamped to [0, 1], and
//! routine steps come out densely ordered from 1.
//!
//! Chat and consultation turns treat provider failure as fatal. Routine
//! generation does not: it falls back to a deterministic single-step
//! template so the caller always receives a usable draft.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::context::assemble_context;
use crate::embedding::EmbeddingClient;
use crate::error::{AdvisorError, Result};
use crate::extract;
use crate::llm::GenerativeClient;
use crate::models::{Frequency, TimeOfDay};
use crate::persist::{self, PersistedTurn};
use crate::retrieve::{search, SearchFilter};

pub const DISCLAIMER_KIND: &str = "disclaimer";
pub const DISCLAIMER_TITLE: &str = "Medical disclaimer";
pub const DISCLAIMER_TEXT: &str =
    "Please consult a dermatologist if the condition persists or worsens.";

const CHAT_SYSTEM_PROMPT: &str = "You are a licensed skincare consultant. Produce \
evidence-based, empathetic advice using only the provided knowledge snippets. Always \
include a clear disclaimer reminding the user to consult a healthcare professional \
when symptoms persist or worsen. Output valid JSON only.";

const ROUTINE_SYSTEM_PROMPT: &str = "You are a dermatology expert. Use public medical \
knowledge and the user's description (including any referenced images) to propose a \
sensible skincare routine. Always note that this does not replace professional \
medical advice.";

const FALLBACK_STEP_INSTRUCTION: &str =
    "Cleanse gently, apply a balanced moisturizer, and use SPF 30+ sunscreen.";

/// One recommendation in an analysis result. `kind` is free-form except
/// for the reserved `disclaimer` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub kind: String,
    pub title: String,
    pub details: String,
}

/// Validated provider output. `raw` keeps the provider's JSON verbatim as
/// an audit trail; everything else is typed and normalized.
#[derive(Debug, Clone)]
pub struct AnalysisDraft {
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
    pub routine: Option<RoutineDraft>,
    pub confidence: Option<f64>,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct RoutineDraft {
    pub description: String,
    pub target_skin_type: Option<String>,
    pub target_conditions: Vec<String>,
    pub steps: Vec<RoutineStepDraft>,
}

#[derive(Debug, Clone)]
pub struct RoutineStepDraft {
    pub order: i64,
    pub instruction: String,
    pub time_of_day: TimeOfDay,
    pub frequency: Frequency,
}

/// Inputs for standalone routine generation.
#[derive(Debug, Clone)]
pub struct RoutineRequest {
    pub query: String,
    pub target_skin_type: Option<String>,
    pub target_conditions: Vec<String>,
    pub max_steps: usize,
    pub image_urls: Vec<String>,
    pub additional_context: Option<String>,
}

impl Default for RoutineRequest {
    fn default() -> Self {
        RoutineRequest {
            query: String::new(),
            target_skin_type: None,
            target_conditions: Vec::new(),
            max_steps: 8,
            image_urls: Vec::new(),
            additional_context: None,
        }
    }
}

/// Result of a persisted chat or consultation turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: String,
    pub analysis_id: String,
    pub routine_id: Option<String>,
    pub reply: String,
    pub confidence: Option<f64>,
}

// ============ Response validation ============

/// Parse and normalize a raw provider response into a typed draft.
///
/// Never trusts the provider: missing recommendations become an empty
/// list plus a synthesized disclaimer, out-of-range confidence is
/// clamped, and malformed routine steps are dropped or renumbered.
pub fn parse_analysis(raw: &str) -> Result<AnalysisDraft> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| AdvisorError::MalformedResponse(format!("response is not JSON: {e}")))?;
    let obj = value
        .as_object()
        .ok_or_else(|| AdvisorError::MalformedResponse("response is not a JSON object".into()))?;

    let summary = obj
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut recommendations = Vec::new();
    if let Some(items) = obj.get("recommendations").and_then(|v| v.as_array()) {
        for item in items {
            let Some(rec) = item.as_object() else { continue };
            let title = rec
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            if title.is_empty() {
                continue;
            }
            recommendations.push(Recommendation {
                kind: rec
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("recommendation")
                    .trim()
                    .to_ascii_lowercase(),
                title,
                details: rec
                    .get("details")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            });
        }
    }

    if !recommendations.iter().any(|r| r.kind == DISCLAIMER_KIND) {
        recommendations.push(Recommendation {
            kind: DISCLAIMER_KIND.to_string(),
            title: DISCLAIMER_TITLE.to_string(),
            details: DISCLAIMER_TEXT.to_string(),
        });
    }

    let confidence = extract_confidence(obj.get("confidence"));
    let routine = obj.get("routine").and_then(parse_routine_value);

    Ok(AnalysisDraft {
        summary,
        recommendations,
        routine,
        confidence,
        raw: raw.to_string(),
    })
}

/// Confidence tolerates numbers and string-encoded numbers; anything
/// else (including absence) is `None`. Values are clamped to [0, 1].
fn extract_confidence(value: Option<&serde_json::Value>) -> Option<f64> {
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if number.is_finite() {
        Some(number.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// A routine only survives validation with at least one usable step.
fn parse_routine_value(value: &serde_json::Value) -> Option<RoutineDraft> {
    let obj = value.as_object()?;

    let steps = parse_steps(obj.get("steps"));
    if steps.is_empty() {
        return None;
    }

    let target_conditions = obj
        .get("target_conditions")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Some(RoutineDraft {
        description: obj
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string(),
        target_skin_type: obj
            .get("target_skin_type")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        target_conditions,
        steps,
    })
}

/// Steps without an instruction are dropped. Declared orders (falling
/// back to array position) decide the sort, then orders are rewritten
/// densely from 1.
fn parse_steps(value: Option<&serde_json::Value>) -> Vec<RoutineStepDraft> {
    let Some(items) = value.and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut steps = Vec::new();
    for item in items {
        let Some(step) = item.as_object() else { continue };
        let instruction = step
            .get("instruction")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string();
        if instruction.is_empty() {
            continue;
        }
        let order = step
            .get("order")
            .and_then(|v| v.as_i64())
            .unwrap_or(steps.len() as i64 + 1);
        steps.push(RoutineStepDraft {
            order,
            instruction,
            time_of_day: TimeOfDay::normalize(step.get("time_of_day").and_then(|v| v.as_str())),
            frequency: Frequency::normalize(step.get("frequency").and_then(|v| v.as_str())),
        });
    }

    steps.sort_by_key(|s| s.order);
    for (index, step) in steps.iter_mut().enumerate() {
        step.order = index as i64 + 1;
    }
    steps
}

// ============ Prompts and schemas ============

fn analysis_schema(with_routine: bool) -> serde_json::Value {
    let mut properties = serde_json::json!({
        "summary": { "type": "string" },
        "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
        "recommendations": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "type": {
                        "type": "string",
                        "enum": ["routine", "product", "lifestyle", "warning", "disclaimer"]
                    },
                    "title": { "type": "string" },
                    "details": { "type": "string" }
                },
                "required": ["type", "title", "details"]
            },
            "minItems": 1
        }
    });
    let mut required = vec!["summary", "confidence", "recommendations"];

    if with_routine {
        properties["routine"] = routine_schema();
        required.push("routine");
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

fn routine_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "description": { "type": "string" },
            "target_skin_type": { "type": ["string", "null"] },
            "target_conditions": {
                "type": "array",
                "items": { "type": "string" }
            },
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "order": { "type": "integer", "minimum": 1 },
                        "instruction": { "type": "string" },
                        "time_of_day": {
                            "type": "string",
                            "enum": ["morning", "evening", "both"]
                        },
                        "frequency": {
                            "type": "string",
                            "enum": ["daily", "twice_daily", "weekly", "as_needed"]
                        }
                    },
                    "required": ["instruction"]
                },
                "minItems": 1
            }
        },
        "required": ["description", "steps"]
    })
}

fn build_chat_prompt(text: &str, image_url: Option<&str>, context: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("User message:\n");
    prompt.push_str(text.trim());
    prompt.push('\n');
    if let Some(url) = image_url {
        prompt.push_str("\nUser-provided image (reference only, do not describe \
dermatological details you are not certain of):\n");
        prompt.push_str(url);
        prompt.push('\n');
    }
    prompt.push_str("\nKnowledge snippets:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nRespond with JSON matching the requested schema.");
    prompt
}

fn build_routine_prompt(request: &RoutineRequest) -> String {
    let mut prompt = String::new();
    prompt.push_str("Create a skincare routine under these constraints:\n");
    prompt.push_str(&format!("- Goal: {}\n", request.query.trim()));
    if let Some(ref skin_type) = request.target_skin_type {
        prompt.push_str(&format!("- Target skin type: {skin_type}\n"));
    }
    if !request.target_conditions.is_empty() {
        prompt.push_str(&format!(
            "- Main conditions: {}\n",
            request.target_conditions.join(", ")
        ));
    }
    prompt.push_str(&format!("- Maximum steps: {}\n", request.max_steps));
    prompt.push_str("- End the description with a clear medical disclaimer.\n");

    if !request.image_urls.is_empty() {
        prompt.push_str("\nUser-provided images (reference paths only):\n");
        for url in request.image_urls.iter().take(5) {
            prompt.push_str(&format!("- {url}\n"));
        }
    }

    if let Some(ref context) = request.additional_context {
        if !context.trim().is_empty() {
            prompt.push_str("\nAdditional context from user documents:\n");
            prompt.push_str(&truncate_chars(context.trim(), 6000));
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nRespond with JSON containing description, target_skin_type, \
target_conditions[], and steps[].",
    );
    prompt
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ============ Chat and consultation turns ============

/// One chat turn on an existing session: retrieve, generate, validate,
/// persist. Provider failure is fatal; nothing is written in that case.
pub async fn run_chat_turn(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    llm: &dyn GenerativeClient,
    config: &Config,
    session_id: &str,
    user_id: &str,
    text: &str,
    image_url: Option<&str>,
) -> Result<TurnOutcome> {
    if text.trim().is_empty() && image_url.is_none() {
        return Err(AdvisorError::InvalidInput(
            "message requires text or an image reference".into(),
        ));
    }
    let session = crate::sessions::fetch_session(pool, session_id).await?;
    if session.user_id != user_id {
        return Err(AdvisorError::NotFound(format!(
            "session {session_id} not found"
        )));
    }

    let draft = generate_analysis(pool, embedder, llm, config, text, image_url, false).await?;
    let reply = render_assistant_message(&draft);

    let persisted = persist::persist_chat_turn(
        pool,
        session_id,
        user_id,
        text,
        image_url,
        &draft,
        &reply,
    )
    .await?;

    info!(
        session_id = %session_id,
        analysis_id = %persisted.analysis_id,
        "chat turn persisted"
    );
    Ok(outcome(persisted, reply, draft.confidence))
}

/// A consultation synthesizes its own session plus user message and asks
/// for a routine in the same structured response.
pub async fn run_consultation(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    llm: &dyn GenerativeClient,
    config: &Config,
    user_id: &str,
    text: &str,
    image_url: Option<&str>,
) -> Result<TurnOutcome> {
    if text.trim().is_empty() {
        return Err(AdvisorError::InvalidInput(
            "consultation requires a text description".into(),
        ));
    }

    let draft = generate_analysis(pool, embedder, llm, config, text, image_url, true).await?;
    let reply = render_assistant_message(&draft);

    let persisted =
        persist::persist_consultation(pool, user_id, text, image_url, &draft, &reply).await?;

    info!(
        session_id = %persisted.session_id,
        analysis_id = %persisted.analysis_id,
        routine = persisted.routine_id.is_some(),
        "consultation persisted"
    );
    Ok(outcome(persisted, reply, draft.confidence))
}

fn outcome(persisted: PersistedTurn, reply: String, confidence: Option<f64>) -> TurnOutcome {
    TurnOutcome {
        session_id: persisted.session_id,
        analysis_id: persisted.analysis_id,
        routine_id: persisted.routine_id,
        reply,
        confidence,
    }
}

async fn generate_analysis(
    pool: &SqlitePool,
    embedder: &dyn EmbeddingClient,
    llm: &dyn GenerativeClient,
    config: &Config,
    text: &str,
    image_url: Option<&str>,
    with_routine: bool,
) -> Result<AnalysisDraft> {
    let filter = SearchFilter {
        doc_ids: None,
        sources: Some(config.retrieval.trusted_sources.clone()),
    };
    let hits = search(pool, embedder, text, config.retrieval.top_k, &filter, None).await;
    let context = assemble_context(&hits, config.retrieval.context_chars);

    let prompt = build_chat_prompt(text, image_url, &context);
    let raw = llm
        .complete_json(CHAT_SYSTEM_PROMPT, &prompt, &analysis_schema(with_routine), None)
        .await?;
    parse_analysis(&raw)
}

/// Render the validated draft as the outbound assistant message: summary
/// line, bulleted non-disclaimer recommendations, disclaimer last and on
/// its own line.
pub fn render_assistant_message(draft: &AnalysisDraft) -> String {
    let mut out = String::new();

    if !draft.summary.is_empty() {
        out.push_str(&format!("Summary: {}\n", draft.summary));
    }

    let non_disclaimer: Vec<&Recommendation> = draft
        .recommendations
        .iter()
        .filter(|r| r.kind != DISCLAIMER_KIND)
        .collect();
    if !non_disclaimer.is_empty() {
        out.push_str("\nRecommendations:\n");
        for rec in non_disclaimer {
            out.push_str(&format!("- {}: {}\n", rec.title, rec.details));
        }
    }

    if let Some(disclaimer) = draft
        .recommendations
        .iter()
        .find(|r| r.kind == DISCLAIMER_KIND)
    {
        out.push_str(&format!("\nNote: {}\n", disclaimer.details));
    }

    out
}

// ============ Standalone routine generation ============

/// Generate a routine draft from a free-text request. Any provider or
/// parse failure falls back to the deterministic template, so this
/// always returns a draft.
pub async fn generate_routine(
    llm: &dyn GenerativeClient,
    request: &RoutineRequest,
) -> RoutineDraft {
    if request.query.trim().is_empty() && request.additional_context.is_none() {
        return fallback_routine(request);
    }

    let prompt = build_routine_prompt(request);
    let raw = match llm
        .complete_json(ROUTINE_SYSTEM_PROMPT, &prompt, &routine_schema(), None)
        .await
    {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "routine generation failed, using template");
            return fallback_routine(request);
        }
    };

    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => match parse_routine_value(&value) {
            Some(mut draft) => {
                if draft.target_skin_type.is_none() {
                    draft.target_skin_type = request.target_skin_type.clone();
                }
                if draft.target_conditions.is_empty() {
                    draft.target_conditions = request.target_conditions.clone();
                }
                draft.steps.truncate(request.max_steps.max(1));
                draft
            }
            None => {
                warn!("routine response had no usable steps, using template");
                fallback_routine(request)
            }
        },
        Err(e) => {
            warn!(error = %e, "routine response was not JSON, using template");
            fallback_routine(request)
        }
    }
}

/// Routine generation seeded with already-extracted document text.
pub async fn generate_routine_from_text(
    llm: &dyn GenerativeClient,
    request: &RoutineRequest,
    document_text: &str,
) -> RoutineDraft {
    let mut seeded = request.clone();
    seeded.additional_context = Some(document_text.to_string());
    generate_routine(llm, &seeded).await
}

/// Routine generation from an uploaded document: extract text first,
/// then delegate. Extraction failure falls back to the template.
pub async fn generate_routine_from_upload(
    llm: &dyn GenerativeClient,
    request: &RoutineRequest,
    file_name: &str,
    bytes: &[u8],
) -> RoutineDraft {
    match extract::extract_text(bytes, file_name) {
        Ok(text) => generate_routine_from_text(llm, request, &text).await,
        Err(e) => {
            warn!(file = %file_name, error = %e, "text extraction failed, using template");
            fallback_routine(request)
        }
    }
}

fn fallback_routine(request: &RoutineRequest) -> RoutineDraft {
    RoutineDraft {
        description: format!(
            "Suggested routine for: {}\nNote: this is general guidance only, please \
consult a dermatologist for a personal assessment.",
            request.query.trim()
        ),
        target_skin_type: request.target_skin_type.clone(),
        target_conditions: request.target_conditions.clone(),
        steps: vec![RoutineStepDraft {
            order: 1,
            instruction: FALLBACK_STEP_INSTRUCTION.to_string(),
            time_of_day: TimeOfDay::Morning,
            frequency: Frequency::Daily,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

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

    #[test]
    fn test_parse_injects_disclaimer_and_clamps_confidence() {
        let draft =
            parse_analysis(r#"{"summary":"ok","recommendations":[],"confidence":1.4}"#).unwrap();
        assert_eq!(draft.summary, "ok");
        assert_eq!(draft.confidence, Some(1.0));
        assert_eq!(draft.recommendations.len(), 1);
        assert_eq!(draft.recommendations[0].kind, DISCLAIMER_KIND);
        assert_eq!(draft.recommendations[0].details, DISCLAIMER_TEXT);
    }

    #[test]
    fn test_parse_keeps_existing_disclaimer() {
        let raw = r#"{"summary":"s","recommendations":[
            {"type":"Disclaimer","title":"Note","details":"see a doctor"}
        ]}"#;
        let draft = parse_analysis(raw).unwrap();
        assert_eq!(draft.recommendations.len(), 1);
        assert_eq!(draft.recommendations[0].details, "see a doctor");
    }

    #[test]
    fn test_parse_confidence_variants() {
        let string_encoded =
            parse_analysis(r#"{"summary":"s","confidence":"0.75"}"#).unwrap();
        assert_eq!(string_encoded.confidence, Some(0.75));

        let negative = parse_analysis(r#"{"summary":"s","confidence":-2}"#).unwrap();
        assert_eq!(negative.confidence, Some(0.0));

        let absent = parse_analysis(r#"{"summary":"s"}"#).unwrap();
        assert_eq!(absent.confidence, None);

        let junk = parse_analysis(r#"{"summary":"s","confidence":"high"}"#).unwrap();
        assert_eq!(junk.confidence, None);
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(parse_analysis("[]").is_err());
        assert!(parse_analysis("not json").is_err());
    }

    #[test]
    fn test_routine_steps_reordered_densely() {
        let raw = r#"{"summary":"s","routine":{"description":"d","steps":[
            {"order":10,"instruction":"third"},
            {"order":-5,"instruction":"first"},
            {"instruction":"second","time_of_day":"evening","frequency":"weekly"}
        ]}}"#;
        let draft = parse_analysis(raw).unwrap();
        let routine = draft.routine.unwrap();
        let orders: Vec<i64> = routine.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(routine.steps[0].instruction, "first");
        assert_eq!(routine.steps[2].instruction, "third");
        assert_eq!(routine.steps[1].time_of_day, TimeOfDay::Evening);
        assert_eq!(routine.steps[1].frequency, Frequency::Weekly);
    }

    #[test]
    fn test_routine_without_steps_is_dropped() {
        let raw = r#"{"summary":"s","routine":{"description":"d","steps":[
            {"order":1,"instruction":"   "}
        ]}}"#;
        let draft = parse_analysis(raw).unwrap();
        assert!(draft.routine.is_none());
    }

    #[test]
    fn test_render_assistant_message_layout() {
        let draft = parse_analysis(
            r#"{"summary":"Mild dryness","recommendations":[
                {"type":"product","title":"Moisturizer","details":"Apply twice daily"}
            ]}"#,
        )
        .unwrap();
        let message = render_assistant_message(&draft);
        assert!(message.starts_with("Summary: Mild dryness\n"));
        assert!(message.contains("- Moisturizer: Apply twice daily"));
        assert!(message.trim_end().ends_with(&format!("Note: {DISCLAIMER_TEXT}")));
    }

    #[tokio::test]
    async fn test_routine_falls_back_on_provider_failure() {
        let request = RoutineRequest {
            query: "oily skin".into(),
            ..Default::default()
        };
        let draft = generate_routine(&FailingLlm, &request).await;
        assert_eq!(draft.steps.len(), 1);
        assert_eq!(draft.steps[0].order, 1);
        assert_eq!(draft.steps[0].instruction, FALLBACK_STEP_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_routine_falls_back_on_unparseable_response() {
        let request = RoutineRequest {
            query: "acne".into(),
            ..Default::default()
        };
        let draft = generate_routine(&CannedLlm("not json at all".into()), &request).await;
        assert_eq!(draft.steps[0].instruction, FALLBACK_STEP_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_routine_caps_step_count() {
        let steps: Vec<String> = (1..=6)
            .map(|i| format!(r#"{{"order":{i},"instruction":"step {i}"}}"#))
            .collect();
        let raw = format!(
            r#"{{"description":"d","steps":[{}]}}"#,
            steps.join(",")
        );
        let request = RoutineRequest {
            query: "anti-aging".into(),
            max_steps: 3,
            ..Default::default()
        };
        let draft = generate_routine(&CannedLlm(raw), &request).await;
        assert_eq!(draft.steps.len(), 3);
    }
}
