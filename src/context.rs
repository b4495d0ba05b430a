//! Renders retrieval hits into the character-bounded context block that
//! grounds each generative prompt.

use crate::models::RetrievalHit;

/// Emitted instead of an empty string when retrieval produced nothing, so
/// the prompt stays well-formed.
pub const NO_KNOWLEDGE_SENTINEL: &str = "No relevant knowledge found.";

/// Maximum asset URLs rendered per hit.
const MAX_ASSET_URLS: usize = 3;

/// Render ranked hits as numbered blocks until the character budget would be
/// exceeded. The final partially-fitting block is truncated to exactly fill
/// the remaining budget rather than dropped.
pub fn assemble_context(hits: &[RetrievalHit], char_budget: usize) -> String {
    if hits.is_empty() {
        return NO_KNOWLEDGE_SENTINEL.to_string();
    }

    let mut out = String::new();
    let mut used = 0usize;

    for (index, hit) in hits.iter().enumerate() {
        let block = render_block(index + 1, hit);
        let block_len = block.chars().count();

        if used + block_len > char_budget {
            let remaining = char_budget.saturating_sub(used);
            if remaining == 0 {
                break;
            }
            out.extend(block.chars().take(remaining));
            break;
        }

        out.push_str(&block);
        used += block_len;
    }

    out
}

fn render_block(number: usize, hit: &RetrievalHit) -> String {
    let mut block = String::new();
    block.push_str(&format!(
        "[{}] Source: {}\n",
        number,
        hit.source.as_deref().unwrap_or("unknown")
    ));
    if let Some(title) = hit.title.as_deref() {
        if !title.trim().is_empty() {
            block.push_str(&format!("Title: {}\n", title));
        }
    }
    block.push_str("Content:\n");
    block.push_str(hit.content.trim());
    block.push('\n');
    if !hit.asset_urls.is_empty() {
        block.push_str("Reference images:\n");
        for url in hit.asset_urls.iter().take(MAX_ASSET_URLS) {
            block.push_str(&format!("- {}\n", url));
        }
    }
    block.push_str("---\n");
    block
}
