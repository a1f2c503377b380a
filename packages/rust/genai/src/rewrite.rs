//! Content rewrite prompt and response contract.
//!
//! The rewrite stage is strict: the model must return a complete JSON object
//! with every required field, or the job fails with a validation error. A
//! half-parsed rewrite is worse than no rewrite.

use serde::Deserialize;

use docforge_shared::{
    ContentItem, DocforgeError, ProposedUpdate, Result, ScrapedSnapshot, SourceRef,
};

use crate::{GenerationRequest, extract_json_object, truncate_content};

/// Per-snapshot character budget in the rewrite prompt.
const SNAPSHOT_CHAR_BUDGET: usize = 12_000;

const REWRITE_SYSTEM_PROMPT: &str = "\
You are a technical documentation editor. You are given the current version \
of a documentation page and fresh snapshots of its cited sources. Rewrite \
the page so it is accurate against the sources, preserving its structure, \
voice, and scope. Do not invent facts absent from the sources.

Respond with a single JSON object and nothing else:
{
  \"title\": \"updated page title\",
  \"description\": \"updated one-paragraph description\",
  \"content\": \"full updated markdown body\",
  \"summary\": \"one-paragraph summary of what changed and why\",
  \"confidence\": 0.0-1.0,
  \"keyChanges\": [\"bullet per substantive change\"],
  \"warnings\": [\"caveats the reviewer should check\"],
  \"sources\": [{\"title\": \"...\", \"url\": \"...\"}]
}";

/// Decoded rewrite output: the proposed replacement plus review metadata.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub proposed: ProposedUpdate,
    pub summary: String,
    pub confidence: f64,
    pub key_changes: Vec<String>,
    pub warnings: Vec<String>,
}

// Required fields stay non-optional so a partial response fails the decode.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewriteResponse {
    title: String,
    description: String,
    content: String,
    summary: String,
    confidence: f64,
    #[serde(default)]
    key_changes: Vec<String>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    sources: Vec<ResponseSource>,
}

#[derive(Debug, Deserialize)]
struct ResponseSource {
    title: String,
    url: String,
}

/// Build the rewrite request for one item and its scraped sources.
pub fn build_rewrite_request(
    item: &ContentItem,
    snapshots: &[ScrapedSnapshot],
    max_tokens: u32,
) -> GenerationRequest {
    let mut user = String::new();
    user.push_str(&format!(
        "# Current page\n\nSlug: {}\nTitle: {}\nDescription: {}\n\n{}\n",
        item.slug, item.title, item.description, item.content
    ));

    user.push_str("\n# Source snapshots\n");
    for snapshot in snapshots {
        user.push_str(&format!(
            "\n## {} ({})\n\n{}\n",
            snapshot.title.as_deref().unwrap_or("untitled"),
            snapshot.url,
            truncate_content(&snapshot.markdown, SNAPSHOT_CHAR_BUDGET),
        ));
    }

    GenerationRequest {
        system: REWRITE_SYSTEM_PROMPT.into(),
        user,
        max_tokens,
    }
}

/// Strictly decode a rewrite response from raw model output.
pub fn parse_rewrite_response(text: &str) -> Result<RewriteOutcome> {
    let json = extract_json_object(text)?;
    let decoded: RewriteResponse = serde_json::from_str(json)
        .map_err(|e| DocforgeError::validation(format!("malformed rewrite response: {e}")))?;

    if !(0.0..=1.0).contains(&decoded.confidence) {
        return Err(DocforgeError::validation(format!(
            "rewrite confidence {} outside [0, 1]",
            decoded.confidence
        )));
    }
    if decoded.content.trim().is_empty() {
        return Err(DocforgeError::validation("rewrite produced empty content"));
    }

    Ok(RewriteOutcome {
        proposed: ProposedUpdate {
            title: decoded.title,
            description: decoded.description,
            content: decoded.content,
            sources: decoded
                .sources
                .into_iter()
                .map(|s| SourceRef {
                    title: s.title,
                    url: s.url,
                })
                .collect(),
        },
        summary: decoded.summary,
        confidence: decoded.confidence,
        key_changes: decoded.key_changes,
        warnings: decoded.warnings,
    })
}
