//! Relationship discovery prompt and response contract.
//!
//! Unlike the rewrite contract, discovery decoding is lenient: one garbled
//! entry must not sink the rest of the batch, so entries are decoded one by
//! one and failures come back as warnings.

use serde::Deserialize;

use docforge_shared::{DocforgeError, Result};

use crate::{GenerationRequest, extract_json_object, truncate_content};

/// Per-source character budget in the discovery prompt.
const SOURCE_CHAR_BUDGET: usize = 6_000;

const RELATIONS_SYSTEM_PROMPT: &str = "\
You are a documentation librarian building a typed relationship graph. You \
are given one source entity and a numbered list of candidate entities. For \
each candidate that genuinely relates to the source, emit one relationship \
drawn from the allowed vocabulary. Omit candidates with no real connection; \
do not force matches.

Respond with a single JSON object and nothing else:
{
  \"relationships\": [
    {
      \"targetId\": \"candidate id\",
      \"type\": \"one of the allowed vocabulary values\",
      \"confidence\": 0.0-1.0,
      \"reasoning\": \"one sentence\",
      \"sharedTags\": [\"optional overlapping tags\"]
    }
  ]
}";

/// One entity as rendered into a discovery prompt.
#[derive(Debug, Clone)]
pub struct EntitySummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// A raw relationship entry as decoded from model output, before vocabulary
/// and range validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelation {
    pub target_id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub shared_tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RelationsResponse {
    #[serde(default)]
    relationships: Vec<serde_json::Value>,
}

/// Build the discovery request for one source entity against a batch of
/// candidates.
pub fn build_relations_request(
    source: &EntitySummary,
    source_content: &str,
    candidates: &[EntitySummary],
    vocabulary: &[&str],
    max_tokens: u32,
) -> GenerationRequest {
    let mut user = String::new();
    user.push_str(&format!(
        "# Source entity\n\nId: {}\nName: {}\nTags: {}\n\n{}\n\n{}\n",
        source.id,
        source.name,
        source.tags.join(", "),
        source.description,
        truncate_content(source_content, SOURCE_CHAR_BUDGET),
    ));

    user.push_str(&format!(
        "\n# Allowed relationship vocabulary\n\n{}\n",
        vocabulary.join(", ")
    ));

    user.push_str("\n# Candidates\n");
    for (i, candidate) in candidates.iter().enumerate() {
        user.push_str(&format!(
            "\n{}. id: {}\n   name: {}\n   tags: {}\n   {}\n",
            i + 1,
            candidate.id,
            candidate.name,
            candidate.tags.join(", "),
            candidate.description,
        ));
    }

    GenerationRequest {
        system: RELATIONS_SYSTEM_PROMPT.into(),
        user,
        max_tokens,
    }
}

/// Decode a discovery response.
///
/// The outer `relationships` envelope must decode, otherwise the whole call
/// is a generation error. Within it, entries are decoded one by one: each
/// garbled entry becomes a warning instead of sinking the batch.
pub fn parse_relations_response(text: &str) -> Result<(Vec<RawRelation>, Vec<String>)> {
    let json = extract_json_object(text)?;
    let decoded: RelationsResponse = serde_json::from_str(json)
        .map_err(|e| DocforgeError::Generation(format!("malformed relations response: {e}")))?;

    let mut relations = Vec::new();
    let mut warnings = Vec::new();
    for (i, entry) in decoded.relationships.into_iter().enumerate() {
        match serde_json::from_value::<RawRelation>(entry) {
            Ok(raw) => relations.push(raw),
            Err(e) => warnings.push(format!("discarded malformed relationship entry {i}: {e}")),
        }
    }

    Ok((relations, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, name: &str) -> EntitySummary {
        EntitySummary {
            id: id.into(),
            name: name.into(),
            description: format!("{name} description"),
            tags: vec!["rust".into()],
        }
    }

    #[test]
    fn prompt_numbers_candidates_and_lists_vocabulary() {
        let request = build_relations_request(
            &summary("doc-1", "Async Guide"),
            "# Async Guide\n\nBody.",
            &[summary("res-1", "tokio"), summary("res-2", "smol")],
            &["references", "implements"],
            4_000,
        );
        assert!(request.user.contains("Id: doc-1"));
        assert!(request.user.contains("1. id: res-1"));
        assert!(request.user.contains("2. id: res-2"));
        assert!(request.user.contains("references, implements"));
    }

    #[test]
    fn parse_clean_response() {
        let text = serde_json::json!({
            "relationships": [
                {"targetId": "res-1", "type": "references", "confidence": 0.9,
                 "reasoning": "cited directly", "sharedTags": ["rust"]},
                {"targetId": "res-2", "type": "tool", "confidence": 0.6,
                 "reasoning": "used in examples"}
            ]
        })
        .to_string();

        let (relations, warnings) = parse_relations_response(&text).expect("parse");
        assert_eq!(relations.len(), 2);
        assert!(warnings.is_empty());
        assert_eq!(relations[0].target_id, "res-1");
        assert_eq!(relations[0].relationship_type, "references");
        assert_eq!(relations[1].shared_tags, Vec::<String>::new());
    }

    #[test]
    fn malformed_entries_become_warnings() {
        let text = serde_json::json!({
            "relationships": [
                {"targetId": "res-1", "type": "references", "confidence": 0.9},
                {"type": "references"},
                {"targetId": "res-3", "type": "similar", "confidence": "high"}
            ]
        })
        .to_string();

        let (relations, warnings) = parse_relations_response(&text).expect("parse");
        assert_eq!(relations.len(), 1);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("entry 1"));
    }

    #[test]
    fn empty_object_yields_no_relations() {
        let (relations, warnings) = parse_relations_response("{}").expect("parse");
        assert!(relations.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn no_json_at_all_is_error() {
        assert!(parse_relations_response("I could not find anything.").is_err());
    }

    #[test]
    fn wrong_typed_envelope_is_error() {
        let err = parse_relations_response(r#"{"relationships": "none found"}"#)
            .expect_err("string where array expected");
        assert!(matches!(err, DocforgeError::Generation(_)));
    }

    #[test]
    fn unparseable_envelope_is_error() {
        let err = parse_relations_response(r#"{"relationships": [ not json ]}"#)
            .expect_err("broken envelope");
        assert!(matches!(err, DocforgeError::Generation(_)));
    }
}
