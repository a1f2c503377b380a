//! JSON recovery from model output.
//!
//! Models are asked for bare JSON but often wrap it in markdown fences or
//! surround it with prose. This strips all of that before typed decoding.

use docforge_shared::{DocforgeError, Result};

/// Extract the JSON object embedded in model output.
///
/// Tries, in order: a fenced ```json block, any fenced block, the span from
/// the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Result<&str> {
    if let Some(inner) = fenced_block(text, "```json") {
        return Ok(inner);
    }
    if let Some(inner) = fenced_block(text, "```") {
        return Ok(inner);
    }

    let start = text.find('{');
    let end = text.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(text[s..=e].trim()),
        _ => Err(DocforgeError::validation(
            "model output contains no JSON object",
        )),
    }
}

fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    let inner = rest[..end].trim();
    if inner.starts_with('{') { Some(inner) } else { None }
}
