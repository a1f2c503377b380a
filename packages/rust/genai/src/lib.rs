//! Generation service client for docforge.
//!
//! Both AI stages — content rewrite and relationship discovery — go through
//! the [`Generator`] trait, so pipelines can run against canned responses in
//! tests. [`OpenRouterClient`] is the production implementation.
//!
//! Prompt construction and response decoding live here too:
//! [`rewrite`] owns the strict rewrite contract, [`relations`] the lenient
//! per-entry discovery contract.

mod extract;
mod openrouter;
pub mod relations;
pub mod rewrite;

pub use extract::extract_json_object;
pub use openrouter::OpenRouterClient;

use docforge_shared::Result;

/// A single generation call: one system prompt, one user prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    /// Max output tokens for this call.
    pub max_tokens: u32,
}

/// Raw output of a generation call with token accounting.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
}

impl Generation {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// USD estimate at a flat per-1K-token rate.
    pub fn cost_estimate(&self, cost_per_1k_tokens: f64) -> f64 {
        self.total_tokens() as f64 * cost_per_1k_tokens / 1000.0
    }
}

/// Calls the generation model and returns its raw text output.
#[allow(async_fn_in_trait)]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation>;
}

/// Truncate content to approximately `max_chars` characters.
pub(crate) fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        let mut end = max_chars;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}\n\n[... content truncated for model context window ...]",
            &content[..end]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_content() {
        assert_eq!(truncate_content("short text", 100), "short text");
    }

    #[test]
    fn truncate_long_content() {
        let content = "a".repeat(200);
        let result = truncate_content(&content, 100);
        assert!(result.len() > 100);
        assert!(result.contains("truncated"));
    }

    #[test]
    fn cost_estimate_uses_total_tokens() {
        let generation = Generation {
            text: String::new(),
            input_tokens: 1_500,
            output_tokens: 500,
            model: "test".into(),
        };
        assert_eq!(generation.total_tokens(), 2_000);
        assert!((generation.cost_estimate(0.002) - 0.004).abs() < 1e-12);
    }
}
