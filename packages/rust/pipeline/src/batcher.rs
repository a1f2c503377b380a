//! Candidate batching for discovery prompts.
//!
//! One generation call per batch. Batches are built greedily in input order
//! under two caps: a candidate-count cap and an estimated-token cap. Order
//! is preserved and every candidate lands in exactly one batch.

use docforge_shared::BatchingConfig;

/// A discovery candidate with its prompt-size estimate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
}

impl Candidate {
    /// Rough prompt-token estimate: 4 chars per token over the fields that
    /// get rendered into the prompt.
    pub fn estimated_tokens(&self) -> usize {
        let chars = self.name.len()
            + self.description.len()
            + self.tags.iter().map(String::len).sum::<usize>()
            + self.id.len();
        chars.div_ceil(4)
    }
}

/// Split candidates into batches under the configured caps.
///
/// A candidate whose own estimate exceeds the token cap still gets a batch
/// of its own rather than being dropped.
pub fn build_batches(candidates: &[Candidate], config: &BatchingConfig) -> Vec<Vec<Candidate>> {
    let mut batches: Vec<Vec<Candidate>> = Vec::new();
    let mut current: Vec<Candidate> = Vec::new();
    let mut current_tokens = 0usize;

    for candidate in candidates {
        let tokens = candidate.estimated_tokens();
        let over_count = current.len() >= config.max_candidates_per_batch;
        let over_tokens = !current.is_empty() && current_tokens + tokens > config.max_tokens_per_batch;

        if over_count || over_tokens {
            batches.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        current_tokens += tokens;
        current.push(candidate.clone());
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, description_len: usize) -> Candidate {
        Candidate {
            id: id.into(),
            name: format!("name-{id}"),
            description: "d".repeat(description_len),
            tags: vec![],
        }
    }

    fn config(max_candidates: usize, max_tokens: usize) -> BatchingConfig {
        BatchingConfig {
            max_candidates_per_batch: max_candidates,
            max_tokens_per_batch: max_tokens,
        }
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert!(build_batches(&[], &config(15, 4_000)).is_empty());
    }

    #[test]
    fn splits_on_candidate_count() {
        let candidates: Vec<Candidate> =
            (0..37).map(|i| candidate(&format!("c{i}"), 10)).collect();
        let batches = build_batches(&candidates, &config(15, 1_000_000));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 15);
        assert_eq!(batches[1].len(), 15);
        assert_eq!(batches[2].len(), 7);
    }

    #[test]
    fn twenty_five_candidates_split_fifteen_ten() {
        let candidates: Vec<Candidate> =
            (0..25).map(|i| candidate(&format!("c{i}"), 10)).collect();
        let batches = build_batches(&candidates, &config(15, 1_000_000));

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 15);
        assert_eq!(batches[1].len(), 10);
        assert_eq!(batches[0][0].id, "c0");
        assert_eq!(batches[1][0].id, "c15");
    }

    #[test]
    fn splits_on_token_budget() {
        // Each candidate estimates to roughly 110 tokens; cap at 250 per
        // batch so only two fit.
        let candidates: Vec<Candidate> =
            (0..5).map(|i| candidate(&format!("c{i}"), 400)).collect();
        let batches = build_batches(&candidates, &config(15, 250));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 2);
        assert_eq!(batches[2].len(), 1);
    }

    #[test]
    fn preserves_order_and_covers_every_candidate_once() {
        let candidates: Vec<Candidate> =
            (0..23).map(|i| candidate(&format!("c{i}"), 50 * (i % 7))).collect();
        let batches = build_batches(&candidates, &config(4, 300));

        let flattened: Vec<&str> = batches
            .iter()
            .flatten()
            .map(|c| c.id.as_str())
            .collect();
        let expected: Vec<String> = (0..23).map(|i| format!("c{i}")).collect();
        assert_eq!(
            flattened,
            expected.iter().map(String::as_str).collect::<Vec<_>>()
        );
    }

    #[test]
    fn oversized_candidate_gets_own_batch() {
        let candidates = vec![
            candidate("small", 20),
            candidate("huge", 100_000),
            candidate("tail", 20),
        ];
        let batches = build_batches(&candidates, &config(15, 500));

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0][0].id, "small");
        assert_eq!(batches[1][0].id, "huge");
        assert_eq!(batches[1].len(), 1);
        assert_eq!(batches[2][0].id, "tail");
    }

    #[test]
    fn all_in_one_batch_when_under_caps() {
        let candidates: Vec<Candidate> =
            (0..10).map(|i| candidate(&format!("c{i}"), 10)).collect();
        let batches = build_batches(&candidates, &config(15, 4_000));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 10);
    }
}
