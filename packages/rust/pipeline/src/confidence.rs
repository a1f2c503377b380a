//! Confidence filtering and ordering for discovered relationships.

use docforge_shared::DiscoveredRelationship;

/// Drop relationships below `threshold`. Relative order is preserved.
pub fn filter_by_confidence(
    relationships: Vec<DiscoveredRelationship>,
    threshold: f64,
) -> Vec<DiscoveredRelationship> {
    relationships
        .into_iter()
        .filter(|r| r.confidence >= threshold)
        .collect()
}

/// Sort relationships by confidence, highest first. The sort is stable, so
/// equal-confidence entries keep their discovery order.
pub fn sort_by_confidence(relationships: &mut [DiscoveredRelationship]) {
    relationships.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use docforge_shared::{EntityKind, RelationKind};

    fn rel(target: &str, confidence: f64) -> DiscoveredRelationship {
        DiscoveredRelationship {
            source_kind: EntityKind::Doc,
            source_id: "doc-1".into(),
            target_kind: EntityKind::Resource,
            target_id: target.into(),
            relationship_type: RelationKind::References,
            confidence,
            reasoning: String::new(),
            shared_tags: vec![],
        }
    }

    #[test]
    fn filter_keeps_at_or_above_threshold() {
        let rels = vec![rel("a", 0.9), rel("b", 0.6), rel("c", 0.59), rel("d", 0.3)];
        let kept = filter_by_confidence(rels, 0.6);
        let ids: Vec<&str> = kept.iter().map(|r| r.target_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let mut rels = vec![rel("a", 0.5), rel("b", 0.9), rel("c", 0.5), rel("d", 0.7)];
        sort_by_confidence(&mut rels);
        let ids: Vec<&str> = rels.iter().map(|r| r.target_id.as_str()).collect();
        // a and c tie at 0.5 and keep their input order.
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn filter_then_sort_is_idempotent() {
        let rels = vec![rel("a", 0.4), rel("b", 0.95), rel("c", 0.7), rel("d", 0.62)];

        let mut once = filter_by_confidence(rels, 0.6);
        sort_by_confidence(&mut once);

        let mut twice = filter_by_confidence(once.clone(), 0.6);
        sort_by_confidence(&mut twice);

        let ids =
            |v: &[DiscoveredRelationship]| v.iter().map(|r| r.target_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&once), vec!["b", "c", "d"]);
        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn empty_input_is_fine() {
        let mut empty = filter_by_confidence(Vec::new(), 0.6);
        sort_by_confidence(&mut empty);
        assert!(empty.is_empty());
    }
}
