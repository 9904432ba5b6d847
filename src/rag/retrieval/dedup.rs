//! Near-duplicate detection for retrieved passages
//!
//! Two passages are duplicates when they share a source reference and the
//! Jaccard similarity of their lowercase word sets reaches the threshold.

use std::collections::HashSet;

use crate::types::ScoredPassage;

fn word_set(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard similarity of word sets, 1.0 for two empty texts
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let set_a = word_set(a);
    let set_b = word_set(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Keep the first (highest-scoring) instance of every duplicate group.
///
/// Input must already be score-descending. Exact id repeats are always
/// dropped regardless of source.
pub fn deduplicate(ranked: Vec<ScoredPassage>, threshold: f64) -> Vec<ScoredPassage> {
    let mut kept: Vec<ScoredPassage> = Vec::with_capacity(ranked.len());

    for candidate in ranked {
        let duplicate = kept.iter().any(|existing| {
            existing.passage.id == candidate.passage.id
                || (existing.passage.source_reference == candidate.passage.source_reference
                    && text_similarity(&existing.passage.text, &candidate.passage.text) >= threshold)
        });

        if !duplicate {
            kept.push(candidate);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Passage;

    fn scored(id: &str, source: &str, text: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            passage: Passage::new(id, text, source),
            score,
        }
    }

    #[test]
    fn test_text_similarity() {
        assert_eq!(text_similarity("Rapamycin extends lifespan", "rapamycin EXTENDS lifespan."), 1.0);
        assert_eq!(text_similarity("alpha beta", "gamma delta"), 0.0);
        assert!((text_similarity("a b c d", "a b c e") - 0.6).abs() < 1e-9);
        assert_eq!(text_similarity("", "  "), 1.0);
    }

    #[test]
    fn test_same_source_near_identical_collapsed() {
        let ranked = vec![
            scored("a", "paper-1", "Caloric restriction extends lifespan in rodents", 0.95),
            scored("b", "paper-1", "Caloric restriction extends lifespan in rodents.", 0.90),
            scored("c", "paper-1", "Exercise improves VO2 max in older adults", 0.85),
        ];

        let kept = deduplicate(ranked, 0.9);
        let ids: Vec<_> = kept.iter().map(|p| p.passage.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_identical_text_from_different_sources_kept() {
        let ranked = vec![
            scored("a", "paper-1", "Same sentence here", 0.9),
            scored("b", "paper-2", "Same sentence here", 0.8),
        ];
        assert_eq!(deduplicate(ranked, 0.9).len(), 2);
    }

    #[test]
    fn test_repeated_ids_dropped() {
        let ranked = vec![
            scored("a", "paper-1", "first", 0.9),
            scored("a", "paper-2", "other text", 0.7),
        ];
        let kept = deduplicate(ranked, 0.9);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }
}
