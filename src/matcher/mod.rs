//! Decides which declared amenities the listing prose actually mentions.
//!
//! Checks run cheapest first and stop at the first hit: direct alias match
//! outside a negation window, weighted fuzzy match against non-negated
//! sentences, then (when a backend is configured) embedding similarity.

pub mod aliases;
pub mod embedding;
pub mod fuzzy;

use aliases::{aliases_for, canonicalize, contains_negation, is_negated, normalize_for_window, split_sentences};
use embedding::{best_match, Embeddings};
use tracing::debug;

pub use embedding::{Embedder, EmbeddingService, NullEmbedder, RemoteEmbedder, RemoteEmbedderConfig};

/// Fuzzy score (0-100) at which a sentence counts as a mention
pub const FUZZY_THRESHOLD: f64 = 90.0;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;

pub struct AmenityMatcher {
    embeddings: EmbeddingService,
    similarity_threshold: f32,
}

impl Default for AmenityMatcher {
    fn default() -> Self {
        Self::new(EmbeddingService::disabled(), DEFAULT_SIMILARITY_THRESHOLD)
    }
}

struct Corpus {
    sentences: Vec<String>,
    normalized: Vec<String>,
}

impl AmenityMatcher {
    pub fn new(embeddings: EmbeddingService, similarity_threshold: f32) -> Self {
        Self {
            embeddings,
            similarity_threshold,
        }
    }

    /// Split `tags` into those with textual evidence in `text` and those without.
    /// Both lists keep the input order and the original tag spelling.
    pub fn detect_amenity_mentions(&self, tags: &[String], text: &str) -> (Vec<String>, Vec<String>) {
        if tags.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let mut sentences = split_sentences(text);
        if sentences.is_empty() {
            sentences.push(text.to_string());
        }
        let corpus = Corpus {
            normalized: sentences.iter().map(|s| normalize_for_window(s)).collect(),
            sentences,
        };
        // Encoded on first need only
        let mut sentence_vectors: Option<Option<Embeddings>> = None;

        let mut present = Vec::new();
        let mut missing = Vec::new();

        for tag in tags {
            let aliases = aliases_for(&canonicalize(tag));
            let normalized_aliases: Vec<String> = aliases
                .iter()
                .map(|a| normalize_for_window(a))
                .filter(|a| !a.is_empty())
                .collect();

            let found = if has_direct_hit(&normalized_aliases, &corpus) {
                debug!(tag = tag.as_str(), check = "direct", "amenity mentioned");
                true
            } else if has_fuzzy_hit(&normalized_aliases, &corpus) {
                debug!(tag = tag.as_str(), check = "fuzzy", "amenity mentioned");
                true
            } else if self.embeddings.is_available() {
                let vectors = sentence_vectors
                    .get_or_insert_with(|| self.embeddings.encode_sentences(&corpus.sentences));
                match vectors {
                    Some(vectors) => self.has_embedding_hit(&aliases, vectors, &corpus),
                    None => false,
                }
            } else {
                false
            };

            if found {
                present.push(tag.clone());
            } else {
                missing.push(tag.clone());
            }
        }

        (present, missing)
    }

    fn has_embedding_hit(&self, aliases: &[String], sentence_vectors: &Embeddings, corpus: &Corpus) -> bool {
        let Some(alias_vectors) = self.embeddings.encode_aliases(aliases) else {
            return false;
        };
        let Some((score, idx)) = best_match(&alias_vectors, sentence_vectors) else {
            return false;
        };
        if score < self.similarity_threshold {
            return false;
        }
        corpus
            .normalized
            .get(idx)
            .is_some_and(|sentence| !contains_negation(sentence))
    }
}

fn has_direct_hit(aliases: &[String], corpus: &Corpus) -> bool {
    corpus
        .normalized
        .iter()
        .filter(|sentence| !sentence.is_empty())
        .any(|sentence| {
            let padded = format!(" {sentence} ");
            aliases
                .iter()
                .any(|alias| padded.contains(&format!(" {alias} ")) && !is_negated(sentence, alias))
        })
}

fn has_fuzzy_hit(aliases: &[String], corpus: &Corpus) -> bool {
    corpus
        .normalized
        .iter()
        .filter(|sentence| !sentence.is_empty() && !contains_negation(sentence))
        .any(|sentence| {
            aliases
                .iter()
                .any(|alias| fuzzy::weighted_ratio(alias, sentence) >= FUZZY_THRESHOLD)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_tags_yield_empty_lists() {
        let matcher = AmenityMatcher::default();
        assert_eq!(
            matcher.detect_amenity_mentions(&[], "Anything at all."),
            (Vec::new(), Vec::new())
        );
    }

    #[test]
    fn negated_parking_is_not_evidence() {
        let matcher = AmenityMatcher::default();
        let (present, missing) = matcher.detect_amenity_mentions(&tags(&["Parking"]), "This unit has no parking");
        assert!(present.is_empty());
        assert_eq!(missing, vec!["Parking"]);

        let (present, _) = matcher.detect_amenity_mentions(&tags(&["parking"]), "Free parking available");
        assert_eq!(present, vec!["parking"]);
    }

    #[test]
    fn synonyms_and_pieces_count() {
        let matcher = AmenityMatcher::default();
        let text = "Cool off with central air all summer. The washing machine is in the hall.";
        let (present, missing) = matcher.detect_amenity_mentions(
            &tags(&["Air conditioning", "Washer", "Sauna"]),
            text,
        );
        assert_eq!(present, vec!["Air conditioning", "Washer"]);
        assert_eq!(missing, vec!["Sauna"]);
    }

    #[test]
    fn fuzzy_catches_typos() {
        let matcher = AmenityMatcher::default();
        let (present, _) = matcher.detect_amenity_mentions(&tags(&["Coffee maker"]), "Coffe maker.");
        assert_eq!(present, vec!["Coffee maker"]);
    }

    /// Maps anything mentioning whirlpools or hot tubs onto the same axis
    struct SpaEmbedder {
        calls: AtomicUsize,
    }

    impl Embedder for SpaEmbedder {
        fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    if t.contains("whirlpool") || t.contains("hot tub") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }

        fn backend_name(&self) -> &str {
            "spa"
        }
    }

    fn spa_matcher() -> (AmenityMatcher, Arc<SpaEmbedder>) {
        let embedder = Arc::new(SpaEmbedder { calls: AtomicUsize::new(0) });
        let service = EmbeddingService::new(embedder.clone(), 16);
        (AmenityMatcher::new(service, DEFAULT_SIMILARITY_THRESHOLD), embedder)
    }

    #[test]
    fn embeddings_catch_paraphrases_and_are_cached() {
        let (matcher, embedder) = spa_matcher();
        let text = "Unwind in the bubbling outdoor whirlpool under the stars.";

        let (present, _) = matcher.detect_amenity_mentions(&tags(&["Hot tub"]), text);
        assert_eq!(present, vec!["Hot tub"]);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        matcher.detect_amenity_mentions(&tags(&["Hot tub"]), text);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn embedding_hit_in_negated_sentence_is_rejected() {
        let (matcher, _) = spa_matcher();
        let (present, missing) =
            matcher.detect_amenity_mentions(&tags(&["Hot tub"]), "Sadly there is no whirlpool anymore.");
        assert!(present.is_empty());
        assert_eq!(missing, vec!["Hot tub"]);
    }
}
