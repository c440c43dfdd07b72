use crate::chunking::{chunk_text, normalize_whitespace, ChunkingConfig};
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::error::EnrichError;
use crate::models::{EnrichmentResult, Entity};
use crate::traits::TextEnricher;
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashSet};

const LEXICON: [(&str, &[&str]); 4] = [
    (
        "nutrients",
        &[
            "protein", "carbohydrate", "carbohydrates", "fat", "fats", "fiber", "fibre", "sugar",
            "sugars", "sodium", "potassium", "calcium", "iron", "zinc", "magnesium", "vitamin a",
            "vitamin b12", "vitamin c", "vitamin d", "folate", "omega-3", "cholesterol",
            "saturated fat", "trans fat",
        ],
    ),
    (
        "foods",
        &[
            "fruit", "fruits", "vegetable", "vegetables", "whole grains", "legumes", "beans",
            "nuts", "dairy", "milk", "eggs", "fish", "red meat", "processed meat", "rice",
            "bread", "olive oil", "sugar-sweetened beverages", "snacks", "fast food",
        ],
    ),
    (
        "dietary_patterns",
        &[
            "mediterranean diet", "dash diet", "vegetarian", "vegan", "plant-based",
            "ketogenic", "intermittent fasting", "eating habits", "dietary patterns",
            "breakfast skipping", "ultra-processed",
        ],
    ),
    (
        "health_outcomes",
        &[
            "obesity", "overweight", "diabetes", "type 2 diabetes", "hypertension",
            "cardiovascular disease", "cancer", "depression", "mortality", "bmi",
            "insulin resistance", "metabolic syndrome", "inflammation", "health outcomes",
        ],
    ),
];

/// Enricher that runs in-process: sentence chunking, lexicon matching,
/// capitalised-phrase entities and a local embedder.
pub struct LocalEnricher<E = CharacterNgramEmbedder> {
    embedder: E,
    chunking: ChunkingConfig,
    term_patterns: Vec<(String, Regex)>,
    entity_pattern: Regex,
}

impl LocalEnricher<CharacterNgramEmbedder> {
    pub fn new(chunking: ChunkingConfig) -> Result<Self, EnrichError> {
        Self::with_embedder(CharacterNgramEmbedder::default(), chunking)
    }
}

impl<E: Embedder> LocalEnricher<E> {
    pub fn with_embedder(embedder: E, chunking: ChunkingConfig) -> Result<Self, EnrichError> {
        let term_patterns = LEXICON
            .iter()
            .map(|(category, terms)| {
                let mut sorted = terms.to_vec();
                sorted.sort_by_key(|term| std::cmp::Reverse(term.len()));
                let alternation = sorted
                    .iter()
                    .map(|term| regex::escape(term))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
                    .case_insensitive(true)
                    .build()?;
                Ok::<_, EnrichError>((category.to_string(), pattern))
            })
            .collect::<Result<Vec<_>, EnrichError>>()?;

        let entity_pattern =
            Regex::new(r"\b(?:[A-Z]{2,}[0-9]*|[A-Z][a-z]+(?:\s+(?:of\s+)?[A-Z][a-z]+)+)\b")?;

        Ok(Self {
            embedder,
            chunking,
            term_patterns,
            entity_pattern,
        })
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Every occurrence per category, in text order, lower-cased.
    pub fn match_terms(&self, text: &str) -> BTreeMap<String, Vec<String>> {
        self.term_patterns
            .iter()
            .filter_map(|(category, pattern)| {
                let found = pattern
                    .find_iter(text)
                    .map(|hit| hit.as_str().to_lowercase())
                    .collect::<Vec<_>>();
                (!found.is_empty()).then(|| (category.clone(), found))
            })
            .collect()
    }

    pub fn extract_entities(&self, text: &str) -> Vec<Entity> {
        let mut seen = HashSet::new();
        self.entity_pattern
            .find_iter(text)
            .filter(|hit| seen.insert(hit.as_str().to_string()))
            .map(|hit| {
                let value = hit.as_str();
                let label = if value.contains(char::is_whitespace) {
                    "PHRASE"
                } else {
                    "ACRONYM"
                };
                Entity {
                    text: value.to_string(),
                    label: label.to_string(),
                }
            })
            .collect()
    }

    pub fn enrich_text(&self, text: &str) -> EnrichmentResult {
        let normalized = normalize_whitespace(text);
        let chunks = chunk_text(&normalized, self.chunking);
        let embeddings = chunks
            .iter()
            .map(|chunk| self.embedder.embed(chunk))
            .collect();

        EnrichmentResult {
            entities: self.extract_entities(&normalized),
            matched_terms: self.match_terms(&normalized),
            chunks,
            embeddings,
        }
    }
}

#[async_trait]
impl<E: Embedder + Send + Sync> TextEnricher for LocalEnricher<E> {
    async fn enrich(&self, text: &str) -> Result<EnrichmentResult, EnrichError> {
        Ok(self.enrich_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EMBEDDING_DIMENSIONS;

    fn enricher() -> LocalEnricher {
        LocalEnricher::new(ChunkingConfig {
            max_chars: 80,
            overlap_chars: 10,
        })
        .expect("lexicon patterns compile")
    }

    #[test]
    fn terms_are_matched_per_category_in_order() {
        let terms = enricher().match_terms(
            "The Mediterranean diet, rich in olive oil and fish, lowered BMI. Fish twice weekly.",
        );
        assert_eq!(terms["dietary_patterns"], vec!["mediterranean diet"]);
        assert_eq!(terms["foods"], vec!["olive oil", "fish", "fish"]);
        assert_eq!(terms["health_outcomes"], vec!["bmi"]);
        assert!(!terms.contains_key("nutrients"));
    }

    #[test]
    fn longer_terms_win_over_their_prefixes() {
        let terms = enricher().match_terms("Patients with type 2 diabetes and diabetes.");
        assert_eq!(terms["health_outcomes"], vec!["type 2 diabetes", "diabetes"]);
    }

    #[test]
    fn entities_are_deduplicated_acronyms_and_phrases() {
        let entities = enricher()
            .extract_entities("The WHO and World Health Organization data. WHO again in United States.");
        let texts: Vec<&str> = entities.iter().map(|entity| entity.text.as_str()).collect();
        assert_eq!(texts, vec!["WHO", "World Health Organization", "United States"]);
        assert_eq!(entities[0].label, "ACRONYM");
        assert_eq!(entities[1].label, "PHRASE");
    }

    #[tokio::test]
    async fn enrichment_is_aligned_and_full_dimension() {
        let text = "Higher fiber intake was associated with lower mortality. \
                    Whole grains and legumes were the main sources. \
                    Effects persisted after adjustment for BMI.";
        let result = enricher().enrich(text).await.expect("local enrichment");

        assert!(result.chunks.len() > 1);
        assert!(result.is_aligned());
        assert!(result
            .embeddings
            .iter()
            .all(|embedding| embedding.len() == EMBEDDING_DIMENSIONS));
        assert!(result.matched_terms.contains_key("nutrients"));
    }

    #[tokio::test]
    async fn blank_text_enriches_to_empty_result() {
        let result = enricher().enrich("   ").await.expect("local enrichment");
        assert_eq!(result, EnrichmentResult::default());
    }
}
