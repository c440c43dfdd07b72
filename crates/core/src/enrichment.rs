//! Decides whether a record's enrichment is reused, recomputed, or left empty.

use crate::error::EnrichError;
use crate::models::{EnrichmentResult, Entity, RawRecord};
use crate::traits::TextEnricher;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentPlan {
    /// The record already carries chunks and embeddings; use them verbatim.
    Reuse(EnrichmentResult),
    /// Run the enricher over the abstract.
    Compute,
    /// Nothing to enrich.
    Empty,
}

/// A carried-over result wins whenever it has both chunks and embeddings,
/// even if their lengths disagree; the writer flags that case.
pub fn plan_enrichment(existing: Option<EnrichmentResult>, abstract_text: &str) -> EnrichmentPlan {
    match existing {
        Some(result) if result.has_vectors() => EnrichmentPlan::Reuse(result),
        _ if !abstract_text.trim().is_empty() => EnrichmentPlan::Compute,
        _ => EnrichmentPlan::Empty,
    }
}

pub async fn enrich_if_needed<E>(
    raw: &RawRecord,
    abstract_text: &str,
    enricher: &E,
) -> Result<EnrichmentResult, EnrichError>
where
    E: TextEnricher + ?Sized,
{
    match plan_enrichment(carried_enrichment(raw), abstract_text) {
        EnrichmentPlan::Reuse(result) => Ok(result),
        EnrichmentPlan::Compute => enricher.enrich(abstract_text).await,
        EnrichmentPlan::Empty => Ok(EnrichmentResult::default()),
    }
}

/// Reads enrichment left on a record by an earlier pass, if any field is present.
pub fn carried_enrichment(raw: &RawRecord) -> Option<EnrichmentResult> {
    let chunks = raw.get("chunks");
    let embeddings = raw.get("embeddings");
    let entities = first_present(raw, &["entities", "spacy_entities"]);
    let matched_terms = first_present(raw, &["matched_terms", "spacy_matched_terms"]);

    if chunks.is_none() && embeddings.is_none() && entities.is_none() && matched_terms.is_none() {
        return None;
    }

    Some(EnrichmentResult {
        entities: entities.map(parse_entities).unwrap_or_default(),
        matched_terms: matched_terms.map(parse_matched_terms).unwrap_or_default(),
        chunks: chunks.map(parse_chunks).unwrap_or_default(),
        embeddings: embeddings.map(parse_embeddings).unwrap_or_default(),
    })
}

fn first_present<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn parse_strings(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// One entry per element, like `parse_embeddings`, so chunk `i` still pairs
/// with embedding `i`; a non-string element becomes an empty chunk.
fn parse_chunks(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| item.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Keeps one entry per element so positions stay aligned with chunks; an
/// element that is not an array of numbers becomes an empty vector.
fn parse_embeddings(value: &Value) -> Vec<Vec<f32>> {
    value
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .and_then(|components| {
                            components
                                .iter()
                                .map(|component| component.as_f64().map(|number| number as f32))
                                .collect::<Option<Vec<f32>>>()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_entities(value: &Value) -> Vec<Entity> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(Entity {
                text: text.clone(),
                label: String::new(),
            }),
            Value::Array(pair) => {
                let text = pair.first()?.as_str()?.to_string();
                let label = pair
                    .get(1)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(Entity { text, label })
            }
            Value::Object(fields) => {
                let text = fields.get("text")?.as_str()?.to_string();
                let label = fields
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(Entity { text, label })
            }
            _ => None,
        })
        .collect()
}

fn parse_matched_terms(value: &Value) -> BTreeMap<String, Vec<String>> {
    value
        .as_object()
        .map(|categories| {
            categories
                .iter()
                .map(|(category, terms)| (category.clone(), parse_strings(terms)))
                .collect()
        })
        .unwrap_or_default()
}
