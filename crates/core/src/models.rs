use crate::error::IngestError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A record in the native shape of the source it was fetched from.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub const MAX_STORED_ENTITIES: usize = 200;
pub const MAX_STORED_TERMS_PER_CATEGORY: usize = 50;
pub const MAX_CHUNK_METADATA_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceTag {
    #[serde(rename = "PubMed")]
    PubMed,
    #[serde(rename = "Europe PMC")]
    EuropePmc,
    #[serde(rename = "Semantic Scholar")]
    SemanticScholar,
    #[serde(rename = "Google Scholar")]
    GoogleScholar,
    #[serde(rename = "EatRight")]
    EatRight,
    #[serde(rename = "Dietary Guidelines")]
    DietaryGuidelines,
}

impl SourceTag {
    pub const ALL: [SourceTag; 6] = [
        SourceTag::PubMed,
        SourceTag::EuropePmc,
        SourceTag::SemanticScholar,
        SourceTag::GoogleScholar,
        SourceTag::EatRight,
        SourceTag::DietaryGuidelines,
    ];

    /// Label written into stored documents and vector metadata.
    pub fn label(&self) -> &'static str {
        match self {
            SourceTag::PubMed => "PubMed",
            SourceTag::EuropePmc => "Europe PMC",
            SourceTag::SemanticScholar => "Semantic Scholar",
            SourceTag::GoogleScholar => "Google Scholar",
            SourceTag::EatRight => "EatRight",
            SourceTag::DietaryGuidelines => "Dietary Guidelines",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parses any spelling of a source label: case, spaces, `-` and `_` are ignored.
impl FromStr for SourceTag {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "pubmed" => Ok(SourceTag::PubMed),
            "europepmc" => Ok(SourceTag::EuropePmc),
            "semanticscholar" => Ok(SourceTag::SemanticScholar),
            "googlescholar" => Ok(SourceTag::GoogleScholar),
            "eatright" => Ok(SourceTag::EatRight),
            "dietaryguidelines" => Ok(SourceTag::DietaryGuidelines),
            _ => Err(IngestError::UnsupportedSource(value.to_string())),
        }
    }
}

/// Author credits as the source reports them: some sources give a list,
/// others a single pre-joined string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Authors {
    List(Vec<String>),
    Joined(String),
}

impl Authors {
    pub fn is_empty(&self) -> bool {
        match self {
            Authors::List(names) => names.is_empty(),
            Authors::Joined(names) => names.trim().is_empty(),
        }
    }
}

impl Default for Authors {
    fn default() -> Self {
        Authors::List(Vec::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalPaper {
    pub title: String,
    pub authors: Authors,
    pub year: u32,
    pub source: SourceTag,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub doi: String,
    pub journal: String,
    pub last_updated: String,
    /// Page the record was scraped from, when the source has one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentResult {
    pub entities: Vec<Entity>,
    pub matched_terms: BTreeMap<String, Vec<String>>,
    pub chunks: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
}

impl EnrichmentResult {
    pub fn is_aligned(&self) -> bool {
        self.chunks.len() == self.embeddings.len()
    }

    /// True when both chunks and embeddings are present, whatever their lengths.
    pub fn has_vectors(&self) -> bool {
        !self.chunks.is_empty() && !self.embeddings.is_empty()
    }
}

/// Payload inserted into the document store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperDocument {
    pub paper_id: String,
    #[serde(flatten)]
    pub paper: CanonicalPaper,
    pub entities: Vec<Entity>,
    pub matched_terms: BTreeMap<String, Vec<String>>,
    pub chunks: Vec<String>,
    pub ingested_at: DateTime<Utc>,
}

impl PaperDocument {
    pub fn new(paper_id: String, paper: &CanonicalPaper, enrichment: &EnrichmentResult) -> Self {
        Self {
            paper_id,
            paper: paper.clone(),
            entities: enrichment
                .entities
                .iter()
                .take(MAX_STORED_ENTITIES)
                .cloned()
                .collect(),
            matched_terms: enrichment
                .matched_terms
                .iter()
                .map(|(category, terms)| {
                    let kept = terms
                        .iter()
                        .take(MAX_STORED_TERMS_PER_CATEGORY)
                        .cloned()
                        .collect();
                    (category.clone(), kept)
                })
                .collect(),
            chunks: enrichment.chunks.clone(),
            ingested_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub paper_id: String,
    pub chunk_idx: usize,
    pub chunk_text: String,
    pub title: String,
    pub source: SourceTag,
    pub year: u32,
    pub doi: String,
    /// First keyword of the paper.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub topic: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
}

/// One vector-index entry; re-upserting the same `chunk_id` overwrites it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

impl ChunkRecord {
    pub fn new(
        paper_id: &str,
        index: usize,
        chunk_text: &str,
        embedding: Vec<f32>,
        paper: &CanonicalPaper,
    ) -> Self {
        Self {
            chunk_id: chunk_id(paper_id, index),
            embedding,
            metadata: ChunkMetadata {
                paper_id: paper_id.to_string(),
                chunk_idx: index,
                chunk_text: chunk_text.chars().take(MAX_CHUNK_METADATA_CHARS).collect(),
                title: paper.title.clone(),
                source: paper.source,
                year: paper.year,
                doi: paper.doi.clone(),
                topic: paper.keywords.first().cloned().unwrap_or_default(),
                link: paper.link.clone(),
            },
        }
    }
}

pub fn chunk_id(paper_id: &str, index: usize) -> String {
    format!("{paper_id}_chunk_{index}")
}

/// How the writer assigns `paper_id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PaperIdStrategy {
    /// A fresh UUIDv4 on every write. Re-ingesting a paper creates a new
    /// document and a new set of chunk ids.
    #[default]
    Random,
    /// Derived from source, DOI (or title and year), so chunk ids are stable
    /// across runs and vector upserts converge.
    ContentHash,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub paper_ids: PaperIdStrategy,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 600,
            chunk_overlap_chars: 60,
            paper_ids: PaperIdStrategy::Random,
        }
    }
}
