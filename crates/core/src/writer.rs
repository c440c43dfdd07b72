//! Writes one paper to the document store, then its chunk vectors to the index.
//!
//! The two stores are not written atomically. A document insert that succeeds
//! stays even when some or all vector upserts are skipped; callers reconcile
//! through `paper_id`.

use crate::embeddings::EMBEDDING_DIMENSIONS;
use crate::models::{CanonicalPaper, ChunkRecord, EnrichmentResult, PaperDocument, PaperIdStrategy};
use crate::traits::{DocumentStore, VectorIndex};
use crate::StoreError;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChunk {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub paper_id: String,
    pub chunks_upserted: usize,
    /// Set when chunk and embedding counts disagreed and no vectors were written.
    pub vectors_skipped: bool,
    pub skipped_chunks: Vec<SkippedChunk>,
}

pub struct PaperWriter<D, V>
where
    D: DocumentStore,
    V: VectorIndex,
{
    documents: D,
    vectors: V,
    paper_ids: PaperIdStrategy,
}

impl<D, V> PaperWriter<D, V>
where
    D: DocumentStore + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    pub fn new(documents: D, vectors: V, paper_ids: PaperIdStrategy) -> Self {
        Self {
            documents,
            vectors,
            paper_ids,
        }
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn vectors(&self) -> &V {
        &self.vectors
    }

    pub async fn write(
        &self,
        paper: &CanonicalPaper,
        enrichment: &EnrichmentResult,
    ) -> Result<WriteOutcome, StoreError> {
        let paper_id = generate_paper_id(self.paper_ids, paper, enrichment);
        let document = PaperDocument::new(paper_id.clone(), paper, enrichment);
        self.documents.insert(&document).await?;

        let mut outcome = WriteOutcome {
            paper_id,
            chunks_upserted: 0,
            vectors_skipped: false,
            skipped_chunks: Vec::new(),
        };

        if !enrichment.is_aligned() {
            warn!(
                paper_id = %outcome.paper_id,
                embeddings = enrichment.embeddings.len(),
                chunks = enrichment.chunks.len(),
                "embedding and chunk counts differ; skipping vector writes"
            );
            outcome.vectors_skipped = true;
            return Ok(outcome);
        }

        for (index, (chunk, embedding)) in enrichment
            .chunks
            .iter()
            .zip(enrichment.embeddings.iter())
            .enumerate()
        {
            if embedding.len() != EMBEDDING_DIMENSIONS {
                warn!(
                    paper_id = %outcome.paper_id,
                    chunk = index,
                    dimensions = embedding.len(),
                    "invalid embedding shape; skipping chunk"
                );
                outcome.skipped_chunks.push(SkippedChunk {
                    index,
                    reason: format!(
                        "embedding has {} dimensions, expected {}",
                        embedding.len(),
                        EMBEDDING_DIMENSIONS
                    ),
                });
                continue;
            }

            let record = ChunkRecord::new(&outcome.paper_id, index, chunk, embedding.clone(), paper);
            match self.vectors.upsert(&record).await {
                Ok(()) => outcome.chunks_upserted += 1,
                Err(error) => {
                    warn!(
                        paper_id = %outcome.paper_id,
                        chunk = index,
                        %error,
                        "vector upsert failed; skipping chunk"
                    );
                    outcome.skipped_chunks.push(SkippedChunk {
                        index,
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }
}

pub fn generate_paper_id(
    strategy: PaperIdStrategy,
    paper: &CanonicalPaper,
    enrichment: &EnrichmentResult,
) -> String {
    match strategy {
        PaperIdStrategy::Random => Uuid::new_v4().to_string(),
        PaperIdStrategy::ContentHash => content_paper_id(paper, enrichment),
    }
}

/// Hashes source and DOI. Without a DOI, title, year, link, abstract and
/// chunk texts all go in, so untitled tip sheets stay apart.
fn content_paper_id(paper: &CanonicalPaper, enrichment: &EnrichmentResult) -> String {
    let mut hasher = Sha256::new();
    hasher.update(paper.source.label().as_bytes());
    hasher.update([0u8]);

    let doi = paper.doi.trim().to_lowercase();
    if doi.is_empty() {
        hasher.update(paper.title.trim().to_lowercase().as_bytes());
        hasher.update([0u8]);
        hasher.update(paper.year.to_le_bytes());
        for text in [&paper.link, &paper.abstract_text]
            .into_iter()
            .chain(enrichment.chunks.iter())
        {
            hasher.update([0u8]);
            hasher.update(text.as_bytes());
        }
    } else {
        hasher.update(doi.as_bytes());
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}
