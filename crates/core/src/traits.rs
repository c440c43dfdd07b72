use crate::{
    ChunkRecord, EnrichError, EnrichmentResult, IngestError, PaperDocument, RawRecord, SourceTag,
    StoreError,
};
use async_trait::async_trait;

#[async_trait]
pub trait DocumentStore {
    async fn insert(&self, document: &PaperDocument) -> Result<(), StoreError>;
}

/// Upserts are keyed by `ChunkRecord::chunk_id`; writing the same id twice overwrites.
#[async_trait]
pub trait VectorIndex {
    async fn upsert(&self, record: &ChunkRecord) -> Result<(), StoreError>;
}

/// Produces entities, matched terms, chunks and one embedding per chunk.
#[async_trait]
pub trait TextEnricher {
    async fn enrich(&self, text: &str) -> Result<EnrichmentResult, EnrichError>;
}

#[async_trait]
pub trait SourceAdapter {
    fn source(&self) -> SourceTag;

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        year_range: (u32, u32),
    ) -> Result<Vec<RawRecord>, IngestError>;
}
