pub mod chunking;
pub mod embeddings;
pub mod enricher;
pub mod enrichment;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod stores;
pub mod traits;
pub mod writer;

pub use chunking::{chunk_text, normalize_whitespace, split_sentences, ChunkingConfig};
pub use embeddings::{CharacterNgramEmbedder, Embedder, EMBEDDING_DIMENSIONS};
pub use enricher::LocalEnricher;
pub use enrichment::{carried_enrichment, enrich_if_needed, plan_enrichment, EnrichmentPlan};
pub use error::{EnrichError, IngestError, StoreError};
pub use ingest::{discover_record_files, load_csv_records, load_records, RecordFileSource};
pub use models::{
    chunk_id, Authors, CanonicalPaper, ChunkMetadata, ChunkRecord, EnrichmentResult, Entity,
    IngestionOptions, PaperDocument, PaperIdStrategy, RawRecord, SourceTag,
};
pub use normalize::{coerce_year, normalize, normalize_tagged};
pub use orchestrator::{BatchReport, FailedRecord, IngestionPipeline};
pub use stores::{InMemoryDocumentStore, InMemoryVectorIndex, MongoDocumentStore, QdrantStore};
pub use traits::{DocumentStore, SourceAdapter, TextEnricher, VectorIndex};
pub use writer::{generate_paper_id, PaperWriter, SkippedChunk, WriteOutcome};
