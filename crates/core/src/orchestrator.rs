use crate::enrichment::enrich_if_needed;
use crate::normalize::normalize;
use crate::traits::{DocumentStore, TextEnricher, VectorIndex};
use crate::writer::{PaperWriter, WriteOutcome};
use crate::{IngestError, IngestionOptions, RawRecord, SourceTag};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    /// Zero-based position in the input batch.
    pub position: usize,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub source: Option<SourceTag>,
    pub records_seen: usize,
    pub documents_inserted: usize,
    pub chunks_upserted: usize,
    pub skipped_chunks: usize,
    /// Papers whose document was stored but whose vectors were skipped.
    pub papers_without_vectors: Vec<String>,
    pub failed_records: Vec<FailedRecord>,
}

impl BatchReport {
    fn empty(source: Option<SourceTag>) -> Self {
        Self {
            source,
            records_seen: 0,
            documents_inserted: 0,
            chunks_upserted: 0,
            skipped_chunks: 0,
            papers_without_vectors: Vec::new(),
            failed_records: Vec::new(),
        }
    }

    fn absorb(&mut self, outcome: WriteOutcome) {
        self.documents_inserted += 1;
        self.chunks_upserted += outcome.chunks_upserted;
        self.skipped_chunks += outcome.skipped_chunks.len();
        if outcome.vectors_skipped {
            self.papers_without_vectors.push(outcome.paper_id);
        }
    }
}

/// Normalize, enrich and write records one at a time.
pub struct IngestionPipeline<D, V, E>
where
    D: DocumentStore,
    V: VectorIndex,
    E: TextEnricher,
{
    writer: PaperWriter<D, V>,
    enricher: E,
}

impl<D, V, E> IngestionPipeline<D, V, E>
where
    D: DocumentStore + Send + Sync,
    V: VectorIndex + Send + Sync,
    E: TextEnricher + Send + Sync,
{
    pub fn new(documents: D, vectors: V, enricher: E, options: &IngestionOptions) -> Self {
        Self {
            writer: PaperWriter::new(documents, vectors, options.paper_ids),
            enricher,
        }
    }

    pub fn writer(&self) -> &PaperWriter<D, V> {
        &self.writer
    }

    /// Saves a batch tagged with a source label.
    ///
    /// An empty batch is a no-op whatever the tag. Otherwise an unsupported
    /// tag fails before anything is written; per-record failures are collected
    /// in the report and the batch continues.
    pub async fn save_batch(
        &self,
        records: &[RawRecord],
        source: &str,
    ) -> Result<BatchReport, IngestError> {
        if records.is_empty() {
            info!("no records to save");
            return Ok(BatchReport::empty(None));
        }

        let tag = source.parse::<SourceTag>()?;
        Ok(self.save_batch_for(records, tag).await)
    }

    pub async fn save_batch_for(&self, records: &[RawRecord], source: SourceTag) -> BatchReport {
        let mut report = BatchReport::empty(Some(source));
        if records.is_empty() {
            info!(source = %source, "no records to save");
            return report;
        }

        let total = records.len();
        for (position, raw) in records.iter().enumerate() {
            report.records_seen += 1;
            let paper = normalize(raw, source);
            debug!(
                source = %source,
                record = position + 1,
                total,
                title = %paper.title,
                "saving record"
            );

            let enrichment = match enrich_if_needed(raw, &paper.abstract_text, &self.enricher).await
            {
                Ok(enrichment) => enrichment,
                Err(error) => {
                    warn!(source = %source, record = position + 1, %error, "enrichment failed");
                    report.failed_records.push(FailedRecord {
                        position,
                        title: paper.title.clone(),
                        reason: IngestError::from(error).to_string(),
                    });
                    continue;
                }
            };

            match self.writer.write(&paper, &enrichment).await {
                Ok(outcome) => report.absorb(outcome),
                Err(error) => {
                    warn!(source = %source, record = position + 1, %error, "document write failed");
                    report.failed_records.push(FailedRecord {
                        position,
                        title: paper.title.clone(),
                        reason: IngestError::from(error).to_string(),
                    });
                }
            }
        }

        info!(
            source = %source,
            records = report.records_seen,
            documents = report.documents_inserted,
            chunks = report.chunks_upserted,
            skipped_chunks = report.skipped_chunks,
            papers_without_vectors = report.papers_without_vectors.len(),
            failed = report.failed_records.len(),
            "all {source} records processed"
        );

        report
    }
}
