use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use nutri_ingest_core::{
    BatchReport, ChunkingConfig, DocumentStore, InMemoryDocumentStore, InMemoryVectorIndex,
    IngestionOptions, IngestionPipeline, RecordFileSource, LocalEnricher, MongoDocumentStore,
    PaperIdStrategy, QdrantStore, RawRecord, SourceAdapter, SourceTag, VectorIndex,
    EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nutri-ingest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// MongoDB connection string
    #[arg(long, env = "MONGO_URI", default_value = "mongodb://localhost:27017/")]
    mongo_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGO_DB", default_value = "nutrition")]
    mongo_db: String,

    /// MongoDB collection for paper documents
    #[arg(long, env = "MONGO_COLLECTION", default_value = "papers")]
    mongo_collection: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection for chunk vectors
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "papers")]
    qdrant_collection: String,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY")]
    qdrant_api_key: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Replay exported source records into the document store and vector index.
    Ingest {
        /// Source the records came from, e.g. "PubMed" or "europe-pmc".
        #[arg(long)]
        source: String,
        /// JSON, JSON Lines or CSV file, or a folder searched recursively.
        #[arg(long)]
        input: PathBuf,
        /// Query the export was produced with (recorded in logs only).
        #[arg(long, default_value = "")]
        query: String,
        /// Maximum number of records to ingest; all of them when omitted.
        #[arg(long)]
        max_results: Option<usize>,
        /// Earliest publication year to keep; unknown years are always kept.
        #[arg(long, default_value = "0")]
        from_year: u32,
        /// Latest publication year to keep.
        #[arg(long, default_value = "9999")]
        to_year: u32,
        /// Derive paper ids from content so re-ingestion overwrites vectors.
        #[arg(long, default_value_t = false)]
        stable_ids: bool,
        /// Write to in-memory stores instead of MongoDB and Qdrant.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Dump every stored paper document as JSON Lines.
    Export {
        #[arg(long, default_value = "papers.jsonl")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "nutri-ingest boot"
    );

    match cli.command {
        Command::Ingest {
            ref source,
            ref input,
            ref query,
            max_results,
            from_year,
            to_year,
            stable_ids,
            dry_run,
        } => {
            let source: SourceTag = source.parse()?;
            let options = IngestionOptions {
                paper_ids: if stable_ids {
                    PaperIdStrategy::ContentHash
                } else {
                    PaperIdStrategy::Random
                },
                ..IngestionOptions::default()
            };

            let adapter = RecordFileSource::new(input, source);
            let records = adapter
                .search(query, max_results.unwrap_or(usize::MAX), (from_year, to_year))
                .await
                .with_context(|| format!("reading records from {}", input.display()))?;
            info!(
                source = %source,
                input = %input.display(),
                query = %query,
                records = records.len(),
                "records loaded"
            );

            let report = if dry_run {
                ingest(
                    InMemoryDocumentStore::default(),
                    InMemoryVectorIndex::default(),
                    &records,
                    source,
                    &options,
                )
                .await?
            } else {
                let documents =
                    MongoDocumentStore::connect(&cli.mongo_uri, &cli.mongo_db, &cli.mongo_collection)
                        .await?;
                let vectors =
                    QdrantStore::new(&cli.qdrant_url, &cli.qdrant_collection, EMBEDDING_DIMENSIONS)?
                        .with_api_key(cli.qdrant_api_key.clone());
                vectors.ensure_collection(EMBEDDING_DIMENSIONS).await?;
                ingest(documents, vectors, &records, source, &options).await?
            };

            print_report(&report);
        }
        Command::Export { output } => {
            let documents =
                MongoDocumentStore::connect(&cli.mongo_uri, &cli.mongo_db, &cli.mongo_collection)
                    .await?;
            let file = File::create(&output)
                .await
                .with_context(|| format!("creating {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            let count = documents.export_jsonl(&mut writer).await?;

            println!(
                "{} documents from {} exported to {}",
                count,
                documents.collection_name(),
                output.display()
            );
        }
    }

    Ok(())
}

async fn ingest<D, V>(
    documents: D,
    vectors: V,
    records: &[RawRecord],
    source: SourceTag,
    options: &IngestionOptions,
) -> anyhow::Result<BatchReport>
where
    D: DocumentStore + Send + Sync,
    V: VectorIndex + Send + Sync,
{
    let enricher = LocalEnricher::new(ChunkingConfig::from(options))?;
    let pipeline = IngestionPipeline::new(documents, vectors, enricher, options);
    Ok(pipeline.save_batch_for(records, source).await)
}

fn print_report(report: &BatchReport) {
    if report.records_seen == 0 {
        println!("No articles to save.");
        return;
    }

    let source = report.source.map(|tag| tag.label()).unwrap_or_default();

    for failed in &report.failed_records {
        warn!(position = failed.position, title = %failed.title, reason = %failed.reason, "record not saved");
    }

    println!(
        "{} {} records: {} documents inserted, {} chunks upserted, {} chunks skipped, {} papers without vectors, {} failed at {}",
        report.records_seen,
        source,
        report.documents_inserted,
        report.chunks_upserted,
        report.skipped_chunks,
        report.papers_without_vectors.len(),
        report.failed_records.len(),
        Utc::now().to_rfc3339()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_store_flag_has_an_env_fallback() {
        let command = Cli::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
                .map(OsStr::to_os_string)
        };

        for (id, variable) in [
            ("mongo_uri", "MONGO_URI"),
            ("mongo_db", "MONGO_DB"),
            ("mongo_collection", "MONGO_COLLECTION"),
            ("qdrant_url", "QDRANT_URL"),
            ("qdrant_collection", "QDRANT_COLLECTION"),
            ("qdrant_api_key", "QDRANT_API_KEY"),
        ] {
            assert_eq!(env_of(id), Some(variable.into()), "{id}");
        }
    }

    #[test]
    fn ingest_has_no_record_cap_unless_asked() {
        let cli = Cli::try_parse_from([
            "nutri-ingest",
            "ingest",
            "--source",
            "EatRight",
            "--input",
            "eatright_articles.csv",
        ])
        .expect("valid arguments");
        assert!(matches!(cli.command, Command::Ingest { max_results: None, .. }));

        let cli = Cli::try_parse_from([
            "nutri-ingest",
            "ingest",
            "--source",
            "PubMed",
            "--input",
            "pubmed.json",
            "--max-results",
            "5",
        ])
        .expect("valid arguments");
        assert!(matches!(cli.command, Command::Ingest { max_results: Some(5), .. }));
    }
}
