use crate::traits::DocumentStore;
use crate::{PaperDocument, StoreError};
use async_trait::async_trait;
use futures_util::{TryStream, TryStreamExt};
use mongodb::bson::{doc, to_document, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

pub struct MongoDocumentStore {
    collection: Collection<Document>,
}

impl MongoDocumentStore {
    /// Connects and pings the server so a bad URI fails before the first insert.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;

        info!(database, collection, "connected to mongodb");
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }

    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    /// Writes every stored document as one relaxed extended-JSON line and
    /// returns how many were written.
    pub async fn export_jsonl<W>(&self, writer: &mut W) -> Result<usize, StoreError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let cursor = self.collection.find(None, None).await?;
        write_json_lines(cursor, writer).await
    }
}

async fn write_json_lines<S, W>(mut documents: S, writer: &mut W) -> Result<usize, StoreError>
where
    S: TryStream<Ok = Document> + Unpin,
    StoreError: From<S::Error>,
    W: AsyncWrite + Unpin,
{
    let mut count = 0usize;
    while let Some(document) = documents.try_next().await? {
        let mut line = document_to_json_line(document)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        count += 1;
    }

    writer.flush().await?;
    Ok(count)
}

pub fn to_bson_document(document: &PaperDocument) -> Result<Document, StoreError> {
    Ok(to_document(document)?)
}

fn document_to_json_line(document: Document) -> Result<String, StoreError> {
    Ok(serde_json::to_string(
        &Bson::Document(document).into_relaxed_extjson(),
    )?)
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert(&self, document: &PaperDocument) -> Result<(), StoreError> {
        let bson_document = to_bson_document(document)?;
        self.collection.insert_one(bson_document, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Authors, CanonicalPaper, EnrichmentResult, SourceTag};

    fn document() -> PaperDocument {
        let paper = CanonicalPaper {
            title: "Food waste".to_string(),
            authors: Authors::Joined("EatRight staff".to_string()),
            year: 2023,
            source: SourceTag::EatRight,
            abstract_text: "Plan meals.".to_string(),
            keywords: vec!["waste".to_string()],
            doi: String::new(),
            journal: String::new(),
            last_updated: String::new(),
            link: String::new(),
        };
        let enrichment = EnrichmentResult {
            chunks: vec!["Plan meals.".to_string()],
            ..Default::default()
        };
        PaperDocument::new("paper-9".to_string(), &paper, &enrichment)
    }

    #[test]
    fn paper_document_converts_to_flat_bson() -> Result<(), StoreError> {
        let converted = to_bson_document(&document())?;
        assert_eq!(converted.get_str("paper_id").ok(), Some("paper-9"));
        assert_eq!(converted.get_str("source").ok(), Some("EatRight"));
        assert_eq!(converted.get_str("authors").ok(), Some("EatRight staff"));
        assert_eq!(converted.get_str("abstract").ok(), Some("Plan meals."));
        assert!(converted.get_array("chunks").is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn export_writes_one_line_per_document() -> Result<(), StoreError> {
        let documents = futures_util::stream::iter(vec![
            Ok::<_, StoreError>(doc! { "title": "Food waste" }),
            Ok(doc! { "title": "Smart snacking", "year": 2024 }),
        ]);
        let mut buffer = Vec::new();

        let count = write_json_lines(documents, &mut buffer).await?;

        let text = String::from_utf8(buffer).expect("utf-8 output");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(count, 2);
        assert_eq!(lines.len(), 2);
        assert!(text.ends_with('\n'));
        assert_eq!(serde_json::from_str::<serde_json::Value>(lines[1])?["year"], 2024);
        Ok(())
    }

    #[tokio::test]
    async fn export_stops_at_the_first_cursor_error() {
        let documents = futures_util::stream::iter(vec![
            Ok(doc! { "title": "kept" }),
            Err(StoreError::Request("cursor closed".to_string())),
            Ok(doc! { "title": "never read" }),
        ]);
        let mut buffer = Vec::new();

        let result = write_json_lines(documents, &mut buffer).await;

        assert!(matches!(result, Err(StoreError::Request(_))));
        assert_eq!(String::from_utf8_lossy(&buffer).lines().count(), 1);
    }

    #[test]
    fn exported_lines_are_relaxed_json() -> Result<(), StoreError> {
        let line = document_to_json_line(doc! { "title": "Food waste", "year": 2023 })?;
        let parsed: serde_json::Value = serde_json::from_str(&line)?;
        assert_eq!(parsed["title"], "Food waste");
        assert_eq!(parsed["year"], 2023);
        Ok(())
    }
}
