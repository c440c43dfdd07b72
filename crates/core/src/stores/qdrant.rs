use crate::traits::VectorIndex;
use crate::{ChunkRecord, StoreError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

pub struct QdrantStore {
    endpoint: Url,
    collection: String,
    client: Client,
    vector_size: usize,
    api_key: Option<String>,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, StoreError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            collection: collection.into(),
            client: Client::new(),
            vector_size,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self, suffix: &str) -> Result<Url, StoreError> {
        Ok(self
            .endpoint
            .join(&format!("collections/{}{}", self.collection, suffix))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    /// Creates the collection with cosine distance when it does not exist yet.
    pub async fn ensure_collection(&self, vector_size: usize) -> Result<(), StoreError> {
        if self.vector_size != vector_size {
            return Err(StoreError::Request(format!(
                "configured vector size {} does not match requested {}",
                self.vector_size, vector_size
            )));
        }

        let response = self
            .authorize(self.client.get(self.collection_url("")?))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .authorize(self.client.put(self.collection_url("")?))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

/// Qdrant only accepts integer or UUID point ids, so the chunk id is mapped
/// to a name-based UUID and kept verbatim in the payload.
pub fn point_id(chunk_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, chunk_id.as_bytes())
}

pub fn point_payload(record: &ChunkRecord) -> Value {
    let metadata = &record.metadata;
    let mut payload = json!({
        "chunk_id": record.chunk_id,
        "paper_id": metadata.paper_id,
        "chunk_idx": metadata.chunk_idx,
        "chunk_text": metadata.chunk_text,
        "title": metadata.title,
        "source": metadata.source,
        "year": metadata.year,
        "doi": metadata.doi,
    });
    for (key, value) in [("topic", &metadata.topic), ("link", &metadata.link)] {
        if !value.is_empty() {
            payload[key] = json!(value);
        }
    }
    payload
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn upsert(&self, record: &ChunkRecord) -> Result<(), StoreError> {
        if record.embedding.len() != self.vector_size {
            return Err(StoreError::Request(format!(
                "embedding dimension {} != {}",
                record.embedding.len(),
                self.vector_size
            )));
        }

        let point = json!({
            "id": point_id(&record.chunk_id).to_string(),
            "vector": record.embedding,
            "payload": point_payload(record),
        });

        let response = self
            .authorize(self.client.put(self.collection_url("/points?wait=true")?))
            .json(&json!({ "points": [point] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Authors, CanonicalPaper, SourceTag};

    fn record_paper() -> CanonicalPaper {
        CanonicalPaper {
            title: "Snacking tips".to_string(),
            authors: Authors::default(),
            year: 2023,
            source: SourceTag::EatRight,
            abstract_text: String::new(),
            keywords: Vec::new(),
            doi: String::new(),
            journal: String::new(),
            last_updated: String::new(),
            link: String::new(),
        }
    }

    fn record() -> ChunkRecord {
        ChunkRecord::new("paper-1", 2, "Keep fruit visible.", vec![0.0; 384], &record_paper())
    }

    #[test]
    fn point_ids_are_stable_per_chunk_id() {
        assert_eq!(point_id("paper-1_chunk_2"), point_id("paper-1_chunk_2"));
        assert_ne!(point_id("paper-1_chunk_2"), point_id("paper-1_chunk_3"));
    }

    #[test]
    fn payload_keeps_chunk_id_and_metadata() {
        let payload = point_payload(&record());
        assert_eq!(payload["chunk_id"], "paper-1_chunk_2");
        assert_eq!(payload["chunk_idx"], 2);
        assert_eq!(payload["source"], "EatRight");
        assert_eq!(payload["year"], 2023);
        assert_eq!(payload["chunk_text"], "Keep fruit visible.");
    }

    #[test]
    fn payload_carries_topic_and_link_only_when_known() {
        assert!(point_payload(&record()).get("link").is_none());

        let paper = CanonicalPaper {
            keywords: vec!["healthy eating".to_string()],
            link: "https://www.eatright.org/food/snacks".to_string(),
            ..record_paper()
        };
        let payload = point_payload(&ChunkRecord::new("paper-2", 0, "Snack smart.", vec![0.0; 384], &paper));
        assert_eq!(payload["topic"], "healthy eating");
        assert_eq!(payload["link"], "https://www.eatright.org/food/snacks");
    }

    #[test]
    fn collection_urls_keep_endpoint_path() -> Result<(), StoreError> {
        let store = QdrantStore::new("http://localhost:6333/qdrant", "papers", 384)?;
        assert_eq!(
            store.collection_url("/points?wait=true")?.as_str(),
            "http://localhost:6333/qdrant/collections/papers/points?wait=true"
        );
        Ok(())
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        assert!(matches!(
            QdrantStore::new("not a url", "papers", 384),
            Err(StoreError::Url(_))
        ));
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected_before_any_request() {
        let store = QdrantStore::new("http://127.0.0.1:9", "papers", 384).expect("valid url");
        let mut bad = record();
        bad.embedding.truncate(10);
        let result = store.upsert(&bad).await;
        assert!(matches!(result, Err(StoreError::Request(_))));
    }
}
