use crate::traits::{DocumentStore, VectorIndex};
use crate::{ChunkRecord, PaperDocument, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Append-only document store; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<Vec<PaperDocument>>>,
}

impl InMemoryDocumentStore {
    fn guard(&self) -> MutexGuard<'_, Vec<PaperDocument>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn all(&self) -> Vec<PaperDocument> {
        self.guard().clone()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: &PaperDocument) -> Result<(), StoreError> {
        self.guard().push(document.clone());
        Ok(())
    }
}

/// Vector index keyed by chunk id; clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorIndex {
    records: Arc<Mutex<BTreeMap<String, ChunkRecord>>>,
}

impl InMemoryVectorIndex {
    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, ChunkRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Chunk ids in key order.
    pub fn ids(&self) -> Vec<String> {
        self.guard().keys().cloned().collect()
    }

    pub fn get(&self, chunk_id: &str) -> Option<ChunkRecord> {
        self.guard().get(chunk_id).cloned()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, record: &ChunkRecord) -> Result<(), StoreError> {
        self.guard().insert(record.chunk_id.clone(), record.clone());
        Ok(())
    }
}
