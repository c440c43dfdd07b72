pub mod memory;
pub mod mongo;
pub mod qdrant;

pub use memory::{InMemoryDocumentStore, InMemoryVectorIndex};
pub use mongo::MongoDocumentStore;
pub use qdrant::QdrantStore;
