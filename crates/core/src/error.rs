use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("enrichment failed: {0}")]
    Enrich(#[from] EnrichError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bson error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("enricher backend failed: {0}")]
    Backend(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
