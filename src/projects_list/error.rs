use thiserror::Error;

/// A reserved header field that held something other than valid JSON.
#[derive(Error, Debug)]
#[error("Malformed `{field}` header value: {source}")]
pub struct HeaderDecodeError {
    pub field: &'static str,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Error, Debug)]
pub enum ProjectsListError {
    #[error("No file names specified")]
    EmptyInput,

    #[error("No matching files found")]
    NoMatch,

    #[error("Could not extract {id}: {reason}")]
    Extraction { id: String, reason: String },

    #[error(transparent)]
    HeaderDecode(#[from] HeaderDecodeError),

    #[error("Could not write {id}: {reason}")]
    Write { id: String, reason: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, ProjectsListError>;
