//! Error types for the annotator core library.

/// Top-level error enum for the annotator core library.
#[derive(Debug, thiserror::Error)]
pub enum AnnotatorError {
    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl From<quick_xml::events::attributes::AttrError> for AnnotatorError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        AnnotatorError::Xml(quick_xml::Error::from(err))
    }
}

pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
