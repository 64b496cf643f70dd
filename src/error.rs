use thiserror::Error;

pub type Result<T> = std::result::Result<T, Doc2VecError>;

/// Every failure the builder can report. Variants carry the record, document,
/// term or config field needed to track the problem down.
#[derive(Debug, Error)]
pub enum Doc2VecError {
    #[error("record {record} is malformed: missing or invalid `{field}`")]
    MalformedRecord { record: usize, field: &'static str },

    #[error("record {record} is not valid json: {source}")]
    UnparsableRecord { record: usize, source: serde_json::Error },

    #[error("no term reaches min_term_count={min_count} ({distinct_terms} distinct terms seen)")]
    EmptyVocabulary { min_count: usize, distinct_terms: usize },

    #[error("empty tag set{}", .document.map(|d| format!(" for document {}", d)).unwrap_or_default())]
    EmptyTagSet { document: Option<usize> },

    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("none of the held-out documents could be scored ({excluded} excluded)")]
    NoScorableDocuments { excluded: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error(transparent)]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Doc2VecError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Doc2VecError::InvalidConfiguration { field, reason: reason.into() }
    }
}
