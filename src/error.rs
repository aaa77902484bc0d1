use std::path::PathBuf;

use thiserror::Error;

/// Conditions the pipeline treats as fatal for a run or a batch.
///
/// Anything not listed here travels as a plain `anyhow::Error`.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("missing {0} in environment (.env)")]
    MissingCredential(&'static str),

    #[error("reference corpus folder not found: {0}")]
    MissingCorpus(PathBuf),

    #[error("no reference documents found in '{0}'")]
    EmptyCorpus(PathBuf),

    #[error("index artefact not found: {0} (run `doc-reviewer index` first)")]
    MissingIndex(PathBuf),

    #[error("index holds {vectors} vectors but {chunks} chunks")]
    IndexIntegrity { vectors: usize, chunks: usize },

    #[error("malformed index file: {0}")]
    IndexFormat(String),

    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(PathBuf),

    #[error("no .docx or .pdf files found in '{0}'")]
    NoDocuments(PathBuf),

    #[error("docx error: {0}")]
    Docx(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}
