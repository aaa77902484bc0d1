use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::ReviewError;

pub const REPORT_FILE_NAME: &str = "combined_review_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingMode {
    Http,
    Stub,
}

impl EmbeddingMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "stub" => Ok(Self::Stub),
            other => anyhow::bail!("Unsupported EMBEDDING_MODE '{other}' (expected 'http' or 'stub')"),
        }
    }
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub reviewed_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub index_path: PathBuf,
    pub texts_path: PathBuf,
    pub top_k: usize,
    pub chunk_words: usize,
    pub embedding_batch: usize,
    pub jurisdiction: String,
    pub llm: EndpointConfig,
    pub embedding_mode: EmbeddingMode,
    pub embedding: EndpointConfig,
    pub embedding_dimension: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let llm = EndpointConfig {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "qwen/qwen3-8b".to_string(),
            api_key: None,
        };
        let embedding = EndpointConfig {
            model: "all-MiniLM-L6-v2".to_string(),
            ..llm.clone()
        };
        Self {
            data_dir: PathBuf::from("data"),
            uploads_dir: PathBuf::from("uploads"),
            reviewed_dir: PathBuf::from("reviewed"),
            reports_dir: PathBuf::from("reports"),
            index_path: PathBuf::from("vectors.index"),
            texts_path: PathBuf::from("texts.json"),
            top_k: 5,
            chunk_words: 500,
            embedding_batch: 32,
            jurisdiction: "ADGM".to_string(),
            llm,
            embedding_mode: EmbeddingMode::Http,
            embedding,
            embedding_dimension: 384,
        }
    }
}

impl Settings {
    /// Read settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let path = |key: &str, fallback: PathBuf| {
            dotenv::var(key).map(PathBuf::from).unwrap_or(fallback)
        };

        let llm_base_url = dotenv::var("LLM_BASE_URL").unwrap_or(defaults.llm.base_url);
        let llm_api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
        let llm = EndpointConfig {
            base_url: llm_base_url.clone(),
            model: dotenv::var("LLM_MODEL").unwrap_or(defaults.llm.model),
            api_key: llm_api_key.clone(),
        };

        let embedding = EndpointConfig {
            base_url: dotenv::var("EMBEDDING_BASE_URL").unwrap_or(llm_base_url),
            model: dotenv::var("EMBEDDING_MODEL").unwrap_or(defaults.embedding.model),
            api_key: dotenv::var("EMBEDDING_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .or(llm_api_key),
        };

        let embedding_mode = match dotenv::var("EMBEDDING_MODE") {
            Ok(raw) => EmbeddingMode::parse(&raw)?,
            Err(_) => defaults.embedding_mode,
        };

        Ok(Self {
            data_dir: path("DATA_DIR", defaults.data_dir),
            uploads_dir: path("UPLOADS_DIR", defaults.uploads_dir),
            reviewed_dir: path("REVIEWED_DIR", defaults.reviewed_dir),
            reports_dir: path("REPORTS_DIR", defaults.reports_dir),
            index_path: path("INDEX_PATH", defaults.index_path),
            texts_path: path("TEXTS_PATH", defaults.texts_path),
            top_k: parse_number("RETRIEVAL_TOP_K", defaults.top_k)?,
            chunk_words: parse_number("CHUNK_WORDS", defaults.chunk_words)?.max(1),
            embedding_batch: parse_number("EMBEDDING_BATCH", defaults.embedding_batch)?.max(1),
            jurisdiction: dotenv::var("REVIEW_JURISDICTION").unwrap_or(defaults.jurisdiction),
            llm,
            embedding_mode,
            embedding,
            embedding_dimension: parse_number("EMBEDDING_DIMENSION", defaults.embedding_dimension)?,
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.reports_dir.join(REPORT_FILE_NAME)
    }

    /// The model credential is only needed for reviews; indexing runs without it.
    pub fn require_llm_key(&self) -> Result<&str> {
        self.llm
            .api_key
            .as_deref()
            .ok_or_else(|| ReviewError::MissingCredential("LLM_API_KEY").into())
    }
}

fn parse_number(key: &str, fallback: usize) -> Result<usize> {
    match dotenv::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        Err(_) => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_mode_parse() {
        assert_eq!(EmbeddingMode::parse("HTTP").unwrap(), EmbeddingMode::Http);
        assert_eq!(EmbeddingMode::parse(" stub ").unwrap(), EmbeddingMode::Stub);
        assert!(EmbeddingMode::parse("onnx").is_err());
    }

    #[test]
    fn test_missing_key_is_typed_error() {
        let settings = Settings::default();
        let err = settings.require_llm_key().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReviewError>(),
            Some(ReviewError::MissingCredential("LLM_API_KEY"))
        ));
    }

    #[test]
    fn test_report_path_uses_reports_dir() {
        let settings = Settings {
            reports_dir: PathBuf::from("out"),
            ..Settings::default()
        };
        assert_eq!(
            settings.report_path(),
            PathBuf::from("out").join("combined_review_report.json")
        );
    }
}
