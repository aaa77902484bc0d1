use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::types::ChunkMeta;
use super::{read_text, DocumentFormat};
use crate::embed::Embedder;
use crate::error::ReviewError;
use crate::index::{ChunkBundle, ReferenceIndex, VectorIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Reference files directly inside `dir`, sorted by path.
pub fn collect_reference_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ReviewError::MissingCorpus(dir.to_path_buf()).into());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && DocumentFormat::from_path(p).is_some())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(ReviewError::EmptyCorpus(dir.to_path_buf()).into());
    }
    Ok(files)
}

/// Split on whitespace and regroup into windows of `size` words.
pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size.max(1)).map(|w| w.join(" ")).collect()
}

/// Read, chunk and embed the reference corpus.
pub async fn build_reference_index(
    data_dir: &Path,
    chunk_size: usize,
    batch_size: usize,
    embedder: &Embedder,
) -> Result<(ReferenceIndex, IndexSummary)> {
    let files = collect_reference_files(data_dir)?;
    info!(count = files.len(), dir = %data_dir.display(), "reference documents found");

    let mut texts = Vec::new();
    let mut metadatas = Vec::new();
    for path in &files {
        let Some(format) = DocumentFormat::from_path(path) else {
            continue;
        };
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let text = read_text(path, format)?;
        let chunks = chunk_words(&text, chunk_size);
        if chunks.is_empty() {
            warn!(path = %path.display(), "reference document has no text");
            continue;
        }

        let meta = ChunkMeta {
            source: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            source_hash: blake3::hash(&bytes).to_hex().to_string(),
        };
        info!(source = %meta.source, chunks = chunks.len(), "reference document chunked");
        metadatas.extend(std::iter::repeat(meta).take(chunks.len()));
        texts.extend(chunks);
    }

    if texts.is_empty() {
        return Err(ReviewError::EmptyCorpus(data_dir.to_path_buf()))
            .context("embedding generation failed, no embeddings created");
    }

    let mut vectors: Option<VectorIndex> = None;
    for (batch_no, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        let embeddings = embedder.embed_batch(batch).await?;
        for embedding in embeddings {
            let index = vectors.get_or_insert_with(|| VectorIndex::new(embedding.len()));
            index.add(&embedding)?;
        }
        info!(batch = batch_no + 1, embedded = batch.len(), "embedding batch done");
    }
    let vectors = vectors.ok_or_else(|| ReviewError::Embedding("no embeddings returned".to_string()))?;

    let summary = IndexSummary {
        documents: files.len(),
        chunks: texts.len(),
        dimension: vectors.dimension(),
    };
    let bundle = ChunkBundle {
        built_at: Some(chrono::Utc::now()),
        texts,
        metadatas,
    };
    Ok((ReferenceIndex::new(vectors, bundle)?, summary))
}

/// Build the index from `data_dir` and overwrite both artefacts.
pub async fn run_indexer(
    data_dir: &Path,
    index_path: &Path,
    texts_path: &Path,
    chunk_size: usize,
    batch_size: usize,
    embedder: &Embedder,
) -> Result<IndexSummary> {
    let (index, summary) = build_reference_index(data_dir, chunk_size, batch_size, embedder).await?;
    index.save(index_path, texts_path)?;
    info!(
        index = %index_path.display(),
        texts = %texts_path.display(),
        chunks = summary.chunks,
        "reference index saved"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::docx::test_support::write_docx;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_words_windows() {
        let chunks = chunk_words("a  b\nc d\te", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
        assert!(chunk_words("   \n ", 500).is_empty());
        assert_eq!(chunk_words("one two", 500), vec!["one two"]);
    }

    #[test]
    fn test_collect_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = collect_reference_files(&missing).unwrap_err();
        assert!(matches!(err.downcast_ref::<ReviewError>(), Some(ReviewError::MissingCorpus(_))));

        std::fs::write(dir.path().join("image.png"), b"png").unwrap();
        let err = collect_reference_files(dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ReviewError>(), Some(ReviewError::EmptyCorpus(_))));
    }

    #[tokio::test]
    async fn test_index_mixed_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("b_regs.txt"), "one two three four five").unwrap();
        std::fs::write(data.join("c_empty.txt"), "   ").unwrap();
        write_docx(&data.join("a_template.docx"), &["Articles template", "clause text"]);

        let index_path = dir.path().join("vectors.index");
        let texts_path = dir.path().join("texts.json");
        let embedder = Embedder::Stub { dimension: 8 };
        let summary = run_indexer(&data, &index_path, &texts_path, 2, 2, &embedder)
            .await
            .unwrap();
        assert_eq!(
            summary,
            IndexSummary {
                documents: 3,
                chunks: 5,
                dimension: 8
            }
        );

        let loaded = ReferenceIndex::load(&index_path, &texts_path).unwrap();
        assert_eq!(loaded.len(), 5);
        let first = loaded.chunk(0).unwrap();
        assert_eq!(first.text, "Articles template");
        assert_eq!(first.source_name, "a_template.docx");
        assert_eq!(loaded.chunk(4).unwrap().text, "five");
    }

    #[tokio::test]
    async fn test_blank_corpus_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blank.txt"), "\n\n").unwrap();
        let embedder = Embedder::Stub { dimension: 4 };
        let err = build_reference_index(dir.path(), 500, 32, &embedder).await.err().unwrap();
        assert!(matches!(err.downcast_ref::<ReviewError>(), Some(ReviewError::EmptyCorpus(_))));
    }
}
