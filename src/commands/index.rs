use anyhow::Result;
use console::style;
use tracing::info;

use crate::config::Settings;
use crate::docs::ingest::run_indexer;
use crate::embed::Embedder;

pub async fn run(settings: &Settings) -> Result<()> {
    info!(
        dir = %settings.data_dir.display(),
        mode = ?settings.embedding_mode,
        "Indexing started"
    );

    let embedder = Embedder::from_settings(settings)?;
    let summary = run_indexer(
        &settings.data_dir,
        &settings.index_path,
        &settings.texts_path,
        settings.chunk_words,
        settings.embedding_batch,
        &embedder,
    )
    .await?;

    println!(
        "{} Indexed {} documents into {} chunks (dimension {})",
        style("✓").green(),
        summary.documents,
        summary.chunks,
        summary.dimension
    );
    println!("  vectors: {}", settings.index_path.display());
    println!("  texts:   {}", settings.texts_path.display());
    Ok(())
}
