use anyhow::Result;
use tracing::{debug, info};

use crate::config::Settings;
use crate::docs::types::ContextHit;
use crate::embed::Embedder;
use crate::index::ReferenceIndex;
use crate::llm::{LlmClient, ReviewModel};

/// Everything a review run needs, loaded once and shared read-only.
pub struct ReviewContext<M> {
    pub settings: Settings,
    pub index: ReferenceIndex,
    pub embedder: Embedder,
    pub model: M,
}

impl ReviewContext<LlmClient> {
    /// Startup: credential, model client, embedder, then the index artefacts.
    pub fn load(settings: Settings) -> Result<Self> {
        settings.require_llm_key()?;
        let model = LlmClient::new(&settings.llm)?;
        info!(model = %settings.llm.model, "LLM client initialized");

        let embedder = Embedder::from_settings(&settings)?;
        let index = ReferenceIndex::load(&settings.index_path, &settings.texts_path)?;

        Ok(Self::new(settings, index, embedder, model))
    }
}

impl<M: ReviewModel> ReviewContext<M> {
    pub fn new(settings: Settings, index: ReferenceIndex, embedder: Embedder, model: M) -> Self {
        Self {
            settings,
            index,
            embedder,
            model,
        }
    }

    /// The `k` reference chunks nearest to `query`, most relevant first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ContextHit>> {
        let embedding = self.embedder.embed(query).await?;
        let hits = self.index.nearest(&embedding, k)?;
        debug!(requested = k, returned = hits.len(), "context retrieved");
        Ok(hits)
    }

    pub fn shutdown(self) {
        info!(chunks = self.index.len(), "releasing review context");
        drop(self);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::docs::types::ChunkMeta;
    use crate::index::{ChunkBundle, VectorIndex};
    use crate::review::test_support::CannedModel;

    pub const DIMENSION: usize = 16;

    /// Context over `chunks` embedded with the stub backend.
    pub async fn context_with(
        settings: Settings,
        chunks: &[&str],
        model: CannedModel,
    ) -> ReviewContext<CannedModel> {
        let embedder = Embedder::Stub { dimension: DIMENSION };
        let texts: Vec<String> = chunks.iter().map(|c| c.to_string()).collect();
        let mut vectors = VectorIndex::new(DIMENSION);
        for v in embedder.embed_batch(&texts).await.unwrap() {
            vectors.add(&v).unwrap();
        }
        let bundle = ChunkBundle {
            built_at: None,
            metadatas: texts
                .iter()
                .map(|_| ChunkMeta {
                    source: "reference.txt".to_string(),
                    source_hash: String::new(),
                })
                .collect(),
            texts,
        };
        let index = ReferenceIndex::new(vectors, bundle).unwrap();
        ReviewContext::new(settings, index, embedder, model)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::ReviewError;
    use crate::review::test_support::CannedModel;

    #[tokio::test]
    async fn test_retrieve_ranks_exact_match_first() {
        let chunks = ["shareholder register rules", "ubo filing deadline", "registered office"];
        let ctx = context_with(Settings::default(), &chunks, CannedModel::replying("[]")).await;

        let hits = ctx.retrieve("ubo filing deadline", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.text, "ubo filing deadline");
        assert!(hits[0].distance.abs() < 1e-6);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_retrieve_never_exceeds_index() {
        let ctx = context_with(Settings::default(), &["a", "b", "c"], CannedModel::replying("[]")).await;
        let hits = ctx.retrieve("anything", 5).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        ctx.shutdown();
    }

    #[test]
    fn test_load_without_key_fails_first() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            index_path: dir.path().join("missing.index"),
            ..Settings::default()
        };
        let err = ReviewContext::<LlmClient>::load(settings).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ReviewError>(),
            Some(ReviewError::MissingCredential(_))
        ));
    }
}
