use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::{EmbeddingMode, EndpointConfig, Settings};
use crate::error::ReviewError;

/// Text embedding backend.
///
/// `Http` talks to an OpenAI-compatible `/embeddings` endpoint; `Stub`
/// produces deterministic hash-seeded vectors and never leaves the process.
pub enum Embedder {
    Http(HttpEmbedder),
    Stub { dimension: usize },
}

impl Embedder {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.embedding_mode {
            EmbeddingMode::Http => Ok(Self::Http(HttpEmbedder::new(&settings.embedding)?)),
            EmbeddingMode::Stub => Ok(Self::Stub {
                dimension: settings.embedding_dimension.max(1),
            }),
        }
    }

    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Http(client) => client.embed_batch(texts).await,
            Self::Stub { dimension } => Ok(texts.iter().map(|t| stub_embed(t, *dimension)).collect()),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| ReviewError::Embedding("empty embedding response".to_string()).into())
    }
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/embeddings") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut req = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("Embedding request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read embedding response")?;
        if !status.is_success() {
            return Err(ReviewError::Embedding(format!("endpoint returned {status}: {text}")).into());
        }

        let mut parsed: EmbeddingResponse =
            serde_json::from_str(&text).context("Failed to parse embedding JSON")?;
        if parsed.data.len() != texts.len() {
            return Err(ReviewError::Embedding(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            ))
            .into());
        }
        parsed.data.sort_by_key(|item| item.index);
        debug!(count = parsed.data.len(), model = %self.model, "embeddings received");
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let mantissa = ((bits >> 32) as u32) >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
