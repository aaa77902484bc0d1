use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::docs::types::{ChunkMeta, ContextHit, ReferenceChunk};
use crate::error::ReviewError;

const MAGIC: &[u8; 4] = b"DRIX";
const FORMAT_VERSION: u32 = 1;

/// Exact nearest-neighbour index over squared L2 distance.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<(), ReviewError> {
        self.check_dimension(vector)?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), ReviewError> {
        if vector.len() != self.dimension {
            return Err(ReviewError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// `(position, distance)` of the `k` closest vectors, nearest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, ReviewError> {
        self.check_dimension(query)?;
        if self.dimension == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(pos, v)| {
                let dist = v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum::<f32>();
                (pos, dist)
            })
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        out.write_all(MAGIC)?;
        out.write_all(&FORMAT_VERSION.to_le_bytes())?;
        out.write_all(&(self.dimension as u32).to_le_bytes())?;
        out.write_all(&(self.len() as u64).to_le_bytes())?;
        for value in &self.data {
            out.write_all(&value.to_le_bytes())?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut input = BufReader::new(file);

        let mut magic = [0u8; 4];
        input.read_exact(&mut magic).context("index header truncated")?;
        if &magic != MAGIC {
            return Err(ReviewError::IndexFormat(format!("{}: bad magic", path.display())).into());
        }
        let version = read_u32(&mut input)?;
        if version != FORMAT_VERSION {
            return Err(ReviewError::IndexFormat(format!("unsupported version {version}")).into());
        }
        let dimension = read_u32(&mut input)? as usize;
        let count = read_u64(&mut input)? as usize;

        let expected_bytes = count
            .checked_mul(dimension)
            .and_then(|total| total.checked_mul(4))
            .ok_or_else(|| ReviewError::IndexFormat("vector count overflows".to_string()))?;
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        if bytes.len() != expected_bytes {
            return Err(ReviewError::IndexFormat(format!(
                "expected {} bytes of vector data, found {}",
                expected_bytes,
                bytes.len()
            ))
            .into());
        }
        let data = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dimension, data })
    }
}

fn read_u32(input: &mut impl Read) -> Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf).context("index header truncated")?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(input: &mut impl Read) -> Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf).context("index header truncated")?;
    Ok(u64::from_le_bytes(buf))
}

/// Chunk texts and metadata, positionally aligned with the vectors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkBundle {
    #[serde(default)]
    pub built_at: Option<chrono::DateTime<chrono::Utc>>,
    pub texts: Vec<String>,
    pub metadatas: Vec<ChunkMeta>,
}

/// The persisted knowledge base: vectors plus the chunks they stand for.
pub struct ReferenceIndex {
    vectors: VectorIndex,
    bundle: ChunkBundle,
}

impl ReferenceIndex {
    pub fn new(vectors: VectorIndex, bundle: ChunkBundle) -> Result<Self, ReviewError> {
        let chunks = bundle.texts.len();
        if vectors.len() != chunks || bundle.metadatas.len() != chunks {
            return Err(ReviewError::IndexIntegrity {
                vectors: vectors.len(),
                chunks: chunks.min(bundle.metadatas.len()),
            });
        }
        Ok(Self { vectors, bundle })
    }

    pub fn load(index_path: &Path, texts_path: &Path) -> Result<Self> {
        for path in [index_path, texts_path] {
            if !path.exists() {
                return Err(ReviewError::MissingIndex(path.to_path_buf()).into());
            }
        }
        let vectors = VectorIndex::read_from(index_path)?;
        let raw = std::fs::read_to_string(texts_path)
            .with_context(|| format!("Failed to read {}", texts_path.display()))?;
        let bundle: ChunkBundle = serde_json::from_str(&raw).context("Failed to parse chunk bundle")?;

        let index = Self::new(vectors, bundle)?;
        info!(
            chunks = index.len(),
            dimension = index.dimension(),
            "reference index loaded"
        );
        Ok(index)
    }

    pub fn save(&self, index_path: &Path, texts_path: &Path) -> Result<()> {
        self.vectors.write_to(index_path)?;
        let json = serde_json::to_string(&self.bundle).context("serialize chunk bundle")?;
        std::fs::write(texts_path, json).with_context(|| format!("Failed to write {}", texts_path.display()))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bundle.texts.len()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    pub fn chunk(&self, position: usize) -> Option<ReferenceChunk> {
        Some(ReferenceChunk {
            text: self.bundle.texts.get(position)?.clone(),
            source_name: self.bundle.metadatas.get(position)?.source.clone(),
        })
    }

    /// Up to `k` chunks closest to `query`, nearest first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<ContextHit>, ReviewError> {
        Ok(self
            .vectors
            .search(query, k)?
            .into_iter()
            .filter_map(|(pos, distance)| self.chunk(pos).map(|chunk| ContextHit { chunk, distance }))
            .collect())
    }
}
