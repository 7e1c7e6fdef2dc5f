use crate::chunking::{chunk_by_sections, ChunkingConfig};
use crate::corpus::Corpus;
use crate::embeddings::Embedder;
use crate::error::{BuildError, EmbedError};
use crate::models::{CacheMetadata, LectureChunk};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The cache is a sibling pair: a structured chunk list and a raw
/// embedding matrix. They are only ever written and read together.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub chunks: PathBuf,
    pub matrix: PathBuf,
}

impl CachePaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            chunks: dir.join("chunks.json"),
            matrix: dir.join("embeddings.bin"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkCacheFile {
    meta: CacheMetadata,
    chunks: Vec<LectureChunk>,
}

/// The ordered chunk sequence and its parallel embedding matrix.
///
/// Row `i` of the matrix is the embedding of the chunk at sequence
/// position `i`; the store is write-once within a process lifetime.
pub struct ChunkStore {
    chunks: Vec<LectureChunk>,
    embeddings: Vec<Vec<f32>>,
}

impl ChunkStore {
    pub fn from_parts(
        chunks: Vec<LectureChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, BuildError> {
        if chunks.len() != embeddings.len() {
            return Err(BuildError::RowMismatch {
                rows: embeddings.len(),
                chunks: chunks.len(),
            });
        }

        Ok(Self { chunks, embeddings })
    }

    /// Return the cached store when a consistent cache pair exists,
    /// otherwise chunk and embed the corpus and persist the result.
    ///
    /// A cache is consistent when both files parse, the row count matches
    /// the chunk count, the matrix width matches the embedder, and the
    /// stored corpus checksum matches the corpus being loaded. Anything
    /// else is treated as cache-absent and triggers a full rebuild; cache
    /// reads never fail the caller. Cache writes do propagate errors, a
    /// silently lost embedding run is worse than a loud one.
    pub fn load_or_build<E: Embedder>(
        corpus: &Corpus,
        embedder: &E,
        paths: &CachePaths,
        config: ChunkingConfig,
    ) -> Result<Self, BuildError> {
        if let Some(store) = Self::try_load(corpus, embedder.dimensions(), paths) {
            return Ok(store);
        }

        Self::build(corpus, embedder, paths, config)
    }

    fn try_load(corpus: &Corpus, dimensions: usize, paths: &CachePaths) -> Option<Self> {
        if !paths.chunks.is_file() || !paths.matrix.is_file() {
            return None;
        }

        let raw = fs::read_to_string(&paths.chunks).ok()?;
        let cached: ChunkCacheFile = serde_json::from_str(&raw).ok()?;

        if cached.meta.corpus_checksum != corpus.checksum {
            return None;
        }
        if cached.meta.dimensions != dimensions {
            return None;
        }

        let embeddings = read_matrix(&paths.matrix).ok()?;
        if embeddings.len() != cached.chunks.len() {
            return None;
        }
        if embeddings.iter().any(|row| row.len() != dimensions) {
            return None;
        }

        Self::from_parts(cached.chunks, embeddings).ok()
    }

    fn build<E: Embedder>(
        corpus: &Corpus,
        embedder: &E,
        paths: &CachePaths,
        config: ChunkingConfig,
    ) -> Result<Self, BuildError> {
        let chunks = chunk_by_sections(&corpus.text, config);

        // Sequential, in chunk order: the matrix is addressed by position.
        let dimensions = embedder.dimensions();
        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = embedder
                .embed(&chunk.text)
                .map_err(|source| BuildError::Embedding {
                    chunk_id: chunk.chunk_id,
                    source,
                })?;

            // A row narrower or wider than the declared dimensions would be
            // persisted under a cols header it disagrees with, and every
            // later run would reject the cache and re-embed the corpus.
            if vector.len() != dimensions {
                return Err(BuildError::Embedding {
                    chunk_id: chunk.chunk_id,
                    source: EmbedError::DimensionMismatch {
                        got: vector.len(),
                        expected: dimensions,
                    },
                });
            }
            embeddings.push(vector);
        }

        let store = Self::from_parts(chunks, embeddings)?;
        store.persist(corpus, embedder.dimensions(), paths)?;
        Ok(store)
    }

    fn persist(
        &self,
        corpus: &Corpus,
        dimensions: usize,
        paths: &CachePaths,
    ) -> Result<(), BuildError> {
        for path in [&paths.chunks, &paths.matrix] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let cache_file = ChunkCacheFile {
            meta: CacheMetadata {
                corpus_checksum: corpus.checksum.clone(),
                dimensions,
                built_at: Utc::now(),
            },
            chunks: self.chunks.clone(),
        };

        fs::write(&paths.chunks, serde_json::to_vec_pretty(&cache_file)?)?;
        write_matrix(&paths.matrix, &self.embeddings, dimensions)?;
        Ok(())
    }

    pub fn chunks(&self) -> &[LectureChunk] {
        &self.chunks
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Matrix file layout: `rows: u32 LE`, `cols: u32 LE`, then row-major
/// f32 LE values.
fn write_matrix(path: &Path, rows: &[Vec<f32>], cols: usize) -> std::io::Result<()> {
    let mut buffer = Vec::with_capacity(8 + rows.len() * cols * 4);
    buffer.extend_from_slice(&(rows.len() as u32).to_le_bytes());
    buffer.extend_from_slice(&(cols as u32).to_le_bytes());

    for row in rows {
        for value in row {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }

    fs::write(path, buffer)
}

fn read_matrix(path: &Path) -> std::io::Result<Vec<Vec<f32>>> {
    let bytes = fs::read(path)?;
    let malformed = || std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed matrix");

    if bytes.len() < 8 {
        return Err(malformed());
    }

    let rows = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let cols = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;

    let expected = 8 + rows
        .checked_mul(cols)
        .and_then(|cells| cells.checked_mul(4))
        .ok_or_else(malformed)?;
    if bytes.len() != expected {
        return Err(malformed());
    }

    let mut matrix = Vec::with_capacity(rows);
    let mut offset = 8;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols);
        for _ in 0..cols {
            row.push(f32::from_le_bytes(
                bytes[offset..offset + 4].try_into().unwrap(),
            ));
            offset += 4;
        }
        matrix.push(row);
    }

    Ok(matrix)
}
