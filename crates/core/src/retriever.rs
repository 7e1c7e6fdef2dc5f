use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::SearchHit;
use crate::store::ChunkStore;

/// Ranks stored chunks against a query by embedding similarity.
///
/// The stored vectors are assumed unit-normalized by the embedding model,
/// so a plain dot product stands in for cosine similarity and nothing is
/// renormalized at query time.
pub struct Retriever<E: Embedder> {
    store: ChunkStore,
    embedder: E,
}

impl<E: Embedder> Retriever<E> {
    pub fn new(store: ChunkStore, embedder: E) -> Self {
        Self { store, embedder }
    }

    /// Return up to `top_k` chunks, sorted strictly descending by
    /// similarity. Equal scores keep chunk order (stable sort), so a
    /// smaller `top_k` is always a prefix of a larger one. No similarity
    /// floor is applied here; thresholding belongs to the caller.
    pub fn search_chunks(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, SearchError> {
        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;

        let mut hits: Vec<SearchHit> = self
            .store
            .chunks()
            .iter()
            .zip(self.store.embeddings())
            .map(|(chunk, embedding)| SearchHit {
                chunk: chunk.clone(),
                similarity: dot(&query_vector, embedding),
            })
            .collect();

        hits.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
        hits.truncate(top_k);
        Ok(hits)
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embedding dimensions must match");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
