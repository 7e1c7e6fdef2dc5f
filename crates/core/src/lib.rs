pub mod chunking;
pub mod corpus;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod models;
pub mod retriever;
pub mod store;
pub mod synthesis;

pub use chunking::{chunk_by_sections, ChunkingConfig, MIN_CHUNK_CHARS};
pub use corpus::{discover_lecture_files, load_corpus, Corpus};
pub use embeddings::{
    Embedder, HashingNgramEmbedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{AnswerError, BuildError, EmbedError, GenerationError, SearchError};
pub use generation::ChatGenerator;
pub use models::{CacheMetadata, LectureChunk, SearchHit};
pub use retriever::Retriever;
pub use store::{CachePaths, ChunkStore};
pub use synthesis::{
    Answer, AnswerSynthesizer, Generator, MAX_CONTEXT_CHARS, NO_RELEVANT_CONTENT, SIMILARITY_FLOOR,
};
