use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One section of lecture text, the atomic retrieval target.
///
/// `chunk_id` is the position of the section in the pre-filter split
/// sequence, so ids stay stable across reruns over identical input even
/// when short sections are discarded. `length` is the character count of
/// the section before trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureChunk {
    pub text: String,
    pub length: usize,
    pub chunk_id: usize,
}

/// A scored retrieval hit, produced per query and never persisted.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: LectureChunk,
    pub similarity: f32,
}

/// Metadata stored alongside the cached chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub corpus_checksum: String,
    pub dimensions: usize,
    pub built_at: DateTime<Utc>,
}
