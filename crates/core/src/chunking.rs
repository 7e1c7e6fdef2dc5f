use crate::models::LectureChunk;

/// Sections whose trimmed text is at or below this length are noise,
/// usually a stray heading with no body.
pub const MIN_CHUNK_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: MIN_CHUNK_CHARS,
        }
    }
}

/// Split the concatenated corpus into chunks at second-level headings.
///
/// The split consumes the `"\n## "` marker, so every segment after the
/// first gets its `"## "` prefix restored before measuring or storing it;
/// the section title stays part of the chunk. Segments whose trimmed text
/// does not exceed `min_chars` are dropped, but ids keep counting through
/// them so a chunk id always refers to the same split position.
pub fn chunk_by_sections(text: &str, config: ChunkingConfig) -> Vec<LectureChunk> {
    let mut chunks = Vec::new();

    for (index, segment) in text.split("\n## ").enumerate() {
        let restored = if index == 0 {
            segment.to_string()
        } else {
            format!("## {segment}")
        };

        let trimmed = restored.trim();
        if trimmed.chars().count() <= config.min_chars {
            continue;
        }

        chunks.push(LectureChunk {
            text: trimmed.to_string(),
            length: restored.chars().count(),
            chunk_id: index,
        });
    }

    chunks
}
