use crate::embeddings::Embedder;
use crate::error::{AnswerError, GenerationError};
use crate::retriever::Retriever;

/// Best-hit similarity below this means the corpus has nothing useful to
/// say; generation is skipped entirely.
pub const SIMILARITY_FLOOR: f32 = 0.2;

/// Per-chunk cap on context fed to the generator.
pub const MAX_CONTEXT_CHARS: usize = 1500;

pub const NO_RELEVANT_CONTENT: &str =
    "The lecture notes do not contain relevant content for that question.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// An opaque text-generation capability. Network-backed implementations
/// may fail or time out; those failures surface as `GenerationError`.
pub trait Generator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Outcome of a question, kept distinct from technical failure: finding
/// nothing relevant is a defined result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    NoRelevantContent,
    Generated(String),
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::NoRelevantContent => NO_RELEVANT_CONTENT,
            Answer::Generated(text) => text,
        }
    }
}

/// Retrieval-augmented answering: pull the best chunks for a question,
/// pack them into a prompt, and delegate to an external generator.
pub struct AnswerSynthesizer<E: Embedder, G: Generator> {
    retriever: Retriever<E>,
    generator: G,
}

impl<E: Embedder, G: Generator> AnswerSynthesizer<E, G> {
    pub fn new(retriever: Retriever<E>, generator: G) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Answer `question` from up to `max_chunks` retrieved sections.
    ///
    /// Short-circuits to `Answer::NoRelevantContent` when nothing is
    /// retrieved or the best similarity is under `SIMILARITY_FLOOR`,
    /// without touching the generator. A generator failure comes back as
    /// `AnswerError::Generation` so callers can tell "no content" from
    /// "had content but couldn't generate".
    pub fn answer(&self, question: &str, max_chunks: usize) -> Result<Answer, AnswerError> {
        let hits = self.retriever.search_chunks(question, max_chunks)?;

        let Some(best) = hits.first() else {
            return Ok(Answer::NoRelevantContent);
        };
        if best.similarity < SIMILARITY_FLOOR {
            return Ok(Answer::NoRelevantContent);
        }

        let context = hits
            .iter()
            .map(|hit| trim_to_sentence(&hit.chunk.text, MAX_CONTEXT_CHARS))
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let prompt = build_prompt(&context, question);
        let text = self
            .generator
            .generate(&prompt)
            .map_err(AnswerError::Generation)?;

        Ok(Answer::Generated(text))
    }

    pub fn retriever(&self) -> &Retriever<E> {
        &self.retriever
    }
}

/// Cap `text` at `max_chars` characters, then pull the cut back to the
/// last sentence boundary (`.`, `?`, or `!`) inside the window when one
/// exists, so no excerpt ends mid-sentence.
fn trim_to_sentence(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let window: String = text.chars().take(max_chars).collect();
    match window.rfind(['.', '?', '!']) {
        Some(index) => window[..index + 1].to_string(),
        None => window,
    }
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the question using only the lecture excerpts below. \
         If the excerpts do not contain the answer, say so.\n\n\
         Lecture excerpts:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;
    use crate::models::LectureChunk;
    use crate::store::ChunkStore;
    use std::cell::Cell;

    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn dimensions(&self) -> usize {
            2
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
            // Queries containing "loop" line up with the first axis.
            Ok(if text.contains("loop") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            })
        }
    }

    /// Records whether it was invoked; the threshold short-circuit must
    /// never reach it.
    struct RecordingGenerator {
        called: Cell<bool>,
        reply: Result<String, ()>,
    }

    impl RecordingGenerator {
        fn answering(reply: &str) -> Self {
            Self {
                called: Cell::new(false),
                reply: Ok(reply.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                called: Cell::new(false),
                reply: Err(()),
            }
        }
    }

    impl Generator for RecordingGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.called.set(true);
            self.reply
                .clone()
                .map_err(|_| GenerationError::BackendResponse("stubbed failure".to_string()))
        }
    }

    fn store_with(texts: &[&str]) -> ChunkStore {
        let embedder = AxisEmbedder;
        let chunks: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(id, text)| LectureChunk {
                text: text.to_string(),
                length: text.chars().count(),
                chunk_id: id,
            })
            .collect();
        let embeddings = chunks
            .iter()
            .map(|c| embedder.embed(&c.text).unwrap())
            .collect();
        ChunkStore::from_parts(chunks, embeddings).unwrap()
    }

    #[test]
    fn low_similarity_short_circuits_without_generation() {
        let store = store_with(&["variables and assignment"]);
        let generator = RecordingGenerator::answering("unused");
        let synthesizer =
            AnswerSynthesizer::new(Retriever::new(store, AxisEmbedder), generator);

        let answer = synthesizer.answer("what is a loop", 3).unwrap();

        assert_eq!(answer, Answer::NoRelevantContent);
        assert_eq!(answer.text(), NO_RELEVANT_CONTENT);
        assert!(!synthesizer.generator.called.get());
    }

    #[test]
    fn empty_store_short_circuits_without_generation() {
        let store = ChunkStore::from_parts(Vec::new(), Vec::new()).unwrap();
        let generator = RecordingGenerator::answering("unused");
        let synthesizer =
            AnswerSynthesizer::new(Retriever::new(store, AxisEmbedder), generator);

        let answer = synthesizer.answer("what is a loop", 3).unwrap();
        assert_eq!(answer, Answer::NoRelevantContent);
        assert!(!synthesizer.generator.called.get());
    }

    #[test]
    fn relevant_content_reaches_the_generator() {
        let store = store_with(&["a loop repeats code"]);
        let generator = RecordingGenerator::answering("A loop repeats code.");
        let synthesizer =
            AnswerSynthesizer::new(Retriever::new(store, AxisEmbedder), generator);

        let answer = synthesizer.answer("what is a loop", 3).unwrap();

        assert_eq!(answer, Answer::Generated("A loop repeats code.".to_string()));
        assert!(synthesizer.generator.called.get());
    }

    #[test]
    fn generator_failure_is_a_distinct_error() {
        let store = store_with(&["a loop repeats code"]);
        let synthesizer = AnswerSynthesizer::new(
            Retriever::new(store, AxisEmbedder),
            RecordingGenerator::failing(),
        );

        let result = synthesizer.answer("what is a loop", 3);
        assert!(matches!(result, Err(AnswerError::Generation(_))));
    }

    #[test]
    fn short_text_is_left_untouched() {
        let text = "## Loops\nA loop repeats code.";
        assert_eq!(trim_to_sentence(text, 1500), text);
    }

    #[test]
    fn long_text_is_cut_at_a_sentence_boundary() {
        let sentence = "A loop repeats code until the condition fails. ";
        let text = sentence.repeat(60);
        assert!(text.chars().count() > MAX_CONTEXT_CHARS);

        let trimmed = trim_to_sentence(&text, MAX_CONTEXT_CHARS);
        assert!(trimmed.chars().count() <= MAX_CONTEXT_CHARS);
        assert!(trimmed.ends_with('.'));
    }

    #[test]
    fn window_without_boundary_is_kept_whole() {
        let text = "word ".repeat(400);
        let trimmed = trim_to_sentence(&text, 100);
        assert_eq!(trimmed.chars().count(), 100);
    }

    #[test]
    fn prompt_contains_context_and_question() {
        let prompt = build_prompt("## Loops\nbody", "what is a loop");
        assert!(prompt.contains("## Loops"));
        assert!(prompt.contains("Question: what is a loop"));
    }
}
