use chrono::Utc;
use clap::{Parser, Subcommand};
use lecture_search_core::{
    load_corpus, AnswerSynthesizer, CachePaths, ChatGenerator, ChunkStore, ChunkingConfig,
    Embedder, HashingNgramEmbedder, HttpEmbedder, Retriever,
};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lecture-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder containing the markdown lecture notes.
    #[arg(long, env = "LECTURES_DIR", default_value = "lectures")]
    lectures: String,

    /// Directory for the chunk/embedding cache pair.
    #[arg(long, env = "LECTURES_CACHE_DIR", default_value = ".lecture-cache")]
    cache_dir: String,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk and embed the lecture corpus, writing the cache pair.
    Build,
    /// Rank lecture chunks against a query and print the top hits.
    Search {
        /// Search query.
        #[arg(long)]
        query: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
    },
    /// Answer a question from the lecture notes via the generation backend.
    Ask {
        /// The question to answer.
        #[arg(long)]
        question: String,
        /// Number of retrieved chunks to pack into the prompt.
        #[arg(long, default_value = "3")]
        max_chunks: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    // An embeddings endpoint in the environment selects the external
    // model; otherwise the deterministic offline backend is used.
    let embedder: Box<dyn Embedder> = match HttpEmbedder::from_env() {
        Some(http) => Box::new(http),
        None => Box::new(HashingNgramEmbedder::default()),
    };

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "lecture-search boot"
    );

    let corpus = load_corpus(Path::new(&cli.lectures))?;
    if corpus.text.is_empty() {
        warn!(folder = %cli.lectures, "lecture folder has no markdown content");
    }

    let paths = CachePaths::in_dir(Path::new(&cli.cache_dir));
    let store = ChunkStore::load_or_build(&corpus, &embedder, &paths, ChunkingConfig::default())?;
    info!(chunk_count = store.len(), "chunk store ready");

    match cli.command {
        Command::Build => {
            println!(
                "{} chunks embedded and cached at {}",
                store.len(),
                cli.cache_dir
            );
        }
        Command::Search { query, top_k } => {
            let retriever = Retriever::new(store, embedder);
            let hits = retriever.search_chunks(&query, top_k)?;

            if hits.is_empty() {
                println!("no results");
            }
            for hit in hits {
                let title = hit.chunk.text.lines().next().unwrap_or_default();
                println!(
                    "[chunk {}] similarity={:.4} {}",
                    hit.chunk.chunk_id, hit.similarity, title
                );
            }
        }
        Command::Ask {
            question,
            max_chunks,
        } => {
            let generator = ChatGenerator::from_env()?;
            let synthesizer = AnswerSynthesizer::new(Retriever::new(store, embedder), generator);

            match synthesizer.answer(&question, max_chunks) {
                Ok(answer) => println!("{}", answer.text()),
                Err(error) => {
                    warn!(%error, "answer synthesis failed");
                    return Err(error.into());
                }
            }
        }
    }

    Ok(())
}
