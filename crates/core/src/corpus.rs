use crate::error::BuildError;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The concatenated lecture text plus a checksum of it, used to detect a
/// stale chunk cache.
#[derive(Debug, Clone)]
pub struct Corpus {
    pub text: String,
    pub checksum: String,
}

pub fn discover_lecture_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_markdown = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));

        if is_markdown {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

/// Read every markdown document under `folder` in filename-sorted order
/// and concatenate them into one corpus.
///
/// Documents are joined with a blank line so a heading at the start of a
/// file still begins a new line in the joined text. A missing folder or a
/// file that vanishes mid-read is fatal; an empty folder is not, it just
/// produces an empty corpus.
pub fn load_corpus(folder: &Path) -> Result<Corpus, BuildError> {
    if !folder.is_dir() {
        return Err(BuildError::CorpusNotFound(folder.display().to_string()));
    }

    let mut documents = Vec::new();
    for path in discover_lecture_files(folder) {
        let text = fs::read_to_string(&path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                BuildError::CorpusNotFound(path.display().to_string())
            } else {
                BuildError::Io(error)
            }
        })?;
        documents.push(text);
    }

    let text = documents.join("\n\n");
    let checksum = digest_text(&text);

    Ok(Corpus { text, checksum })
}

pub fn digest_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_sorted() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("week2");
        fs::create_dir(&nested)?;

        fs::write(dir.path().join("b-lecture.md"), "## B\ntext")?;
        fs::write(nested.join("c-lecture.md"), "## C\ntext")?;
        fs::write(dir.path().join("a-lecture.md"), "## A\ntext")?;
        fs::write(dir.path().join("notes.txt"), "ignored")?;

        let files = discover_lecture_files(dir.path());
        assert_eq!(files.len(), 3);
        assert!(files[0].ends_with("a-lecture.md"));
        Ok(())
    }

    #[test]
    fn missing_folder_is_fatal() {
        let result = load_corpus(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(BuildError::CorpusNotFound(_))));
    }

    #[test]
    fn empty_folder_yields_empty_corpus() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let corpus = load_corpus(dir.path())?;
        assert!(corpus.text.is_empty());
        Ok(())
    }

    #[test]
    fn documents_are_joined_on_a_fresh_line() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.md"), "## First\nbody")?;
        fs::write(dir.path().join("b.md"), "## Second\nbody")?;

        let corpus = load_corpus(dir.path())?;
        assert!(corpus.text.contains("\n## Second"));
        Ok(())
    }

    #[test]
    fn checksum_tracks_content() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("a.md"), "## First\nbody")?;
        let before = load_corpus(dir.path())?;

        fs::write(dir.path().join("a.md"), "## First\nedited body")?;
        let after = load_corpus(dir.path())?;

        assert_ne!(before.checksum, after.checksum);
        Ok(())
    }
}
