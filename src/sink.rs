//! Deck delivery: where a rendered `.pptx` ends up.
//!
//! The browser version hands the file to the user's download folder. Here a
//! [`DeckSink`] receives the finished package; [`DirectorySink`] is the
//! download folder. Delivering the same deck twice writes the same file name
//! twice, and the second write replaces the first.

use crate::error::DocDeckError;
use crate::output::RenderedDeck;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Receives rendered decks.
pub trait DeckSink: Send + Sync {
    /// Deliver a deck, returning where it was stored.
    fn deliver(&self, deck: &RenderedDeck) -> Result<PathBuf, DocDeckError>;
}

/// Writes decks into a directory, atomically.
///
/// The package is written to a temp file in the target directory and then
/// renamed over the final name, so readers never observe a partial `.pptx`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DeckSink for DirectorySink {
    fn deliver(&self, deck: &RenderedDeck) -> Result<PathBuf, DocDeckError> {
        let path = self.dir.join(&deck.file_name);
        let write_err = |source: std::io::Error| DocDeckError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(&deck.bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;

        info!(
            "Deck written: {} ({} slides, {} bytes)",
            path.display(),
            deck.slide_count,
            deck.bytes.len()
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deck(bytes: &[u8]) -> RenderedDeck {
        RenderedDeck {
            file_name: "Bai_Kiem_Tra_Interactive.pptx".into(),
            bytes: bytes.to_vec(),
            slide_count: 2,
        }
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path().join("downloads/nested"));
        let path = sink.deliver(&deck(b"PK")).unwrap();
        assert_eq!(path, tmp.path().join("downloads/nested/Bai_Kiem_Tra_Interactive.pptx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK");
    }

    #[test]
    fn second_delivery_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path());
        let first = sink.deliver(&deck(b"first")).unwrap();
        let second = sink.deliver(&deck(b"second")).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");

        // No temp files left behind.
        let entries = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn unwritable_target_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // A regular file where the directory should be.
        let sink = DirectorySink::new(&blocker);
        let err = sink.deliver(&deck(b"x")).unwrap_err();
        match err {
            DocDeckError::OutputWriteFailed { path, .. } => {
                assert!(path.ends_with("Bai_Kiem_Tra_Interactive.pptx"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
