use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use indexmap::IndexSet;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WORDS_PATH: &str = "/usr/share/dict/words";

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("failed reading word list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("word list {origin} contains no words")]
    Empty { origin: String },
    #[error("all {words} filler words are already claimed")]
    Exhausted { words: usize },
    #[error("word list unavailable: {0}")]
    Unavailable(String),
}

/// Candidate filler words, trimmed, non-blank and distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Builds a list from raw lines. Blank lines are dropped; the first occurrence of a
    /// repeated word wins.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: IndexSet<String> = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|word| !word.is_empty())
            .collect();
        Self {
            words: words.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

pub trait WordListLoader: Send + Sync {
    /// Human-readable origin used in errors and logs.
    fn origin(&self) -> String;
    fn load(&self) -> Result<WordList, WordListError>;
}

/// Newline-separated dictionary file.
#[derive(Debug, Clone)]
pub struct FileWordListLoader {
    path: PathBuf,
}

impl FileWordListLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileWordListLoader {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS_PATH)
    }
}

impl WordListLoader for FileWordListLoader {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<WordList, WordListError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| WordListError::Read {
            path: self.path.clone(),
            source,
        })?;
        Ok(WordList::from_lines(raw.lines()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticWordListLoader {
    words: Vec<String>,
}

impl StaticWordListLoader {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl WordListLoader for StaticWordListLoader {
    fn origin(&self) -> String {
        "static".to_string()
    }

    fn load(&self) -> Result<WordList, WordListError> {
        Ok(WordList::from_lines(&self.words))
    }
}

/// Loads the word list on first use and hands the same list to every later caller.
///
/// A failed load is not cached, so the next run tries again.
pub struct WordListCache {
    loader: Box<dyn WordListLoader>,
    loaded: Mutex<Option<Arc<WordList>>>,
}

impl WordListCache {
    pub fn new(loader: impl WordListLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            loaded: Mutex::new(None),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
            .lock()
            .map(|loaded| loaded.is_some())
            .unwrap_or(false)
    }

    pub fn get(&self) -> Result<Arc<WordList>, WordListError> {
        let mut loaded = self
            .loaded
            .lock()
            .map_err(|_| WordListError::Unavailable("word list cache lock poisoned".to_string()))?;
        if let Some(words) = loaded.as_ref() {
            return Ok(Arc::clone(words));
        }

        let words = self.loader.load()?;
        if words.is_empty() {
            return Err(WordListError::Empty {
                origin: self.loader.origin(),
            });
        }
        debug!(origin = %self.loader.origin(), words = words.len(), "loaded filler word list");
        let words = Arc::new(words);
        *loaded = Some(Arc::clone(&words));
        Ok(words)
    }
}

impl std::fmt::Debug for WordListCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordListCache")
            .field("origin", &self.loader.origin())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
