use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::registry::TermRegistry;
use super::words::{WordListCache, WordListError};

/// Random draws attempted before falling back to a scan for any unclaimed word.
const RANDOM_DRAWS: usize = 64;

/// Hands out random dictionary words that have not been claimed in the current run.
#[derive(Debug)]
pub struct FillerTermGenerator {
    registry: TermRegistry,
    words: Arc<WordListCache>,
    rng: Mutex<StdRng>,
    generated: AtomicUsize,
}

impl FillerTermGenerator {
    pub fn new(registry: TermRegistry, words: Arc<WordListCache>) -> Self {
        Self::with_rng(registry, words, StdRng::from_entropy())
    }

    pub fn with_seed(registry: TermRegistry, words: Arc<WordListCache>, seed: u64) -> Self {
        Self::with_rng(registry, words, StdRng::seed_from_u64(seed))
    }

    fn with_rng(registry: TermRegistry, words: Arc<WordListCache>, rng: StdRng) -> Self {
        Self {
            registry,
            words,
            rng: Mutex::new(rng),
            generated: AtomicUsize::new(0),
        }
    }

    /// Claims and returns a fresh filler term.
    ///
    /// Loads the word list on first use. Fails if it cannot be loaded, or once every word
    /// in it has been claimed.
    pub fn next_term(&self) -> Result<String, WordListError> {
        let words = self.words.get()?;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        for _ in 0..RANDOM_DRAWS {
            let Some(word) = words.get(rng.gen_range(0..words.len())) else {
                continue;
            };
            if self.registry.claim(word) {
                return Ok(self.hand_out(word));
            }
        }

        let start = rng.gen_range(0..words.len());
        for offset in 0..words.len() {
            let Some(word) = words.get((start + offset) % words.len()) else {
                continue;
            };
            if self.registry.claim(word) {
                return Ok(self.hand_out(word));
            }
        }

        Err(WordListError::Exhausted { words: words.len() })
    }

    /// Number of filler terms handed out so far.
    pub fn generated(&self) -> usize {
        self.generated.load(Ordering::SeqCst)
    }

    fn hand_out(&self, word: &str) -> String {
        self.generated.fetch_add(1, Ordering::SeqCst);
        word.to_string()
    }
}
