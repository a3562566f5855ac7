use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexSet;

/// Terms claimed during one collage run.
///
/// Clones share the same set. A term is claimed at most once; `claim` is a
/// single check-and-insert under the lock.
#[derive(Debug, Clone, Default)]
pub struct TermRegistry {
    inner: Arc<Mutex<IndexSet<String>>>,
}

impl TermRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `term` and returns true, or returns false if it was already claimed.
    pub fn claim(&self, term: &str) -> bool {
        let mut claimed = self.lock();
        if claimed.contains(term) {
            return false;
        }
        claimed.insert(term.to_string())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.lock().contains(term)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Claimed terms in claim order.
    pub fn claimed(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, IndexSet<String>> {
        // Inserts are single calls, so a panicking holder cannot leave the set half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::TermRegistry;

    #[test]
    fn claim_records_term_once() {
        let registry = TermRegistry::new();
        assert!(registry.claim("badger"));
        assert!(!registry.claim("badger"));
        assert!(registry.contains("badger"));
        assert!(!registry.contains("mushroom"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn claimed_keeps_claim_order() {
        let registry = TermRegistry::new();
        for term in ["mushroom", "badger", "snake", "badger"] {
            registry.claim(term);
        }
        assert_eq!(registry.claimed(), vec!["mushroom", "badger", "snake"]);
    }

    #[test]
    fn clones_share_claims() {
        let registry = TermRegistry::new();
        let handle = registry.clone();
        assert!(handle.claim("badger"));
        assert!(!registry.claim("badger"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn concurrent_claims_of_one_term_succeed_exactly_once() {
        const CLAIMERS: usize = 64;
        let registry = TermRegistry::new();
        let barrier = Arc::new(Barrier::new(CLAIMERS));

        let handles: Vec<_> = (0..CLAIMERS)
            .map(|_| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.claim("badger")
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(false))
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn concurrent_claims_of_distinct_terms_all_land() {
        let registry = TermRegistry::new();
        let handles: Vec<_> = (0..16)
            .map(|worker| {
                let registry = registry.clone();
                thread::spawn(move || {
                    (0..50)
                        .filter(|idx| registry.claim(&format!("term-{}", idx % 25 + worker * 25)))
                        .count()
                })
            })
            .collect();
        let wins: usize = handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or(0))
            .sum();
        assert_eq!(wins, 16 * 25);
        assert_eq!(registry.count(), 16 * 25);
    }
}
