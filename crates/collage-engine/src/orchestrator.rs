//! Turns caller terms into exactly `target` fetched photos.
//!
//! Every dispatched term runs on its own thread and reports one outcome over a
//! shared channel. Failed terms are never retried; each failure dispatches a fresh
//! filler term instead, so the number of successes keeps converging on the target.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use collage_contracts::events::{
    EventPayload, EventWriter, FETCH_FAILED, PHOTO_COLLECTED, TERM_DISPATCHED,
};
use collage_contracts::runs::summary::FailedTerm;
use collage_contracts::terms::{FillerTermGenerator, TermRegistry, WordListCache};
use image::DynamicImage;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{CollageError, FetchError};
use crate::fetcher::PhotoFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSource {
    Explicit,
    Filler,
}

impl TermSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TermSource::Explicit => "explicit",
            TermSource::Filler => "filler",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedTerm {
    pub term: String,
    pub source: TermSource,
}

#[derive(Debug, Clone)]
pub struct CollectedPhoto {
    pub term: String,
    pub source: TermSource,
    pub image: DynamicImage,
}

/// What one collection pass produced. `photos` is in arrival order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub photos: Vec<CollectedPhoto>,
    pub dispatched: Vec<DispatchedTerm>,
    pub failures: Vec<FailedTerm>,
}

#[derive(Debug)]
struct FetchOutcome {
    term: String,
    source: TermSource,
    result: Result<DynamicImage, FetchError>,
}

/// State owned by a single collage run: the claimed terms and the filler source
/// drawing against them.
#[derive(Debug)]
pub struct CollageRun {
    registry: TermRegistry,
    filler: FillerTermGenerator,
}

impl CollageRun {
    pub fn new(words: Arc<WordListCache>, seed: Option<u64>) -> Self {
        let registry = TermRegistry::new();
        let filler = match seed {
            Some(seed) => FillerTermGenerator::with_seed(registry.clone(), words, seed),
            None => FillerTermGenerator::new(registry.clone(), words),
        };
        Self { registry, filler }
    }

    pub fn registry(&self) -> &TermRegistry {
        &self.registry
    }

    pub fn filler(&self) -> &FillerTermGenerator {
        &self.filler
    }
}

pub struct FetchOrchestrator<'run> {
    run: &'run CollageRun,
    fetcher: Arc<dyn PhotoFetcher>,
    target: usize,
    events: Option<EventWriter>,
}

impl<'run> FetchOrchestrator<'run> {
    pub fn new(run: &'run CollageRun, fetcher: Arc<dyn PhotoFetcher>, target: usize) -> Self {
        Self {
            run,
            fetcher,
            target,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Option<EventWriter>) -> Self {
        self.events = events;
        self
    }

    /// Fetches until `target` photos have arrived.
    ///
    /// The first `target` distinct non-blank terms are dispatched in input order; the
    /// rest are never claimed. Missing slots and every failed fetch are covered by
    /// filler terms. Fetches still running when the target is reached are left to
    /// finish on their own and their outcomes are dropped.
    pub fn collect<S: AsRef<str>>(&self, terms: &[S]) -> Result<FetchReport, CollageError> {
        let (sender, receiver) = mpsc::channel::<FetchOutcome>();
        let mut report = FetchReport::default();

        for term in terms {
            if report.dispatched.len() >= self.target {
                break;
            }
            let term = term.as_ref();
            if term.trim().is_empty() {
                continue;
            }
            if !self.run.registry.claim(term) {
                debug!(term, "skipping repeated term");
                continue;
            }
            self.dispatch(term.to_string(), TermSource::Explicit, &sender, &mut report)?;
        }

        while report.dispatched.len() < self.target {
            let term = self.run.filler.next_term()?;
            self.dispatch(term, TermSource::Filler, &sender, &mut report)?;
        }

        report.photos.reserve(self.target);
        while report.photos.len() < self.target {
            let Ok(outcome) = receiver.recv() else {
                break;
            };
            match outcome.result {
                Ok(image) => {
                    debug!(term = %outcome.term, "photo collected");
                    report.photos.push(CollectedPhoto {
                        term: outcome.term,
                        source: outcome.source,
                        image,
                    });
                    self.record(
                        PHOTO_COLLECTED,
                        json!({
                            "term": report.photos.last().map(|photo| photo.term.as_str()),
                            "collected": report.photos.len(),
                            "target": self.target,
                        }),
                    );
                }
                Err(err) => {
                    warn!(
                        term = %outcome.term,
                        error = %err,
                        "fetch failed; substituting a new term"
                    );
                    self.record(
                        FETCH_FAILED,
                        json!({
                            "term": outcome.term,
                            "source": outcome.source.as_str(),
                            "error": err.to_string(),
                        }),
                    );
                    report.failures.push(FailedTerm {
                        term: outcome.term,
                        reason: err.to_string(),
                    });
                    let replacement = self.run.filler.next_term()?;
                    self.dispatch(replacement, TermSource::Filler, &sender, &mut report)?;
                }
            }
        }

        Ok(report)
    }

    fn dispatch(
        &self,
        term: String,
        source: TermSource,
        sender: &Sender<FetchOutcome>,
        report: &mut FetchReport,
    ) -> Result<(), CollageError> {
        debug!(term = %term, source = source.as_str(), "dispatching fetch");
        self.record(
            TERM_DISPATCHED,
            json!({ "term": term, "source": source.as_str() }),
        );

        let fetcher = Arc::clone(&self.fetcher);
        let sender = sender.clone();
        let worker_term = term.clone();
        thread::Builder::new()
            .name(format!("fetch-{}", term.replace('\0', "")))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    fetcher.fetch_top_rated_photo(&worker_term)
                }))
                .unwrap_or_else(|_| {
                    Err(FetchError::Panicked {
                        term: worker_term.clone(),
                    })
                });
                // The receiver is gone once the run has enough photos.
                let _ = sender.send(FetchOutcome {
                    term: worker_term,
                    source,
                    result,
                });
            })
            .map_err(|source| CollageError::Spawn {
                term: term.clone(),
                source,
            })?;

        report.dispatched.push(DispatchedTerm { term, source });
        Ok(())
    }

    fn record(&self, event_type: &str, payload: Value) {
        record_event(self.events.as_ref(), event_type, payload);
    }
}

/// Appends to the run's event log, if any. Write failures are logged, never fatal.
pub(crate) fn record_event(events: Option<&EventWriter>, event_type: &str, payload: Value) {
    let Some(events) = events else {
        return;
    };
    let payload = match payload {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    };
    if let Err(err) = events.emit(event_type, payload) {
        warn!(event = event_type, error = %err, "failed to record run event");
    }
}
