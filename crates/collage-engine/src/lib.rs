//! Photo collage engine: resolves search terms to photos concurrently and lays
//! them out as a single image.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod flickr;
pub mod orchestrator;
pub mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use collage_contracts::events::{
    now_utc_iso, EventWriter, COLLAGE_RENDERED, COLLAGE_SAVED, RUN_FINISHED, RUN_STARTED,
};
use collage_contracts::runs::summary::{CollageSummary, FailedTerm};
use collage_contracts::terms::WordListCache;
use collage_contracts::COLLAGE_SIZE;
use image::{DynamicImage, GenericImageView};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

pub use config::CollageConfig;
pub use error::{CollageError, FetchError, RenderError};
pub use fetcher::{DryrunFetcher, PhotoFetcher};
pub use flickr::FlickrFetcher;
pub use orchestrator::{CollageRun, FetchOrchestrator, FetchReport, TermSource};
pub use render::{CollageRenderer, GridRenderer, ImageWriter, JpegWriter};

use orchestrator::record_event;

/// Outcome of one run, without the pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub width: u32,
    pub requested_terms: Vec<String>,
    /// Every claimed term, in claim order.
    pub claimed_terms: Vec<String>,
    pub filler_terms: Vec<String>,
    /// Terms whose photos made it into the collage, in arrival order.
    pub photo_terms: Vec<String>,
    pub failed_terms: Vec<FailedTerm>,
    pub output_path: Option<PathBuf>,
}

impl RunReport {
    pub fn photos(&self) -> usize {
        self.photo_terms.len()
    }

    pub fn to_summary(&self) -> CollageSummary {
        CollageSummary {
            run_id: self.run_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: self.finished_at.clone(),
            width: self.width,
            output_path: self
                .output_path
                .as_ref()
                .map(|path| path.display().to_string()),
            requested_terms: self.requested_terms.clone(),
            claimed_terms: self.claimed_terms.clone(),
            filler_terms: self.filler_terms.clone(),
            failed_terms: self.failed_terms.clone(),
            photos: self.photos(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collage {
    pub image: DynamicImage,
    pub report: RunReport,
}

/// Builds collages of exactly [`COLLAGE_SIZE`] photos.
///
/// Term bookkeeping is scoped to each call; only the loaded word list is kept
/// between runs.
pub struct CollageEngine {
    fetcher: Arc<dyn PhotoFetcher>,
    words: Arc<WordListCache>,
    renderer: Box<dyn CollageRenderer>,
    writer: Box<dyn ImageWriter>,
    events: Option<EventWriter>,
    seed: Option<u64>,
}

impl CollageEngine {
    pub fn new(fetcher: Arc<dyn PhotoFetcher>, words: WordListCache) -> Self {
        Self {
            fetcher,
            words: Arc::new(words),
            renderer: Box::new(GridRenderer::default()),
            writer: Box::new(JpegWriter::default()),
            events: None,
            seed: None,
        }
    }

    pub fn with_renderer(mut self, renderer: impl CollageRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_writer(mut self, writer: impl ImageWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    /// Fixes the filler draw sequence. Every run of this engine then picks the same fillers.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn fetcher_name(&self) -> &str {
        self.fetcher.name()
    }

    pub fn words(&self) -> &WordListCache {
        &self.words
    }

    pub fn create_collage<S: AsRef<str>>(
        &self,
        terms: &[S],
        width: u32,
    ) -> Result<Collage, CollageError> {
        let run_id = new_run_id();
        let events = self.run_events(&run_id);
        let mut collage = self.assemble(run_id, events.as_ref(), terms, width)?;
        finish(events.as_ref(), &mut collage.report);
        Ok(collage)
    }

    pub fn create_and_save<S: AsRef<str>>(
        &self,
        terms: &[S],
        width: u32,
        path: &Path,
    ) -> Result<RunReport, CollageError> {
        let run_id = new_run_id();
        let events = self.run_events(&run_id);
        let Collage { image, mut report } = self.assemble(run_id, events.as_ref(), terms, width)?;
        self.writer.save(&image, path)?;
        info!(path = %path.display(), "collage written");
        record_event(
            events.as_ref(),
            COLLAGE_SAVED,
            json!({ "path": path.display().to_string() }),
        );
        report.output_path = Some(path.to_path_buf());
        finish(events.as_ref(), &mut report);
        Ok(report)
    }

    fn run_events(&self, run_id: &str) -> Option<EventWriter> {
        self.events.as_ref().map(|events| events.for_run(run_id))
    }

    fn assemble<S: AsRef<str>>(
        &self,
        run_id: String,
        events: Option<&EventWriter>,
        terms: &[S],
        width: u32,
    ) -> Result<Collage, CollageError> {
        let started_at = now_utc_iso();
        let requested_terms: Vec<String> = terms
            .iter()
            .map(|term| term.as_ref().to_string())
            .collect();

        info!(run_id = %run_id, terms = requested_terms.len(), width, "collage run started");
        record_event(
            events,
            RUN_STARTED,
            json!({
                "terms": requested_terms,
                "width": width,
                "fetcher": self.fetcher.name(),
            }),
        );

        let run = CollageRun::new(Arc::clone(&self.words), self.seed);
        let fetched = FetchOrchestrator::new(&run, Arc::clone(&self.fetcher), COLLAGE_SIZE)
            .with_events(events.cloned())
            .collect(terms)?;
        info!(
            photos = fetched.photos.len(),
            failures = fetched.failures.len(),
            "found {} photos",
            fetched.photos.len()
        );

        let filler_terms = fetched
            .dispatched
            .iter()
            .filter(|dispatched| dispatched.source == TermSource::Filler)
            .map(|dispatched| dispatched.term.clone())
            .collect();
        let (photo_terms, images): (Vec<String>, Vec<DynamicImage>) = fetched
            .photos
            .into_iter()
            .map(|photo| (photo.term, photo.image))
            .unzip();

        let image = self.renderer.layout(&images, width)?;
        let (rendered_width, rendered_height) = image.dimensions();
        record_event(
            events,
            COLLAGE_RENDERED,
            json!({ "width": rendered_width, "height": rendered_height }),
        );

        Ok(Collage {
            image,
            report: RunReport {
                run_id,
                started_at,
                finished_at: String::new(),
                width,
                requested_terms,
                claimed_terms: run.registry().claimed(),
                filler_terms,
                photo_terms,
                failed_terms: fetched.failures,
                output_path: None,
            },
        })
    }
}

fn new_run_id() -> String {
    format!("collage-{}", Uuid::new_v4().simple())
}

fn finish(events: Option<&EventWriter>, report: &mut RunReport) {
    report.finished_at = now_utc_iso();
    record_event(
        events,
        RUN_FINISHED,
        json!({
            "photos": report.photos(),
            "claimed": report.claimed_terms.len(),
            "failures": report.failed_terms.len(),
        }),
    );
}
