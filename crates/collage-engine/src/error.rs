use std::path::PathBuf;

use collage_contracts::terms::WordListError;
use thiserror::Error;

/// A single term's lookup failed. The orchestrator recovers from these by
/// dispatching a different term.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("couldn't find a photo for {term}")]
    NotFound { term: String },
    #[error("no sizes listed for photo {photo_id}")]
    NoSizes { photo_id: String },
    #[error("API call failed with status {status}: {message}")]
    Api { status: String, message: String },
    #[error("request failed ({code}): {body}")]
    Http { code: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("undecodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("FLICKR_API_KEY not set")]
    MissingApiKey,
    #[error("fetcher panicked while looking up {term}")]
    Panicked { term: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no images to lay out")]
    NoImages,
    #[error("width {width} is too small for {columns} columns with a {border}px border")]
    WidthTooSmall { width: u32, columns: u32, border: u32 },
}

/// Errors that abort a collage run.
#[derive(Debug, Error)]
pub enum CollageError {
    #[error("filler terms unavailable: {0}")]
    WordList(#[from] WordListError),
    #[error("collage layout failed: {0}")]
    Render(#[from] RenderError),
    #[error("failed to spawn fetch for {term}: {source}")]
    Spawn {
        term: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to build photo fetcher: {0}")]
    Fetcher(#[source] FetchError),
    #[error("{0}")]
    Config(String),
}
