use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::error::FetchError;

/// Resolves one search term to one photo.
///
/// Every call runs on its own thread and must yield exactly one result.
pub trait PhotoFetcher: Send + Sync {
    fn name(&self) -> &str;
    fn fetch_top_rated_photo(&self, term: &str) -> Result<DynamicImage, FetchError>;
}

/// Offline fetcher: a solid tile whose colour is derived from the term.
#[derive(Debug, Clone, Copy)]
pub struct DryrunFetcher {
    width: u32,
    height: u32,
}

impl DryrunFetcher {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for DryrunFetcher {
    fn default() -> Self {
        Self::new(320, 240)
    }
}

impl PhotoFetcher for DryrunFetcher {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn fetch_top_rated_photo(&self, term: &str) -> Result<DynamicImage, FetchError> {
        let (r, g, b) = color_from_term(term);
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([r, g, b]),
        )))
    }
}

fn color_from_term(term: &str) -> (u8, u8, u8) {
    let digest = Sha256::digest(term.as_bytes());
    (digest[0], digest[1], digest[2])
}
