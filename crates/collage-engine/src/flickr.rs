use std::time::Duration;

use image::DynamicImage;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::PhotoFetcher;

pub const DEFAULT_API_BASE: &str = "https://api.flickr.com/services/rest/";

/// Top-rated photo lookup against the Flickr REST API.
///
/// A lookup is three requests: `flickr.photos.search` sorted by interestingness for the
/// photo id, `flickr.photos.getSizes` for its renditions, then a download of the middle
/// rendition.
#[derive(Debug, Clone)]
pub struct FlickrFetcher {
    api_key: String,
    api_base: String,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    stat: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<PhotoPage>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photo: Vec<PhotoRef>,
}

#[derive(Debug, Deserialize)]
struct PhotoRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    stat: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sizes: Option<SizeList>,
}

#[derive(Debug, Default, Deserialize)]
struct SizeList {
    #[serde(default)]
    size: Vec<PhotoSize>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    source: String,
}

impl FlickrFetcher {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let api_base = api_base.into().trim().to_string();
        Ok(Self {
            api_key: api_key.into().trim().to_string(),
            api_base: if api_base.is_empty() {
                DEFAULT_API_BASE.to_string()
            } else {
                api_base
            },
            http: HttpClient::builder().timeout(timeout).build()?,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let response = self
            .http
            .get(&self.api_base)
            .query(&[
                ("method", method),
                ("format", "json"),
                ("nojsoncallback", "1"),
                ("api_key", self.api_key.as_str()),
            ])
            .query(params)
            .send()?;
        response_text_or_error(response)
    }

    fn search_photo_id(&self, term: &str) -> Result<String, FetchError> {
        let body = self.call(
            "flickr.photos.search",
            &[
                ("sort", "interestingness-desc"),
                ("per_page", "1"),
                ("page", "1"),
                ("text", term),
            ],
        )?;
        parse_search_response(term, &body)
    }

    fn photo_source_url(&self, photo_id: &str) -> Result<String, FetchError> {
        let body = self.call("flickr.photos.getSizes", &[("photo_id", photo_id)])?;
        parse_sizes_response(photo_id, &body)
    }

    fn download(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let response = self.http.get(url).send()?;
        if !response.status().is_success() {
            let code = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(FetchError::Http {
                code,
                body: truncate_text(&body, 512),
            });
        }
        let bytes = response.bytes()?;
        Ok(image::load_from_memory(&bytes)?)
    }
}

impl PhotoFetcher for FlickrFetcher {
    fn name(&self) -> &str {
        "flickr"
    }

    fn fetch_top_rated_photo(&self, term: &str) -> Result<DynamicImage, FetchError> {
        if self.api_key.is_empty() {
            return Err(FetchError::MissingApiKey);
        }
        debug!(term, "searching for photo");
        let photo_id = self.search_photo_id(term)?;
        debug!(term, photo_id = %photo_id, "found photo");
        let url = self.photo_source_url(&photo_id)?;
        self.download(&url)
    }
}

fn response_text_or_error(response: HttpResponse) -> Result<String, FetchError> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(FetchError::Http {
            code: status.as_u16(),
            body: truncate_text(&body, 512),
        });
    }
    Ok(body)
}

fn parse_search_response(term: &str, body: &str) -> Result<String, FetchError> {
    let parsed: SearchResponse = serde_json::from_str(body)?;
    if parsed.stat != "ok" {
        return Err(FetchError::Api {
            status: parsed.stat,
            message: parsed.message.unwrap_or_default(),
        });
    }
    parsed
        .photos
        .unwrap_or_default()
        .photo
        .into_iter()
        .next()
        .map(|photo| photo.id)
        .ok_or_else(|| FetchError::NotFound {
            term: term.to_string(),
        })
}

/// Picks the middle rendition: large enough for a tile without downloading the original.
fn parse_sizes_response(photo_id: &str, body: &str) -> Result<String, FetchError> {
    let parsed: SizesResponse = serde_json::from_str(body)?;
    if parsed.stat != "ok" {
        return Err(FetchError::Api {
            status: parsed.stat,
            message: parsed.message.unwrap_or_default(),
        });
    }
    let mut sizes = parsed.sizes.unwrap_or_default().size;
    if sizes.is_empty() {
        return Err(FetchError::NoSizes {
            photo_id: photo_id.to_string(),
        });
    }
    let middle = sizes.len() / 2;
    Ok(sizes.swap_remove(middle).source)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}
