use std::env;
use std::path::PathBuf;
use std::time::Duration;

use collage_contracts::terms::DEFAULT_WORDS_PATH;

use crate::error::CollageError;
use crate::flickr::{FlickrFetcher, DEFAULT_API_BASE};

pub const API_KEY_ENV: &str = "FLICKR_API_KEY";
pub const API_BASE_ENV: &str = "FLICKR_API_BASE";
pub const WORDS_PATH_ENV: &str = "COLLAGE_WORDS_PATH";

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_OUTPUT: &str = "collage.jpg";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollageConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub words_path: PathBuf,
    pub width: u32,
    pub output: PathBuf,
    pub seed: Option<u64>,
    pub http_timeout: Duration,
}

impl Default for CollageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            words_path: PathBuf::from(DEFAULT_WORDS_PATH),
            width: DEFAULT_WIDTH,
            output: PathBuf::from(DEFAULT_OUTPUT),
            seed: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl CollageConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            api_key: non_empty(API_KEY_ENV),
            api_base: non_empty(API_BASE_ENV).unwrap_or(defaults.api_base),
            words_path: non_empty(WORDS_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.words_path),
            ..defaults
        }
    }

    pub fn require_api_key(&self) -> Result<&str, CollageError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CollageError::Config(format!(
                    "You need to specify a Flickr API key. Use --api-key or the {API_KEY_ENV} env var"
                ))
            })
    }

    pub fn flickr_fetcher(&self) -> Result<FlickrFetcher, CollageError> {
        let api_key = self.require_api_key()?;
        FlickrFetcher::new(api_key, self.api_base.as_str(), self.http_timeout)
            .map_err(CollageError::Fetcher)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = CollageConfig::from_lookup(lookup(&[]));
        assert_eq!(config, CollageConfig::default());
        assert_eq!(config.width, 800);
        assert_eq!(config.output, PathBuf::from("collage.jpg"));
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn environment_overrides_defaults() -> Result<(), CollageError> {
        let config = CollageConfig::from_lookup(lookup(&[
            (API_KEY_ENV, " abc123 "),
            (API_BASE_ENV, "http://localhost:9999/rest/"),
            (WORDS_PATH_ENV, "/tmp/words"),
        ]));
        assert_eq!(config.require_api_key()?, "abc123");
        assert_eq!(config.api_base, "http://localhost:9999/rest/");
        assert_eq!(config.words_path, PathBuf::from("/tmp/words"));

        let fetcher = config.flickr_fetcher()?;
        assert_eq!(fetcher.api_base(), "http://localhost:9999/rest/");
        Ok(())
    }

    #[test]
    fn blank_api_key_is_missing() {
        let config = CollageConfig::from_lookup(lookup(&[(API_KEY_ENV, "   ")]));
        assert_eq!(config.api_key, None);
        let err = config.require_api_key().err();
        assert!(matches!(err, Some(CollageError::Config(ref message)) if message.contains("--api-key")));
    }
}
