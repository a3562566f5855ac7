use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use collage_contracts::events::EventWriter;
use collage_contracts::runs::summary::write_summary;
use collage_contracts::terms::{FileWordListLoader, WordListCache};
use collage_engine::{CollageConfig, CollageEngine, DryrunFetcher, PhotoFetcher};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "flickr-collage",
    version,
    about = "Builds a collage from the top-rated Flickr photo for each search term"
)]
struct Cli {
    /// Flickr API key. Defaults to FLICKR_API_KEY.
    #[arg(long)]
    api_key: Option<String>,
    /// Output file path.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Desired width of the collage.
    #[arg(long)]
    width: Option<u32>,
    /// Dictionary used for filler terms. Defaults to COLLAGE_WORDS_PATH or /usr/share/dict/words.
    #[arg(long)]
    words: Option<PathBuf>,
    /// Seed for filler term selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Per-request HTTP timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    /// Append run events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
    /// Write a JSON run summary here.
    #[arg(long)]
    summary: Option<PathBuf>,
    /// Use generated tiles instead of Flickr.
    #[arg(long)]
    dryrun: bool,
    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
    /// Search terms; missing ones are filled from the dictionary.
    terms: Vec<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("flickr-collage error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = apply_overrides(&cli, CollageConfig::from_env());
    let fetcher = build_fetcher(&config, cli.dryrun)?;
    let words = WordListCache::new(FileWordListLoader::new(&config.words_path));
    let mut engine = CollageEngine::new(fetcher, words).with_seed(config.seed);
    if let Some(path) = cli.events.as_ref() {
        engine = engine.with_events(EventWriter::new(path, "pending"));
    }
    debug!(
        fetcher = engine.fetcher_name(),
        words = %config.words_path.display(),
        width = config.width,
        "engine ready"
    );

    let report = engine
        .create_and_save(&cli.terms, config.width, &config.output)
        .with_context(|| format!("failed to create collage {}", config.output.display()))?;

    if let Some(path) = cli.summary.as_ref() {
        write_summary(path, &report.to_summary(), None)
            .with_context(|| format!("failed to write summary {}", path.display()))?;
    }

    println!(
        "Collage of {} photos written to {}.",
        report.photos(),
        config.output.display()
    );
    Ok(0)
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(if verbose { "debug" } else { "info" })?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))
}

fn apply_overrides(cli: &Cli, mut config: CollageConfig) -> CollageConfig {
    if let Some(api_key) = cli.api_key.as_ref() {
        config.api_key = Some(api_key.clone());
    }
    if let Some(output) = cli.output.as_ref() {
        config.output = output.clone();
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(words) = cli.words.as_ref() {
        config.words_path = words.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.http_timeout = Duration::from_secs(timeout.max(1));
    }
    config.seed = cli.seed.or(config.seed);
    config
}

fn build_fetcher(config: &CollageConfig, dryrun: bool) -> Result<Arc<dyn PhotoFetcher>> {
    if dryrun {
        return Ok(Arc::new(DryrunFetcher::default()));
    }
    Ok(Arc::new(config.flickr_fetcher()?))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn every_flag_is_described_in_help() {
        let command = Cli::command();
        let undocumented: Vec<&str> = command
            .get_arguments()
            .filter(|arg| !matches!(arg.get_id().as_str(), "help" | "version"))
            .filter(|arg| arg.get_help().is_none())
            .map(|arg| arg.get_id().as_str())
            .collect();
        assert!(undocumented.is_empty(), "undocumented: {undocumented:?}");
    }

    #[test]
    fn flags_override_config() -> Result<()> {
        let cli = Cli::try_parse_from([
            "flickr-collage",
            "--api-key",
            "abc",
            "--output",
            "out/c.jpg",
            "--width",
            "1920",
            "--words",
            "/tmp/words",
            "--seed",
            "7",
            "--timeout",
            "5",
            "badger",
            "mushroom",
        ])?;

        let config = apply_overrides(&cli, CollageConfig::default());

        assert_eq!(cli.terms, vec!["badger", "mushroom"]);
        assert_eq!(config.api_key.as_deref(), Some("abc"));
        assert_eq!(config.output, PathBuf::from("out/c.jpg"));
        assert_eq!(config.width, 1920);
        assert_eq!(config.words_path, PathBuf::from("/tmp/words"));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn unset_flags_keep_config_values() -> Result<()> {
        let cli = Cli::try_parse_from(["flickr-collage"])?;
        let config = apply_overrides(&cli, CollageConfig::default());
        assert_eq!(config, CollageConfig::default());
        assert!(cli.terms.is_empty());
        Ok(())
    }

    #[test]
    fn missing_api_key_is_rejected_unless_dry() -> Result<()> {
        let config = CollageConfig::default();

        let err = build_fetcher(&config, false).err().map(|err| err.to_string());
        assert!(err.is_some_and(|message| message.contains("FLICKR_API_KEY")));

        let fetcher = build_fetcher(&config, true)?;
        assert_eq!(fetcher.name(), "dryrun");
        Ok(())
    }
}
