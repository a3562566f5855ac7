use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;
use crate::events::now_utc_iso;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTerm {
    pub term: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollageSummary {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub width: u32,
    pub output_path: Option<String>,
    pub requested_terms: Vec<String>,
    pub claimed_terms: Vec<String>,
    pub filler_terms: Vec<String>,
    pub failed_terms: Vec<FailedTerm>,
    pub photos: usize,
}

/// Writes `summary` as pretty JSON with a `ts` stamp. `extra` keys are merged last.
pub fn write_summary(
    path: &Path,
    summary: &CollageSummary,
    extra: Option<&Map<String, Value>>,
) -> Result<(), RecordError> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        payload.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}

pub fn read_summary(path: &Path) -> Result<CollageSummary, RecordError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn summary() -> CollageSummary {
        CollageSummary {
            run_id: "collage-abc".to_string(),
            started_at: now_utc_iso(),
            finished_at: now_utc_iso(),
            width: 1920,
            output_path: Some("collage.jpg".to_string()),
            requested_terms: vec!["badger".to_string(), "badger".to_string()],
            claimed_terms: vec!["badger".to_string(), "aardvark".to_string()],
            filler_terms: vec!["aardvark".to_string()],
            failed_terms: vec![FailedTerm {
                term: "zyzzyva".to_string(),
                reason: "no photo found".to_string(),
            }],
            photos: 10,
        }
    }

    #[test]
    fn summary_survives_a_write_and_read() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("runs").join("summary.json");
        let expected = summary();

        write_summary(&path, &expected, None)?;

        assert_eq!(read_summary(&path)?, expected);
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert!(raw["ts"].is_string());
        Ok(())
    }

    #[test]
    fn extra_keys_are_merged() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("summary.json");
        let mut extra = Map::new();
        extra.insert("fetcher".to_string(), json!("dryrun"));

        write_summary(&path, &summary(), Some(&extra))?;

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(raw["fetcher"], json!("dryrun"));
        assert_eq!(raw["photos"], json!(10));
        Ok(())
    }
}
