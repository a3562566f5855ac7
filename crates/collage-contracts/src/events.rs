use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::error::RecordError;

pub type EventPayload = Map<String, Value>;

pub const RUN_STARTED: &str = "run_started";
pub const TERM_DISPATCHED: &str = "term_dispatched";
pub const FETCH_FAILED: &str = "fetch_failed";
pub const PHOTO_COLLECTED: &str = "photo_collected";
pub const COLLAGE_RENDERED: &str = "collage_rendered";
pub const COLLAGE_SAVED: &str = "collage_saved";
pub const RUN_FINISHED: &str = "run_finished";

/// Append-only JSONL log of a collage run.
///
/// - every line carries `type`, `run_id` and `ts`
/// - caller payload is merged last and may override those keys
/// - writers are cheap to clone and safe to share across fetch threads
/// - handles made by [`EventWriter::for_run`] share the file but keep their own run id
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
    run_id: Arc<str>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                lock: Mutex::new(()),
            }),
            run_id: Arc::from(run_id.into()),
        }
    }

    /// A handle on the same log that tags its events with `run_id`.
    pub fn for_run(&self, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            run_id: Arc::from(run_id.into()),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> Result<Value, RecordError> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert("run_id".to_string(), Value::String(self.run_id.to_string()));
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(payload);

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        let _guard = self.inner.lock.lock().map_err(|_| RecordError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;

        Ok(Value::Object(event))
    }
}

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::thread;

    use chrono::DateTime;

    use super::*;

    #[test]
    fn emit_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "collage-123");

        let mut payload = EventPayload::new();
        payload.insert("term".to_string(), Value::String("badger".to_string()));
        let emitted = writer.emit(TERM_DISPATCHED, payload)?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], Value::String(TERM_DISPATCHED.to_string()));
        assert_eq!(parsed["run_id"], Value::String("collage-123".to_string()));
        assert_eq!(parsed["term"], Value::String("badger".to_string()));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn payload_can_override_default_keys() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "collage-123");

        let mut payload = EventPayload::new();
        payload.insert("run_id".to_string(), Value::String("other".to_string()));
        let emitted = writer.emit(RUN_STARTED, payload)?;

        assert_eq!(emitted["type"], Value::String(RUN_STARTED.to_string()));
        assert_eq!(emitted["run_id"], Value::String("other".to_string()));
        Ok(())
    }

    #[test]
    fn run_handles_share_the_log_but_not_the_run_id() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let base = EventWriter::new(&path, "pending");
        let first = base.for_run("first");
        let second = base.for_run("second");

        first.emit(RUN_STARTED, EventPayload::new())?;
        second.emit(RUN_STARTED, EventPayload::new())?;
        first.emit(RUN_FINISHED, EventPayload::new())?;

        assert_eq!(base.run_id(), "pending");
        let content = fs::read_to_string(&path)?;
        let run_ids: Vec<String> = content
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row["run_id"].as_str().map(str::to_string))
            .collect();
        assert_eq!(run_ids, vec!["first", "second", "first"]);
        Ok(())
    }

    #[test]
    fn concurrent_emits_keep_lines_intact() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "collage-123");

        let handles: Vec<_> = (0..8)
            .map(|idx| {
                let writer = writer.clone();
                thread::spawn(move || {
                    let mut payload = EventPayload::new();
                    payload.insert("idx".to_string(), Value::from(idx));
                    writer.emit(PHOTO_COLLECTED, payload).map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.join().map_err(|_| anyhow::anyhow!("emit thread panicked"))??;
        }

        let content = fs::read_to_string(&path)?;
        let parsed: Vec<Value> = content
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(parsed.len(), 8);
        Ok(())
    }
}
