use crate::DocId;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub query: String,
    pub doc_id: DocId,
    #[serde(default)]
    pub timestamp: String,
}

impl ClickEvent {
    pub fn now(query: &str, doc_id: DocId) -> Self {
        let timestamp = time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        Self { query: query.to_string(), doc_id, timestamp }
    }
}

/// Wherever click events accumulate. The ranking side only ever reads the
/// per-document aggregate.
pub trait ClickStore: Send + Sync {
    fn record(&self, event: ClickEvent) -> Result<()>;
    fn counts(&self) -> Result<HashMap<DocId, u64>>;
}

#[derive(Debug, Default)]
pub struct MemoryClickStore {
    counts: Mutex<HashMap<DocId, u64>>,
}

impl MemoryClickStore {
    pub fn new() -> Self { Self::default() }
}

impl ClickStore for MemoryClickStore {
    fn record(&self, event: ClickEvent) -> Result<()> {
        *self.counts.lock().entry(event.doc_id).or_insert(0) += 1;
        Ok(())
    }

    fn counts(&self) -> Result<HashMap<DocId, u64>> {
        Ok(self.counts.lock().clone())
    }
}

/// Append-only JSON-lines log. `counts` rescans the whole file.
pub struct JsonlClickStore {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonlClickStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), writer: Mutex::new(()) }
    }
}

impl ClickStore for JsonlClickStore {
    fn record(&self, event: ClickEvent) -> Result<()> {
        let _guard = self.writer.lock();
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening click log {}", self.path.display()))?;
        let line = serde_json::to_string(&event)?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    fn counts(&self) -> Result<HashMap<DocId, u64>> {
        let mut counts = HashMap::new();
        if !self.path.exists() {
            return Ok(counts);
        }
        let _guard = self.writer.lock();
        let reader = BufReader::new(File::open(&self.path)?);
        for line in reader.split(b'\n') {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) { continue; }
            match serde_json::from_slice::<ClickEvent>(&line) {
                Ok(ev) => *counts.entry(ev.doc_id).or_insert(0) += 1,
                Err(err) => tracing::warn!(%err, "skipping malformed click line"),
            }
        }
        Ok(counts)
    }
}
