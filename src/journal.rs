//! Per-request journal, persisted as JSONL with a bounded in-memory tail.

use crate::backend::BackendTarget;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MAX_JOURNAL_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Rejected,
    UpstreamFailed,
    StreamAborted,
    Forwarded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub model: String,
    pub backend: String,
    pub streaming: bool,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl JournalEntry {
    pub fn new(
        request_id: &str,
        model: &str,
        backend: Option<BackendTarget>,
        streaming: bool,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: request_id.to_string(),
            model: model.to_string(),
            backend: backend.map_or("none", BackendTarget::label).to_string(),
            streaming,
            outcome,
            input_tokens: None,
            output_tokens: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = Some(input_tokens);
        self.output_tokens = Some(output_tokens);
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

struct Journal {
    entries: VecDeque<JournalEntry>,
    writer: Option<BufWriter<File>>,
}

impl Journal {
    fn open(file_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = VecDeque::with_capacity(MAX_JOURNAL_ENTRIES);
        let mut dropped = 0usize;

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                let Ok(entry) = serde_json::from_str::<JournalEntry>(&line) else {
                    dropped += 1;
                    continue;
                };
                if entries.len() >= MAX_JOURNAL_ENTRIES {
                    entries.pop_front();
                    dropped += 1;
                }
                entries.push_back(entry);
            }
        }

        if dropped > 0 {
            rewrite(file_path, &entries)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(file_path)?;

        Ok(Self {
            entries,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn record(&mut self, entry: JournalEntry) {
        if let Some(ref mut writer) = self.writer {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{json}");
                let _ = writer.flush();
            }
        }
        if self.entries.len() >= MAX_JOURNAL_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

/// Rewrite the file with only the retained entries.
fn rewrite(file_path: &Path, entries: &VecDeque<JournalEntry>) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(file_path)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        if let Ok(json) = serde_json::to_string(entry) {
            writeln!(writer, "{json}")?;
        }
    }
    writer.flush()
}

#[derive(Clone)]
pub struct RequestJournal {
    inner: Arc<Mutex<Journal>>,
    path: PathBuf,
}

impl RequestJournal {
    pub fn open(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = file_path.as_ref().to_path_buf();
        Ok(Self {
            inner: Arc::new(Mutex::new(Journal::open(&path)?)),
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, entry: JournalEntry) {
        if let Ok(mut journal) = self.inner.lock() {
            journal.record(entry);
        }
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<JournalEntry> {
        self.inner
            .lock()
            .map(|j| j.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");

        let journal = RequestJournal::open(&path).unwrap();
        journal.record(
            JournalEntry::new(
                "req-1",
                "claude-sonnet-4-6",
                Some(BackendTarget::VendorDirect),
                false,
                Outcome::Completed,
            )
            .with_usage(10, 20),
        );
        journal.record(
            JournalEntry::new("req-2", "gemini-3.1-pro", None, true, Outcome::Rejected)
                .with_detail("no backend"),
        );

        let recent = journal.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].request_id, "req-2");
        assert_eq!(recent[0].backend, "none");
        assert_eq!(recent[1].backend, "vendor-direct");
        assert_eq!(recent[1].output_tokens, Some(20));

        drop(journal);
        let reopened = RequestJournal::open(&path).unwrap();
        assert_eq!(reopened.recent(1)[0].request_id, "req-2");
    }

    #[test]
    fn test_corrupt_lines_are_compacted_away() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.jsonl");
        std::fs::write(&path, "not json\n").unwrap();

        let journal = RequestJournal::open(&path).unwrap();
        assert!(journal.recent(10).is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
