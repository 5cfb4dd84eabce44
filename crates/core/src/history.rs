//! Conversation history log.
//!
//! Append-only JSON Lines file: one `(question, answer)` pair per line,
//! flushed to disk before the answer is returned. Loaded fully into memory at
//! startup; entries are never mutated or removed. Unreadable lines are logged
//! and skipped rather than discarding the whole log.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct HistoryLog {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Loads the log from `path`. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let mut entries = Vec::new();

        match std::fs::File::open(path) {
            Ok(file) => {
                for (line_no, line) in BufReader::new(file).lines().enumerate() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HistoryEntry>(&line) {
                        Ok(entry) => entries.push(entry),
                        Err(error) => {
                            tracing::warn!(
                                path = %path.display(),
                                line = line_no + 1,
                                %error,
                                "skipping unreadable history line"
                            );
                        }
                    }
                }
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(error),
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Appends one entry and flushes it to disk before returning. No dedup:
    /// asking the same question twice produces two entries.
    pub fn append(&mut self, question: &str, answer: &str) -> Result<(), std::io::Error> {
        let entry = HistoryEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            asked_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&entry)?;
        writeln!(file, "{line}")?;
        file.sync_all()?;

        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
