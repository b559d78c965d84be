// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON-lines feedback log

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::log::{FeedbackEvent, FeedbackLog};
use crate::Result;

/// One JSON object per line, appended in place
pub struct JsonlFeedbackLog {
    path: PathBuf,
}

impl JsonlFeedbackLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get log file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedbackLog for JsonlFeedbackLog {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn append(&self, event: &FeedbackEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // Whole record in a single write, starting on a fresh line
        let mut line = String::new();
        if ends_with_torn_line(&mut file)? {
            tracing::warn!("Terminating torn trailing line in {:?}", self.path);
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(event)?);
        line.push('\n');
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        Ok(())
    }

    fn load_snapshot(&self) -> Result<Vec<FeedbackEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Skipping corrupt feedback line {}: {}", number + 1, e);
                }
            }
        }

        Ok(events)
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// True when the file is non-empty and its last byte is not a newline
fn ends_with_torn_line(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::log::PredictionRecord;
    use chrono::Utc;

    fn prediction(filename: &str) -> FeedbackEvent {
        FeedbackEvent::Prediction(PredictionRecord {
            filename: filename.to_string(),
            category: "Documents".to_string(),
            subcategory: "Legal".to_string(),
            confidence: 80,
            owner: "alice".to_string(),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_append_and_load_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlFeedbackLog::new(dir.path().join("feedback.jsonl"));

        log.append(&prediction("a.pdf")).unwrap();
        log.append(&prediction("b.pdf")).unwrap();

        let filenames: Vec<String> = log
            .load_snapshot()
            .unwrap()
            .into_iter()
            .map(|event| match event {
                FeedbackEvent::Prediction(p) => p.filename,
                other => panic!("expected prediction, got {:?}", other),
            })
            .collect();
        assert_eq!(filenames, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.jsonl");
        let log = JsonlFeedbackLog::new(path.clone());
        log.append(&prediction("a.pdf")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file).unwrap();
        drop(file);
        log.append(&prediction("b.pdf")).unwrap();

        assert_eq!(log.load_snapshot().unwrap().len(), 2);
    }

    #[test]
    fn test_append_after_torn_tail_keeps_new_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback.jsonl");
        fs::write(&path, r#"{"kind":"predic"#).unwrap();

        let log = JsonlFeedbackLog::new(path.clone());
        log.append(&prediction("a.pdf")).unwrap();
        log.append(&prediction("b.pdf")).unwrap();

        assert_eq!(log.load_snapshot().unwrap().len(), 2);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"kind\":\"predic\n"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_missing_file_is_empty_and_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlFeedbackLog::new(dir.path().join("none.jsonl"));
        assert!(log.load_snapshot().unwrap().is_empty());
        log.clear().unwrap();

        log.append(&prediction("a.pdf")).unwrap();
        log.clear().unwrap();
        assert!(log.load_snapshot().unwrap().is_empty());
        assert!(!log.path().exists());
    }
}
