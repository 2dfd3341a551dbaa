// src/storage/replay_log.rs
// Manages the plain-text transaction log of review attempts.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::review::{Confidence, ReviewError, ReviewSink};

pub struct ReplayLogger {
    log_path: PathBuf,
}

impl ReplayLogger {
    /// Creates a logger writing to `<dir>/<name>.log`.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Result<Self, std::io::Error> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(ReplayLogger { log_path: dir.join(format!("{}.log", name)) })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Appends a single review attempt to the log file.
    pub fn log_review(
        &self,
        card_id: &str,
        confidence: Confidence,
        outcome: &Result<(), ReviewError>,
    ) -> Result<(), std::io::Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        // Format: timestamp_iso,card_id,confidence,outcome
        let timestamp = chrono::Utc::now().to_rfc3339();
        let status = match outcome {
            Ok(()) => "ok",
            Err(_) => "failed",
        };
        let log_entry = format!("{},{},{},{}\n", timestamp, card_id, confidence, status);

        file.write_all(log_entry.as_bytes())?;
        Ok(())
    }
}

/// Wraps a sink and writes every attempt to a replay log.
pub struct LoggedReviewSink<S> {
    inner: S,
    logger: ReplayLogger,
}

impl<S: ReviewSink> LoggedReviewSink<S> {
    pub fn new(inner: S, logger: ReplayLogger) -> Self {
        LoggedReviewSink { inner, logger }
    }
}

impl<S: ReviewSink> ReviewSink for LoggedReviewSink<S> {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError> {
        let outcome = self.inner.submit_review(card_id, confidence);
        if let Err(e) = self.logger.log_review(card_id, confidence, &outcome) {
            log::warn!("Could not write replay log {:?}: {}", self.logger.path(), e);
        }
        outcome
    }
}
