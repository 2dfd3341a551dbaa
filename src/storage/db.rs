// src/storage/db.rs
// Manages the SQLite database holding flashcards and their review counters.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::deck::source::RepositoryError;
use crate::deck::{Difficulty, Flashcard, FlashcardRepository, FlashcardStats, NewFlashcard};
use crate::review::{Confidence, ReviewError, ReviewSink};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("database connection poisoned")]
    Poisoned,
}

impl From<StoreError> for RepositoryError {
    fn from(e: StoreError) -> Self {
        RepositoryError::Storage(e.to_string())
    }
}

impl From<StoreError> for ReviewError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::CardNotFound(id) => ReviewError::CardNotFound(id),
            other => ReviewError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

const CARD_COLUMNS: &str = "id, question, answer, subject, difficulty, times_reviewed, confidence_level";

/// The local flashcard store. The connection sits behind a mutex so the
/// store can double as a review sink for the session's worker thread.
pub struct FlashcardDb {
    conn: Mutex<Connection>,
}

impl FlashcardDb {
    /// Opens (or creates) the database file, making parent directories as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("Opening flashcard database at {:?}", path);
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = FlashcardDb { conn: Mutex::new(conn) };
        db.init_schema()?;
        Ok(db)
    }

    /// Creates the necessary tables if they don't already exist.
    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute(
            "CREATE TABLE IF NOT EXISTS flashcards (
                id                TEXT PRIMARY KEY,
                question          TEXT NOT NULL,
                answer            TEXT NOT NULL,
                subject           TEXT,
                difficulty        TEXT NOT NULL DEFAULT 'medium',
                times_reviewed    INTEGER NOT NULL DEFAULT 0,
                confidence_level  INTEGER NOT NULL DEFAULT 0,
                last_reviewed     TEXT,
                created_at        TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn insert(&self, card: NewFlashcard) -> Result<Flashcard> {
        let id = Uuid::new_v4().to_string();
        self.conn()?.execute(
            "INSERT INTO flashcards (id, question, answer, subject, difficulty, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                card.question,
                card.answer,
                card.subject,
                card.difficulty.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        log::info!("Created flashcard {}", id);
        Ok(Flashcard {
            id,
            question: card.question,
            answer: card.answer,
            subject: card.subject,
            difficulty: card.difficulty,
            times_reviewed: 0,
            confidence_level: 0,
        })
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.conn()?.execute("DELETE FROM flashcards WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// All cards in creation order, optionally for one subject.
    pub fn cards(&self, subject: Option<&str>) -> Result<Vec<Flashcard>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM flashcards WHERE ?1 IS NULL OR subject = ?1 ORDER BY rowid",
            CARD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let cards = stmt
            .query_map([subject], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    pub fn card(&self, id: &str) -> Result<Option<Flashcard>> {
        let sql = format!("SELECT {} FROM flashcards WHERE id = ?1", CARD_COLUMNS);
        Ok(self.conn()?.query_row(&sql, [id], card_from_row).optional()?)
    }

    /// Records one review: bumps the review count and stores the latest
    /// confidence as the card's level.
    pub fn record_review(&self, id: &str, confidence: Confidence) -> Result<Flashcard> {
        let updated = self.conn()?.execute(
            "UPDATE flashcards
             SET times_reviewed = times_reviewed + 1, confidence_level = ?2, last_reviewed = ?3
             WHERE id = ?1",
            params![id, confidence.value(), Utc::now().to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(StoreError::CardNotFound(id.to_string()));
        }
        self.card(id)?.ok_or_else(|| StoreError::CardNotFound(id.to_string()))
    }

    pub fn summary(&self) -> Result<FlashcardStats> {
        let (total, total_reviews, avg_confidence) = self.conn()?.query_row(
            "SELECT COUNT(*), COALESCE(SUM(times_reviewed), 0), COALESCE(AVG(confidence_level), 0.0)
             FROM flashcards",
            [],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, f64>(2)?)),
        )?;
        Ok(FlashcardStats {
            total: total as usize,
            total_reviews: total_reviews as u64,
            avg_confidence,
        })
    }
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Flashcard> {
    let difficulty: String = row.get(4)?;
    Ok(Flashcard {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        subject: row.get(3)?,
        // Rows written by older tools may carry anything here.
        difficulty: difficulty.parse().unwrap_or(Difficulty::Medium),
        times_reviewed: row.get(5)?,
        confidence_level: row.get(6)?,
    })
}

impl FlashcardRepository for FlashcardDb {
    fn list(&self, subject: Option<&str>) -> std::result::Result<Vec<Flashcard>, RepositoryError> {
        Ok(self.cards(subject)?)
    }

    fn get(&self, id: &str) -> std::result::Result<Option<Flashcard>, RepositoryError> {
        Ok(self.card(id)?)
    }

    fn create(&self, card: NewFlashcard) -> std::result::Result<Flashcard, RepositoryError> {
        let card = card.validate()?;
        Ok(self.insert(card)?)
    }

    fn delete(&self, id: &str) -> std::result::Result<bool, RepositoryError> {
        Ok(self.remove(id)?)
    }

    fn stats(&self) -> std::result::Result<FlashcardStats, RepositoryError> {
        Ok(self.summary()?)
    }
}

impl ReviewSink for FlashcardDb {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> std::result::Result<(), ReviewError> {
        let card = self.record_review(card_id, confidence)?;
        log::debug!(
            "Card {} reviewed {} time(s), level {}",
            card.id,
            card.times_reviewed,
            card.confidence_level
        );
        Ok(())
    }
}
