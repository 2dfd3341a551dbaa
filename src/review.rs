// src/review.rs
// The review boundary: confidence ratings and the sink that persists them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The user's recall strength for a card, from 1 (no idea) to 5 (instant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Confidence(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("confidence must be between 1 and 5, got {0}")]
pub struct InvalidConfidence(pub i64);

impl Confidence {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, InvalidConfidence> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Confidence(value))
        } else {
            Err(InvalidConfidence(value as i64))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Confidence {
    type Error = InvalidConfidence;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidConfidence(value))
            .and_then(|v| Confidence::new(v).map_err(|_| InvalidConfidence(value)))
    }
}

impl From<Confidence> for u8 {
    fn from(c: Confidence) -> u8 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a review could not be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("review request failed: {0}")]
    Transport(String),

    #[error("review rejected with status {status}")]
    Rejected { status: u16 },

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Persists a confidence rating against a card.
///
/// Implementations may block on I/O. The study session calls them from a
/// worker thread.
pub trait ReviewSink: Send + Sync {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError>;
}

impl<S: ReviewSink + ?Sized> ReviewSink for Arc<S> {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError> {
        (**self).submit_review(card_id, confidence)
    }
}

impl<S: ReviewSink + ?Sized> ReviewSink for Box<S> {
    fn submit_review(&self, card_id: &str, confidence: Confidence) -> Result<(), ReviewError> {
        (**self).submit_review(card_id, confidence)
    }
}
