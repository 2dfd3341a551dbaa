// src/state.rs

use std::sync::mpsc::Receiver;

use crate::deck::{Flashcard, StudyDeck};
use crate::review::{Confidence, ReviewError};

/// Where a study controller is in its lifecycle.
#[derive(Debug)]
pub enum SessionPhase {
    NoSession,
    Active(StudySessionState),
    /// Every card was rated. Only `start` or `exit` move on from here.
    Completed { total: usize },
}

impl SessionPhase {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionPhase::Active(_))
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SessionPhase::Completed { .. })
    }
}

/// The cursor over a deck while a session is running.
#[derive(Debug)]
pub struct StudySessionState {
    pub deck: StudyDeck,
    pub position: usize,
    pub is_revealed: bool,
    pub in_flight: Option<PendingReview>,
}

impl StudySessionState {
    /// `None` for an empty deck: there is no first card to sit on.
    pub fn new(deck: StudyDeck) -> Option<Self> {
        if deck.is_empty() {
            return None;
        }
        Some(StudySessionState {
            deck,
            position: 0,
            is_revealed: false,
            in_flight: None,
        })
    }

    pub fn current_card(&self) -> &Flashcard {
        &self.deck[self.position]
    }

    pub fn is_last_card(&self) -> bool {
        self.position + 1 == self.deck.len()
    }
}

/// A review that has been handed to the sink and not answered yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReview {
    pub card_id: String,
    pub position: usize,
    pub confidence: Confidence,
}

/// Sent from a review worker thread back to the session that spawned it.
#[derive(Debug)]
pub enum ReviewMessage {
    Finished {
        generation: u64,
        review: PendingReview,
        result: Result<(), ReviewError>,
    },
}

/// The receiving half the controller drains in `poll_review`.
pub type ReviewInbox = Receiver<ReviewMessage>;
