// src/scenes/studying/logic.rs

use crate::review::ReviewError;
use crate::state::StudySessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    Advanced,
    /// `Next` on the last card. The position does not move.
    DeckExhausted,
    /// `Previous` on the first card. The position does not move.
    AtStart,
}

/// What a finished review does to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Advanced,
    Completed,
    Failed(ReviewError),
}

/// Moves the cursor one card. Landing on a new card always shows its question.
pub fn step(state: &mut StudySessionState, direction: Direction) -> AdvanceResult {
    match direction {
        Direction::Next if state.is_last_card() => AdvanceResult::DeckExhausted,
        Direction::Next => {
            state.position += 1;
            state.is_revealed = false;
            AdvanceResult::Advanced
        }
        Direction::Previous if state.position == 0 => AdvanceResult::AtStart,
        Direction::Previous => {
            state.position -= 1;
            state.is_revealed = false;
            AdvanceResult::Advanced
        }
    }
}

/// Applies the sink's answer for the card under the cursor.
/// A failure leaves the cursor exactly where it was.
pub fn apply_review(state: &mut StudySessionState, result: Result<(), ReviewError>) -> ReviewOutcome {
    state.in_flight = None;
    match result {
        Ok(()) if state.is_last_card() => ReviewOutcome::Completed,
        Ok(()) => {
            step(state, Direction::Next);
            ReviewOutcome::Advanced
        }
        Err(e) => ReviewOutcome::Failed(e),
    }
}
