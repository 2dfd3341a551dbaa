// src/scenes/studying/input.rs

use std::str::FromStr;

use thiserror::Error;

use super::{AdvanceResult, Direction, ReviewResult, SessionError, StudySessionController};
use crate::review::Confidence;

/// One line of user input during study.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyCommand {
    Reveal,
    Next,
    Previous,
    Rate(Confidence),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for StudyCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "f" | "flip" | "r" | "reveal" => Ok(StudyCommand::Reveal),
            "n" | "next" => Ok(StudyCommand::Next),
            "p" | "prev" | "previous" => Ok(StudyCommand::Previous),
            "q" | "quit" | "exit" => Ok(StudyCommand::Quit),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(|n| Confidence::try_from(n).ok())
                .map(StudyCommand::Rate)
                .ok_or_else(|| UnknownCommand(trimmed.to_string())),
        }
    }
}

/// What happened in response to a command, for the caller to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Revealed,
    Moved(AdvanceResult),
    Reviewed(ReviewResult),
    Quit,
}

/// Handles one command for the studying scene, waiting for the review sink
/// when the command is a rating.
pub fn handle_studying_input(
    controller: &mut StudySessionController,
    command: StudyCommand,
) -> Result<InputOutcome, SessionError> {
    match command {
        StudyCommand::Reveal => {
            controller.reveal()?;
            Ok(InputOutcome::Revealed)
        }
        StudyCommand::Next => controller.advance(Direction::Next).map(InputOutcome::Moved),
        StudyCommand::Previous => controller.advance(Direction::Previous).map(InputOutcome::Moved),
        StudyCommand::Rate(confidence) => controller.rate_and_wait(confidence).map(InputOutcome::Reviewed),
        StudyCommand::Quit => {
            controller.exit();
            Ok(InputOutcome::Quit)
        }
    }
}
