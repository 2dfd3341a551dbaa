// src/deck/mod.rs
// This module holds the flashcard data and the decks built from it.

pub mod source;

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use self::source::{load_deck, DeckSelection, FlashcardRepository};

/// Author-assigned difficulty. Never changes during study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty '{0}', expected easy, medium or hard")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// A single question/answer card as the backend reports it.
///
/// `times_reviewed` and `confidence_level` are maintained by whoever stores
/// the card; a study session only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub times_reviewed: u32,
    #[serde(default)]
    pub confidence_level: u8,
}

/// The fields a user supplies when creating a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlashcard {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFlashcard {
    #[error("question must not be empty")]
    EmptyQuestion,
    #[error("answer must not be empty")]
    EmptyAnswer,
}

impl NewFlashcard {
    /// Checks the card is studyable. Blank subjects are normalised to `None`.
    pub fn validate(mut self) -> Result<Self, InvalidFlashcard> {
        if self.question.trim().is_empty() {
            return Err(InvalidFlashcard::EmptyQuestion);
        }
        if self.answer.trim().is_empty() {
            return Err(InvalidFlashcard::EmptyAnswer);
        }
        self.subject = self.subject.filter(|s| !s.trim().is_empty());
        Ok(self)
    }
}

/// Collection-wide review counters. Missing or null fields read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashcardStats {
    #[serde(deserialize_with = "null_as_default")]
    pub total: usize,
    #[serde(deserialize_with = "null_as_default")]
    pub total_reviews: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_confidence: f64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FlashcardStats {
    pub fn from_cards(cards: &[Flashcard]) -> Self {
        if cards.is_empty() {
            return FlashcardStats::default();
        }
        let total_reviews = cards.iter().map(|c| c.times_reviewed as u64).sum();
        let confidence_sum: u64 = cards.iter().map(|c| c.confidence_level as u64).sum();
        FlashcardStats {
            total: cards.len(),
            total_reviews,
            avg_confidence: confidence_sum as f64 / cards.len() as f64,
        }
    }
}

/// Distinct subjects in first-seen order, for subject filters.
pub fn subjects(cards: &[Flashcard]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for subject in cards.iter().filter_map(|c| c.subject.as_deref()) {
        if !subject.is_empty() && !seen.contains(&subject) {
            seen.push(subject);
        }
    }
    seen
}

/// The ordered cards selected for one study session.
///
/// Cloning a deck shares the underlying cards; nothing can add, remove or
/// reorder them once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyDeck {
    cards: Arc<[Flashcard]>,
}

impl StudyDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        StudyDeck { cards: cards.into() }
    }

    pub fn single(card: Flashcard) -> Self {
        StudyDeck::new(vec![card])
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }
}

impl Deref for StudyDeck {
    type Target = [Flashcard];

    fn deref(&self) -> &[Flashcard] {
        &self.cards
    }
}

impl From<Vec<Flashcard>> for StudyDeck {
    fn from(cards: Vec<Flashcard>) -> Self {
        StudyDeck::new(cards)
    }
}
