// src/deck/source.rs
// Where decks come from: the repository seam and deck selection.

use thiserror::Error;

use super::{Flashcard, FlashcardStats, InvalidFlashcard, NewFlashcard, StudyDeck};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("server answered with status {status}")]
    Status { status: u16 },

    #[error("invalid flashcard: {0}")]
    Invalid(#[from] InvalidFlashcard),
}

/// A source of flashcards: the local database or the remote API.
pub trait FlashcardRepository {
    /// Every card, optionally restricted to one subject, in collection order.
    fn list(&self, subject: Option<&str>) -> Result<Vec<Flashcard>, RepositoryError>;

    fn get(&self, id: &str) -> Result<Option<Flashcard>, RepositoryError> {
        Ok(self.list(None)?.into_iter().find(|c| c.id == id))
    }

    fn create(&self, card: NewFlashcard) -> Result<Flashcard, RepositoryError>;

    /// Returns `false` if no card had that id.
    fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    fn stats(&self) -> Result<FlashcardStats, RepositoryError> {
        Ok(FlashcardStats::from_cards(&self.list(None)?))
    }
}

/// Which cards a study session should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckSelection {
    All { subject: Option<String> },
    Single(String),
}

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Builds the deck for a session. An empty collection gives an empty deck.
pub fn load_deck<R>(repo: &R, selection: &DeckSelection) -> Result<StudyDeck, DeckError>
where
    R: FlashcardRepository + ?Sized,
{
    match selection {
        DeckSelection::All { subject } => {
            let cards = repo.list(subject.as_deref())?;
            log::info!("Loaded {} cards for study.", cards.len());
            Ok(StudyDeck::new(cards))
        }
        DeckSelection::Single(id) => {
            let card = repo.get(id)?.ok_or_else(|| DeckError::CardNotFound(id.clone()))?;
            Ok(StudyDeck::single(card))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::tests::card;
    use std::cell::RefCell;

    struct VecRepository {
        cards: RefCell<Vec<Flashcard>>,
    }

    impl FlashcardRepository for VecRepository {
        fn list(&self, subject: Option<&str>) -> Result<Vec<Flashcard>, RepositoryError> {
            Ok(self
                .cards
                .borrow()
                .iter()
                .filter(|c| subject.map_or(true, |s| c.subject.as_deref() == Some(s)))
                .cloned()
                .collect())
        }

        fn create(&self, new: NewFlashcard) -> Result<Flashcard, RepositoryError> {
            let new = new.validate()?;
            let mut c = card(&format!("n{}", self.cards.borrow().len()));
            c.question = new.question;
            c.answer = new.answer;
            self.cards.borrow_mut().push(c.clone());
            Ok(c)
        }

        fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
            let mut cards = self.cards.borrow_mut();
            let before = cards.len();
            cards.retain(|c| c.id != id);
            Ok(cards.len() != before)
        }
    }

    fn repo() -> VecRepository {
        let mut bio = card("b");
        bio.subject = Some("Bio".into());
        VecRepository { cards: RefCell::new(vec![card("a"), bio, card("c")]) }
    }

    #[test]
    fn test_load_all_in_order() {
        let deck = load_deck(&repo(), &DeckSelection::All { subject: None }).unwrap();
        let ids: Vec<&str> = deck.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_by_subject() {
        let selection = DeckSelection::All { subject: Some("Bio".into()) };
        let deck = load_deck(&repo(), &selection).unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(deck[0].id, "b");
    }

    #[test]
    fn test_load_single_card() {
        let deck = load_deck(&repo(), &DeckSelection::Single("c".into())).unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(deck[0].id, "c");

        let missing = load_deck(&repo(), &DeckSelection::Single("zz".into()));
        assert!(matches!(missing, Err(DeckError::CardNotFound(id)) if id == "zz"));
    }

    #[test]
    fn test_empty_collection_gives_empty_deck() {
        let empty = VecRepository { cards: RefCell::new(Vec::new()) };
        let deck = load_deck(&empty, &DeckSelection::All { subject: None }).unwrap();
        assert!(deck.is_empty());
    }

    #[test]
    fn test_default_stats_and_delete() {
        let repo = repo();
        assert_eq!(repo.stats().unwrap().total, 3);
        assert!(repo.delete("a").unwrap());
        assert!(!repo.delete("a").unwrap());
        assert_eq!(repo.stats().unwrap().total, 2);
        assert!(repo.create(NewFlashcard {
            question: "".into(),
            answer: "x".into(),
            subject: None,
            difficulty: Default::default(),
        })
        .is_err());
    }
}
