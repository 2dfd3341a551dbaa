// StudyFlow - lib.rs
// Flash-card study sessions over a local SQLite deck or the REST API.

pub mod config;
pub mod debug;
pub mod deck;
pub mod review;
pub mod scenes;
pub mod server;
pub mod state;
pub mod storage;
pub mod ui;

pub use config::Config;
pub use deck::{load_deck, DeckSelection, Difficulty, Flashcard, FlashcardRepository, FlashcardStats, NewFlashcard, StudyDeck};
pub use review::{Confidence, ReviewError, ReviewSink};
pub use scenes::studying::{AdvanceResult, Direction, ReviewResult, SessionError, StudySessionController};
pub use ui::{CardView, Progress, Renderer, TerminalRenderer};
