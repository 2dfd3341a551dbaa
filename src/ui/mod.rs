// src/ui/mod.rs
// This module contains the display side of a study session.

pub mod layout;
pub mod terminal;

use std::fmt;

pub use self::layout::{layout_text, TextLayout};
pub use self::terminal::TerminalRenderer;

/// How far through the deck the session is, 1-based for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.position + 1, self.total)
    }
}

/// Everything a renderer needs to draw the current card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardView<'a> {
    pub question: &'a str,
    /// `None` until the card has been revealed.
    pub answer: Option<&'a str>,
    pub progress: Progress,
}

/// Receives display updates from a study session. Nothing it does feeds back
/// into the session.
pub trait Renderer {
    fn show_card(&mut self, view: &CardView<'_>);

    fn show_complete(&mut self, total: usize);

    fn clear(&mut self) {}
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn show_card(&mut self, view: &CardView<'_>) {
        (**self).show_card(view)
    }

    fn show_complete(&mut self, total: usize) {
        (**self).show_complete(total)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}
