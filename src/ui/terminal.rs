// src/ui/terminal.rs
// Draws cards as plain text blocks on any writer.

use std::io::Write;

use super::layout::layout_text;
use super::{CardView, Renderer};

const MARGIN: usize = 2;

pub struct TerminalRenderer<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W, width: usize) -> Self {
        TerminalRenderer { out, width: width.max(MARGIN + 8) }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_block(&mut self, label: &str, text: &str) -> std::io::Result<()> {
        writeln!(self.out, "{}:", label)?;
        let indent = " ".repeat(MARGIN);
        for line in layout_text(text, self.width - MARGIN).lines {
            writeln!(self.out, "{}{}", indent, line)?;
        }
        Ok(())
    }

    fn draw_card(&mut self, view: &CardView<'_>) -> std::io::Result<()> {
        let rule = "-".repeat(self.width);
        writeln!(self.out, "{}", rule)?;
        writeln!(self.out, "[{}]", view.progress)?;
        self.write_block("Q", view.question)?;
        match view.answer {
            Some(answer) => {
                self.write_block("A", answer)?;
                writeln!(self.out, "Rate 1-5, [n]ext, [p]revious, [q]uit")?;
            }
            None => writeln!(self.out, "[f]lip, rate 1-5, [n]ext, [p]revious, [q]uit")?,
        }
        self.out.flush()
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn show_card(&mut self, view: &CardView<'_>) {
        if let Err(e) = self.draw_card(view) {
            log::warn!("Failed to draw card: {}", e);
        }
    }

    fn show_complete(&mut self, total: usize) {
        let result = writeln!(self.out, "Deck complete! Reviewed {} card(s).", total).and_then(|_| self.out.flush());
        if let Err(e) = result {
            log::warn!("Failed to draw completion: {}", e);
        }
    }

    fn clear(&mut self) {
        if let Err(e) = writeln!(self.out, "Study session closed.") {
            log::warn!("Failed to draw session exit: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::Progress;

    fn render(view: CardView<'_>) -> String {
        let mut renderer = TerminalRenderer::new(Vec::new(), 20);
        renderer.show_card(&view);
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn test_question_face_hides_answer() {
        let out = render(CardView {
            question: "Capital of France?",
            answer: None,
            progress: Progress { position: 0, total: 2 },
        });
        assert!(out.contains("[1 / 2]"));
        assert!(out.contains("Capital of France?"));
        assert!(!out.contains("A:"));
    }

    #[test]
    fn test_answer_face_wraps() {
        let out = render(CardView {
            question: "Q",
            answer: Some("a fairly long answer that wraps"),
            progress: Progress { position: 1, total: 2 },
        });
        assert!(out.contains("[2 / 2]"));
        assert!(out.contains("A:\n  a fairly long\n  answer that wraps\n"));
    }

    #[test]
    fn test_complete_message() {
        let mut renderer = TerminalRenderer::new(Vec::new(), 40);
        renderer.show_complete(3);
        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert_eq!(out, "Deck complete! Reviewed 3 card(s).\n");
    }
}
