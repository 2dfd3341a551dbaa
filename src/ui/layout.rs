// src/ui/layout.rs
// Wraps card text into lines for fixed-width output.

/// Pre-calculated lines for one block of card text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    pub lines: Vec<String>,
}

impl TextLayout {
    pub fn total_height(&self) -> usize {
        self.lines.len()
    }
}

/// Lays `text` out into lines no wider than `max_width` characters.
///
/// Explicit newlines always break. Otherwise lines break at the last space
/// that fits; a single word longer than the line is split mid-word.
pub fn layout_text(text: &str, max_width: usize) -> TextLayout {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            // The word does not fit after the current content: finish the line.
            let needed = if current_width == 0 { word.len() } else { current_width + 1 + word.len() };
            if needed > max_width && current_width > 0 {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }

            // Words wider than a whole line get split.
            while word.len() > max_width {
                let rest = word.split_off(max_width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current_width += word.len();
            current.extend(word);
        }
        lines.push(current);
    }

    TextLayout { lines }
}
