//! Single-line command input with history and tab completion.

use std::collections::VecDeque;

/// Maximum number of history entries to keep.
const MAX_HISTORY: usize = 100;

/// Result of a completion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matched.
    None,
    /// The word was completed (fully or to the common prefix).
    Applied,
    /// Several candidates remain; the word was extended as far as possible.
    Ambiguous(Vec<String>),
}

/// Input state with text editing and history navigation.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Current input content.
    content: String,
    /// Cursor position (byte offset).
    cursor: usize,
    /// Input history (most recent last).
    history: VecDeque<String>,
    /// Current position in history (None = not browsing).
    history_index: Option<usize>,
    /// Draft saved when starting to browse history.
    draft: Option<String>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Cursor position (byte offset).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Cursor position in characters, for placing the terminal cursor.
    pub fn cursor_column(&self) -> usize {
        self.content[..self.cursor].chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Text before the cursor; completion works on this.
    pub fn before_cursor(&self) -> &str {
        &self.content[..self.cursor]
    }

    pub fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.exit_history_mode();
    }

    pub fn insert_str(&mut self, s: &str) {
        self.content.insert_str(self.cursor, s);
        self.cursor += s.len();
        self.exit_history_mode();
    }

    /// Backspace.
    pub fn delete_char_before(&mut self) {
        if let Some((start, _)) = self.content[..self.cursor].char_indices().last() {
            self.content.remove(start);
            self.cursor = start;
            self.exit_history_mode();
        }
    }

    /// Delete key.
    pub fn delete_char_at(&mut self) {
        if self.cursor < self.content.len() {
            self.content.remove(self.cursor);
            self.exit_history_mode();
        }
    }

    /// Ctrl+W: delete the word before the cursor.
    pub fn delete_word_before(&mut self) {
        let before = self.content[..self.cursor].trim_end();
        let start = before.rfind(char::is_whitespace).map(|i| i + 1).unwrap_or(0);
        self.content.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.exit_history_mode();
    }

    pub fn move_left(&mut self) {
        if let Some((start, _)) = self.content[..self.cursor].char_indices().last() {
            self.cursor = start;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.content[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end(&mut self) {
        self.cursor = self.content.len();
    }

    /// Navigate to previous history entry.
    /// Returns true if history was navigated.
    pub fn history_prev(&mut self) -> bool {
        let index = match self.history_index {
            _ if self.history.is_empty() => return false,
            None => {
                self.draft = Some(self.content.clone());
                self.history.len() - 1
            }
            Some(0) => return false,
            Some(idx) => idx - 1,
        };

        self.history_index = Some(index);
        if let Some(entry) = self.history.get(index) {
            self.content = entry.clone();
            self.cursor = self.content.len();
        }
        true
    }

    /// Navigate to next history entry or restore the draft.
    /// Returns true if history was navigated.
    pub fn history_next(&mut self) -> bool {
        match self.history_index {
            None => false,
            Some(idx) if idx + 1 >= self.history.len() => {
                if let Some(draft) = self.draft.take() {
                    self.content = draft;
                    self.cursor = self.content.len();
                }
                self.history_index = None;
                true
            }
            Some(idx) => {
                self.history_index = Some(idx + 1);
                if let Some(entry) = self.history.get(idx + 1) {
                    self.content = entry.clone();
                    self.cursor = self.content.len();
                }
                true
            }
        }
    }

    fn exit_history_mode(&mut self) {
        self.history_index = None;
        self.draft = None;
    }

    /// Submit the current input and add it to history.
    pub fn submit(&mut self) -> String {
        let content = std::mem::take(&mut self.content);
        self.cursor = 0;
        self.exit_history_mode();

        if !content.trim().is_empty() && self.history.back() != Some(&content) {
            if self.history.len() >= MAX_HISTORY {
                self.history.pop_front();
            }
            self.history.push_back(content.clone());
        }

        content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.exit_history_mode();
    }

    /// Complete the word before the cursor from `candidates`.
    ///
    /// A single candidate replaces the word and adds a trailing space.
    /// Several candidates extend the word to their common prefix.
    pub fn complete(&mut self, candidates: &[String]) -> Completion {
        let word_start = self.content[..self.cursor]
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &self.content[word_start..self.cursor];

        let replacement = match candidates {
            [] => return Completion::None,
            [only] => format!("{only} "),
            many => common_prefix(many),
        };
        if replacement.len() < word.len() || !replacement.starts_with(word) {
            return Completion::None;
        }

        self.content.replace_range(word_start..self.cursor, &replacement);
        self.cursor = word_start + replacement.len();
        self.exit_history_mode();

        if candidates.len() == 1 {
            Completion::Applied
        } else {
            Completion::Ambiguous(candidates.to_vec())
        }
    }
}

fn common_prefix(words: &[String]) -> String {
    let Some(first) = words.first() else {
        return String::new();
    };
    let mut end = first.len();
    for word in &words[1..] {
        end = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, a), _)| i + a.len_utf8())
            .unwrap_or(0)
            .min(end);
    }
    first[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputState {
        let mut input = InputState::new();
        input.insert_str(text);
        input
    }

    #[test]
    fn test_editing() {
        let mut input = typed("wxtch");
        input.move_left();
        input.move_left();
        input.move_left();
        input.delete_char_before();
        input.insert_char('a');
        assert_eq!(input.content(), "watch");
        assert_eq!(input.cursor(), 2);

        input.move_to_end();
        input.delete_char_at();
        assert_eq!(input.content(), "watch");
        input.move_to_start();
        input.delete_char_at();
        assert_eq!(input.content(), "atch");
    }

    #[test]
    fn test_delete_word() {
        let mut input = typed("watch site-status  ");
        input.delete_word_before();
        assert_eq!(input.content(), "watch ");
    }

    #[test]
    fn test_history_with_draft() {
        let mut input = typed("watch counter");
        input.submit();
        input.insert_str("watch kill");
        input.submit();
        input.insert_str("dra");

        assert!(input.history_prev());
        assert_eq!(input.content(), "watch kill");
        assert!(input.history_prev());
        assert_eq!(input.content(), "watch counter");
        assert!(!input.history_prev());

        assert!(input.history_next());
        assert!(input.history_next());
        assert_eq!(input.content(), "dra");
        assert!(!input.history_next());
    }

    #[test]
    fn test_duplicate_and_blank_not_recorded() {
        let mut input = typed("?");
        input.submit();
        input.insert_str("?");
        input.submit();
        input.insert_str("   ");
        input.submit();
        assert!(input.history_prev());
        assert!(!input.history_prev());
    }

    #[test]
    fn test_complete_single() {
        let mut input = typed("watch si");
        assert_eq!(input.complete(&["site-status".to_string()]), Completion::Applied);
        assert_eq!(input.content(), "watch site-status ");
    }

    #[test]
    fn test_complete_common_prefix() {
        let mut input = typed("w");
        let candidates = vec!["watch".to_string(), "watchdog".to_string()];
        assert_eq!(
            input.complete(&candidates),
            Completion::Ambiguous(candidates.clone())
        );
        assert_eq!(input.content(), "watch");
    }

    #[test]
    fn test_complete_nothing() {
        let mut input = typed("x");
        assert_eq!(input.complete(&[]), Completion::None);
        assert_eq!(input.content(), "x");
    }
}
