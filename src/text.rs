//! Offsets, line/column conversion and a small trivia-aware scanner.
//!
//! All offsets are 0-based byte offsets into the original UTF-8 text. Commas,
//! brackets and parentheses are not part of the swc AST, so the scanner is used
//! to locate them between nodes whose spans are known.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based line/column pair as produced by the lint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn contains(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Strict containment: `other` lies inside and the ranges differ.
    pub fn strictly_contains(&self, other: TextRange) -> bool {
        self.contains(other) && *self != other
    }

    pub fn overlaps(&self, other: TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// -----------------------------------------------------------------------------
// Line index
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(idx + ch.len_utf8());
            }
        }
        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        }
    }

    pub fn line_start(&self, offset: usize) -> usize {
        self.line_starts[self.line_of(offset)]
    }

    /// End of the line containing `offset`, excluding the line break.
    pub fn line_end(&self, text: &str, offset: usize) -> usize {
        let line = self.line_of(offset);
        let end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text_len);
        if end > 0 && text.as_bytes().get(end - 1) == Some(&b'\r') {
            end - 1
        } else {
            end
        }
    }

    /// 1-based position of a byte offset. Columns count UTF-16 code units,
    /// as the lint pass reports them.
    pub fn position_at(&self, text: &str, offset: usize) -> Position {
        let line = self.line_of(offset);
        let line_start = self.line_starts[line];
        let column = text
            .get(line_start..offset.min(self.text_len))
            .map(|s| s.encode_utf16().count())
            .unwrap_or(0);
        Position::new(line + 1, column + 1)
    }

    /// Converts a 1-based position back into a byte offset. A column inside
    /// a surrogate pair has no offset.
    pub fn offset_at(&self, text: &str, position: Position) -> Option<usize> {
        if position.line == 0 || position.column == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(position.line - 1)?;
        let line_end = self
            .line_starts
            .get(position.line)
            .copied()
            .unwrap_or(self.text_len);
        let line_text = text.get(line_start..line_end)?;
        let wanted = position.column - 1;
        let mut units = 0;
        for (idx, c) in line_text.char_indices() {
            if units == wanted {
                return Some(line_start + idx);
            }
            if units > wanted {
                return None;
            }
            units += c.len_utf16();
        }
        (units == wanted).then_some(line_end)
    }
}

// -----------------------------------------------------------------------------
// Trivia scanner
// -----------------------------------------------------------------------------

/// Skips whitespace and comments starting at `from`, never passing `limit`.
pub fn skip_trivia(text: &str, from: usize, limit: usize) -> usize {
    let bytes = text.as_bytes();
    let limit = limit.min(bytes.len());
    let mut i = from;
    while i < limit {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => i += 1,
            b'/' if i + 1 < limit && bytes[i + 1] == b'/' => {
                while i < limit && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < limit && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < limit && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(limit);
            }
            _ => {
                // Non-ASCII whitespace (NBSP, line separators, BOM)
                match text[i..].chars().next() {
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => i += c.len_utf8(),
                    _ => break,
                }
            }
        }
    }
    i
}

/// Finds `token` in `[from, to)`, ignoring occurrences inside comments.
/// Any other non-trivia character before the token ends the search.
pub fn find_token(text: &str, from: usize, to: usize, token: u8) -> Option<usize> {
    let pos = skip_trivia(text, from, to);
    if pos < to && text.as_bytes().get(pos) == Some(&token) {
        Some(pos)
    } else {
        None
    }
}

/// Like [`find_token`] but skips over any other characters, still ignoring
/// comments. Used where a keyword or name precedes the token.
pub fn scan_for_token(text: &str, from: usize, to: usize, token: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let to = to.min(bytes.len());
    let mut i = from;
    while i < to {
        let next = skip_trivia(text, i, to);
        if next >= to {
            return None;
        }
        if bytes[next] == token {
            return Some(next);
        }
        i = next + text[next..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    None
}

/// Returns the whitespace run starting at `from` (no comments), bounded by `to`.
pub fn whitespace_run(text: &str, from: usize, to: usize) -> &str {
    let end = text[from..to.min(text.len())]
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(idx, _)| from + idx)
        .unwrap_or(to.min(text.len()));
    &text[from..end]
}

/// Whether `after` written directly behind `before` merges two punctuators
/// into one token, e.g. `-` and `-a` into `--a`.
pub fn tokens_fuse(before: &str, after: &str) -> bool {
    match (before.chars().next_back(), after.chars().next()) {
        (Some(a), Some(b)) => a == b && matches!(a, '+' | '-' | '/'),
        _ => false,
    }
}

/// Leading indentation of the line containing `offset`.
pub fn indentation_at<'a>(text: &'a str, index: &LineIndex, offset: usize) -> &'a str {
    let start = index.line_start(offset);
    let end = index.line_end(text, offset);
    let line = &text[start..end];
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_positions_both_ways() {
        let text = "ab\ncdé\nf";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_at(text, Position::new(1, 1)), Some(0));
        assert_eq!(index.offset_at(text, Position::new(2, 3)), Some(5));
        assert_eq!(index.offset_at(text, Position::new(3, 1)), Some(text.len() - 1));
        assert_eq!(index.offset_at(text, Position::new(4, 1)), None);
        assert_eq!(index.offset_at(text, Position::new(1, 9)), None);
        assert_eq!(index.position_at(text, 5), Position::new(2, 3));
    }

    #[test]
    fn counts_columns_in_utf16_units() {
        let text = "s = \"\u{1F600}\"; jQuery.sap.log;";
        let index = LineIndex::new(text);
        let offset = text.find("jQuery").unwrap();
        assert_eq!(index.position_at(text, offset), Position::new(1, 11));
        assert_eq!(index.offset_at(text, Position::new(1, 11)), Some(offset));
        // Second half of the surrogate pair
        assert_eq!(index.offset_at(text, Position::new(1, 7)), None);
    }

    #[test]
    fn finds_commas_behind_comments() {
        let text = "a /* , */ // x,\n , b";
        assert_eq!(find_token(text, 1, text.len(), b','), Some(17));
        assert_eq!(find_token(text, 1, 10, b','), None);
    }

    #[test]
    fn scans_past_keywords() {
        let text = "function /* ( */ named (a) {}";
        assert_eq!(scan_for_token(text, 0, text.len(), b'('), Some(23));
    }

    #[test]
    fn reports_indentation() {
        let text = "x\n\t\tfoo(\n";
        let index = LineIndex::new(text);
        assert_eq!(indentation_at(text, &index, 5), "\t\t");
        assert_eq!(whitespace_run(",\n\t b", 1, 5), "\n\t ");
    }
}
