//! Text edits addressed by offsets into the original source, applied in a
//! single pass.

use crate::error::{AutofixError, Result};
use crate::text::TextRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert { at: usize, text: String },
    Replace { range: TextRange, text: String },
    Delete { range: TextRange },
}

impl Change {
    pub fn range(&self) -> TextRange {
        match self {
            Self::Insert { at, .. } => TextRange::new(*at, *at),
            Self::Replace { range, .. } | Self::Delete { range } => *range,
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::Insert { text, .. } | Self::Replace { text, .. } => text,
            Self::Delete { .. } => "",
        }
    }
}

/// Accumulated edits for one resource. Inserts at the same offset keep the
/// order in which they were added and come before a replacement or deletion
/// starting there.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.changes.push(Change::Insert { at, text });
        }
    }

    pub fn replace(&mut self, range: TextRange, text: impl Into<String>) {
        self.changes.push(Change::Replace {
            range,
            text: text.into(),
        });
    }

    pub fn delete(&mut self, range: TextRange) {
        if !range.is_empty() {
            self.changes.push(Change::Delete { range });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Applies all edits to `original`. Edits whose ranges overlap are an
    /// invariant violation; identical deletions collapse into one.
    pub fn apply(&self, original: &str) -> Result<String> {
        let mut ordered: Vec<(usize, &Change)> = self.changes.iter().enumerate().collect();
        ordered.sort_by_key(|(seq, change)| {
            let is_insert = matches!(change, Change::Insert { .. });
            (change.range().start, !is_insert, *seq)
        });
        ordered.dedup_by(|(_, a), (_, b)| matches!(a, Change::Delete { .. }) && a == b);

        let mut out = String::with_capacity(original.len());
        let mut cursor = 0;
        for (_, change) in ordered {
            let range = change.range();
            if range.start < cursor || range.end > original.len() {
                return Err(AutofixError::invariant(format!(
                    "change at {range} overlaps a previous change ending at {cursor}"
                )));
            }
            out.push_str(&original[cursor..range.start]);
            out.push_str(change.text());
            cursor = range.end;
        }
        out.push_str(&original[cursor..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_against_original_offsets() {
        let text = "abcdef";
        let mut changes = ChangeSet::new();
        changes.delete(TextRange::new(1, 3));
        changes.insert(0, ">");
        changes.replace(TextRange::new(4, 5), "E");
        changes.insert(6, "!");
        assert_eq!(changes.apply(text).unwrap(), ">adEf!");
    }

    #[test]
    fn keeps_insert_order_at_same_offset() {
        let mut changes = ChangeSet::new();
        changes.delete(TextRange::new(1, 2));
        changes.insert(1, "x");
        changes.insert(1, "y");
        changes.insert(2, "z");
        assert_eq!(changes.apply("abc").unwrap(), "axyzc");
    }

    #[test]
    fn rejects_overlaps() {
        let mut changes = ChangeSet::new();
        changes.delete(TextRange::new(0, 3));
        changes.insert(1, "x");
        assert!(matches!(changes.apply("abcd"), Err(AutofixError::Invariant { .. })));

        let mut changes = ChangeSet::new();
        changes.delete(TextRange::new(0, 2));
        changes.delete(TextRange::new(0, 2));
        assert_eq!(changes.apply("abcd").unwrap(), "cd");
    }

    #[test]
    fn empty_set_is_identity() {
        assert_eq!(ChangeSet::new().apply("x = 1;").unwrap(), "x = 1;");
    }
}
