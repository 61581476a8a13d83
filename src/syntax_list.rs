use std::collections::{BTreeSet, HashSet};

use crate::error::{AutofixError, Result};
use crate::text::{find_token, whitespace_run, TextRange};

/// Items of a comma separated list (array literal elements or function
/// parameters) together with the comma tokens between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparatedList {
    /// Offset right after the opening token; items of an empty list go here.
    pub open: usize,
    /// Offset of the closing token.
    pub close: usize,
    pub items: Vec<TextRange>,
    /// `commas[i]` separates `items[i]` from `items[i + 1]`.
    pub commas: Vec<usize>,
    pub trailing_comma: Option<usize>,
}

impl SeparatedList {
    pub fn scan(text: &str, open: usize, close: usize, items: Vec<TextRange>) -> Result<Self> {
        let mut commas = Vec::with_capacity(items.len().saturating_sub(1));
        for pair in items.windows(2) {
            let comma = find_token(text, pair[0].end, pair[1].start, b',').ok_or_else(|| {
                AutofixError::invariant(format!(
                    "no comma found between list elements at offset {}",
                    pair[0].end
                ))
            })?;
            commas.push(comma);
        }
        let trailing_comma = items
            .last()
            .and_then(|last| find_token(text, last.end, close, b','));
        Ok(Self {
            open,
            close,
            items,
            commas,
            trailing_comma,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn leading_comma(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).and_then(|i| self.commas.get(i).copied())
    }

    pub fn trailing_comma(&self, index: usize) -> Option<usize> {
        if index + 1 < self.items.len() {
            self.commas.get(index).copied()
        } else if index + 1 == self.items.len() {
            self.trailing_comma
        } else {
            None
        }
    }

    /// Comma plus following whitespace as written between existing items.
    /// Prefers the gap between the second and third item, then the first
    /// and second.
    pub fn separator(&self, text: &str) -> Option<String> {
        let pair = match self.items.len() {
            0 | 1 => return None,
            2 => 0,
            _ => 1,
        };
        let comma = self.commas[pair];
        let ws = whitespace_run(text, comma + 1, self.items[pair + 1].start);
        Some(format!(",{ws}"))
    }

    /// Ranges to delete so that the items at `indices` disappear together
    /// with exactly one adjacent comma each. The leading comma is preferred;
    /// a comma already consumed by a neighbouring removal is never reused.
    pub fn removal_ranges(&self, indices: &BTreeSet<usize>) -> Vec<TextRange> {
        let mut claimed = HashSet::new();
        let mut ranges = Vec::with_capacity(indices.len());
        for &index in indices {
            let Some(&item) = self.items.get(index) else {
                continue;
            };
            if let Some(comma) = self.leading_comma(index).filter(|c| !claimed.contains(c)) {
                claimed.insert(comma);
                ranges.push(TextRange::new(self.items[index - 1].end, item.end));
            } else if let Some(comma) =
                self.trailing_comma(index).filter(|c| !claimed.contains(c))
            {
                claimed.insert(comma);
                let end = match self.items.get(index + 1) {
                    Some(next) => next.start,
                    None => comma + 1,
                };
                ranges.push(TextRange::new(item.start, end));
            } else {
                ranges.push(item);
            }
        }
        ranges
    }
}
