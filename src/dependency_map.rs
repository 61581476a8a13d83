//! Lookup from resolved module name to the literal that imports it inside one
//! dependency array, plus the quote style new literals should use.

use std::collections::BTreeMap;

use crate::module_declaration::DependencyArray;
use crate::text::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuoteStyle {
    #[default]
    Double,
    Single,
    Backtick,
}

impl QuoteStyle {
    pub fn from_literal_text(raw: &str) -> Option<Self> {
        match raw.as_bytes().first() {
            Some(b'"') => Some(Self::Double),
            Some(b'\'') => Some(Self::Single),
            Some(b'`') => Some(Self::Backtick),
            _ => None,
        }
    }

    pub fn quote_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
            Self::Backtick => '`',
        }
    }

    /// Renders `value` as a literal in this style.
    pub fn quote(self, value: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(q);
        for c in value.chars() {
            if c == q || c == '\\' || (self == Self::Backtick && c == '$') {
                out.push('\\');
            }
            out.push(c);
        }
        out.push(q);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry {
    /// Module name as written in the literal.
    pub raw_name: String,
    pub literal: TextRange,
    pub index: usize,
    pub leading_comma: Option<usize>,
    pub trailing_comma: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    entries: BTreeMap<String, DependencyEntry>,
    quote_style: QuoteStyle,
}

impl DependencyMap {
    /// Indexes `array`. Relative names are resolved against `module_name`
    /// (the importing resource's own module name) when it is known. Only the
    /// first occurrence of a module is recorded.
    pub fn build(array: Option<&DependencyArray>, module_name: Option<&str>) -> Self {
        let Some(array) = array else {
            return Self::default();
        };
        let mut entries = BTreeMap::new();
        // double, single, backtick
        let mut counts = [0usize; 3];
        for (index, element) in array.elements.iter().enumerate() {
            let Some(literal) = &element.literal else {
                continue;
            };
            match literal.quote {
                QuoteStyle::Double => counts[0] += 1,
                QuoteStyle::Single => counts[1] += 1,
                QuoteStyle::Backtick => counts[2] += 1,
            }
            let resolved = resolve_module_name(&literal.value, module_name);
            entries.entry(resolved).or_insert_with(|| DependencyEntry {
                raw_name: literal.value.clone(),
                literal: literal.range,
                index,
                leading_comma: array.list.leading_comma(index),
                trailing_comma: array.list.trailing_comma(index),
            });
        }
        let quote_style = if counts[0] >= counts[1] && counts[0] >= counts[2] {
            QuoteStyle::Double
        } else if counts[1] >= counts[2] {
            QuoteStyle::Single
        } else {
            QuoteStyle::Backtick
        };
        Self {
            entries,
            quote_style,
        }
    }

    pub fn get(&self, module_name: &str) -> Option<&DependencyEntry> {
        self.entries.get(module_name)
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.entries.contains_key(module_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DependencyEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quote_style(&self) -> QuoteStyle {
        self.quote_style
    }
}

/// Module name of a resource: the path without `prefix` and without a `.js`
/// extension. `None` when the path lies outside the prefix.
pub fn resource_module_name(resource_path: &str, prefix: &str) -> Option<String> {
    let rest = resource_path.strip_prefix(prefix)?;
    let rest = rest.strip_suffix(".js").unwrap_or(rest);
    Some(rest.to_string())
}

/// Resolves `./` and `../` module names against the directory of `base`
/// using POSIX path rules. Other names are returned unchanged.
pub fn resolve_module_name(name: &str, base: Option<&str>) -> String {
    let Some(base) = base.filter(|_| name.starts_with('.')) else {
        return name.to_string();
    };
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    // drop the resource's own name
    segments.pop();
    for seg in name.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
