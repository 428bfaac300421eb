//! Logical ordering strategies
//!
//! "Logical" order is user-defined. The sorter depends only on the
//! [`LogicalOrder`] trait; the strategies here cover the two common
//! conventions: an explicit index of notes, and a numeric index embedded in
//! the note name.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;

use crate::domain::sorter::compare_alphabetical;
use crate::domain::{DomainError, FileRef};

/// Comparator used for `SortMode::Logical`.
pub trait LogicalOrder: Send + Sync {
    fn compare(&self, a: &FileRef, b: &FileRef) -> Ordering;
}

impl<F> LogicalOrder for F
where
    F: Fn(&FileRef, &FileRef) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &FileRef, b: &FileRef) -> Ordering {
        self(a, b)
    }
}

/// Notes listed in an index come first, in index order.
/// Unlisted notes follow alphabetically.
#[derive(Debug, Clone, Default)]
pub struct ExplicitOrder {
    rank: HashMap<String, usize>,
}

impl ExplicitOrder {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rank = HashMap::new();
        for (i, key) in keys.into_iter().enumerate() {
            rank.entry(normalize_key(key.as_ref())).or_insert(i);
        }
        Self { rank }
    }

    /// Build from an index text: one note per line, or `[[wiki links]]`.
    ///
    /// Blank lines and lines starting with `#` are ignored; list markers
    /// (`-`, `*`, `1.`) are stripped. A line containing wiki links contributes
    /// each link target in order.
    pub fn from_index(text: &str) -> Result<Self, DomainError> {
        let link_re = Regex::new(r"\[\[([^\]|#]+)(?:[#|][^\]]*)?\]\]")
            .map_err(|e| DomainError::InvalidPattern(e.to_string()))?;
        let marker_re = Regex::new(r"^(?:[-*+]|\d+[.)])\s+")
            .map_err(|e| DomainError::InvalidPattern(e.to_string()))?;

        let mut keys = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let links: Vec<&str> = link_re
                .captures_iter(line)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().trim())
                .collect();
            if links.is_empty() {
                keys.push(marker_re.replace(line, "").trim().to_string());
            } else {
                keys.extend(links.into_iter().map(str::to_string));
            }
        }
        Ok(Self::new(keys))
    }

    pub fn len(&self) -> usize {
        self.rank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rank.is_empty()
    }

    fn rank_of(&self, file: &FileRef) -> Option<usize> {
        let path = normalize_key(&file.path);
        let stem = path.strip_suffix(".md").unwrap_or(&path);
        self.rank
            .get(&path)
            .or_else(|| self.rank.get(stem))
            .or_else(|| self.rank.get(&normalize_key(&file.name)))
            .copied()
    }
}

impl LogicalOrder for ExplicitOrder {
    fn compare(&self, a: &FileRef, b: &FileRef) -> Ordering {
        ranked(self.rank_of(a), self.rank_of(b)).then_with(|| compare_alphabetical(a, b))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().replace('\\', "/").to_lowercase()
}

/// Numeric index at the start of the note name: `01 Intro`, `2. Setup`.
///
/// A custom pattern may be supplied; its first capture group must match the
/// digits. Unindexed notes follow alphabetically.
#[derive(Debug, Clone, Default)]
pub struct PrefixIndexOrder {
    pattern: Option<Regex>,
}

impl PrefixIndexOrder {
    pub fn new() -> Self {
        Self { pattern: None }
    }

    pub fn with_pattern(pattern: &str) -> Result<Self, DomainError> {
        let re = Regex::new(pattern).map_err(|e| DomainError::InvalidPattern(e.to_string()))?;
        if re.captures_len() < 2 {
            return Err(DomainError::InvalidPattern(format!(
                "{pattern}: needs a capture group for the index"
            )));
        }
        Ok(Self { pattern: Some(re) })
    }

    pub fn index_of(&self, name: &str) -> Option<u64> {
        match &self.pattern {
            Some(re) => re
                .captures(name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok()),
            None => {
                let digits: String = name
                    .trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
        }
    }
}

impl LogicalOrder for PrefixIndexOrder {
    fn compare(&self, a: &FileRef, b: &FileRef) -> Ordering {
        ranked(self.index_of(&a.name), self.index_of(&b.name))
            .then_with(|| compare_alphabetical(a, b))
    }
}

/// Reverses another strategy.
#[derive(Debug, Clone)]
pub struct InvertedOrder<O> {
    inner: O,
}

impl<O: LogicalOrder> InvertedOrder<O> {
    pub fn new(inner: O) -> Self {
        Self { inner }
    }
}

impl<O: LogicalOrder> LogicalOrder for InvertedOrder<O> {
    fn compare(&self, a: &FileRef, b: &FileRef) -> Ordering {
        self.inner.compare(a, b).reverse()
    }
}

// ranked before unranked
fn ranked<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn file(path: &str, name: &str) -> FileRef {
        FileRef::new(path, name, Utc.timestamp_opt(0, 0).unwrap())
    }

    #[test]
    fn given_index_with_wiki_links_when_parsing_then_keeps_link_order() {
        let index = "# Book\n\n- [[Chapter Two]]\n- [[Chapter One|first]]\n3. notes/appendix.md\n";

        let order = ExplicitOrder::from_index(index).unwrap();

        let one = file("Chapter One.md", "Chapter One");
        let two = file("Chapter Two.md", "Chapter Two");
        let appendix = file("notes/appendix.md", "appendix");
        let stray = file("aaa.md", "aaa");
        assert_eq!(order.len(), 3);
        assert_eq!(order.compare(&two, &one), Ordering::Less);
        assert_eq!(order.compare(&one, &appendix), Ordering::Less);
        assert_eq!(order.compare(&appendix, &stray), Ordering::Less);
    }

    #[test]
    fn given_default_prefix_order_when_reading_index_then_parses_leading_digits() {
        let order = PrefixIndexOrder::new();
        assert_eq!(order.index_of("01 Intro"), Some(1));
        assert_eq!(order.index_of("2. Setup"), Some(2));
        assert_eq!(order.index_of("10-Usage"), Some(10));
        assert_eq!(order.index_of("Intro"), None);
    }

    #[test]
    fn given_custom_pattern_when_reading_index_then_uses_capture_group() {
        let order = PrefixIndexOrder::with_pattern(r"\(#(\d+)\)$").unwrap();
        assert_eq!(order.index_of("Setup (#3)"), Some(3));
        assert_eq!(order.index_of("Setup"), None);
    }

    #[test]
    fn given_pattern_without_group_when_creating_then_fails() {
        assert!(matches!(
            PrefixIndexOrder::with_pattern(r"\d+"),
            Err(DomainError::InvalidPattern(_))
        ));
    }

    #[test]
    fn given_closure_when_used_as_order_then_delegates() {
        let by_path_desc = |a: &FileRef, b: &FileRef| b.path.cmp(&a.path);
        let a = file("a.md", "a");
        let b = file("b.md", "b");
        assert_eq!(LogicalOrder::compare(&by_path_desc, &a, &b), Ordering::Greater);
    }
}
