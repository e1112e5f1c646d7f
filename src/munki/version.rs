//! Loose version ordering for catalog items.
//!
//! Versions are split into numeric and alphabetic components, dots dropped.
//! Numeric components compare numerically, so `2.10.0` is newer than `2.3.0`.
//! A shorter version is padded with zeros, making `1.0` equal to `1.0.0`.
//! Numbers sort before text, matching Munki's `MunkiLooseVersion`.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+|[a-z]+|\.").unwrap_or_else(|e| panic!("invalid version regex: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    /// Digits with leading zeros stripped
    Num(String),
    Text(String),
}

impl Component {
    fn zero() -> Self {
        Component::Num(String::new())
    }
}

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Component::Num(a), Component::Num(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (Component::Num(_), Component::Text(_)) => Ordering::Less,
            (Component::Text(_), Component::Num(_)) => Ordering::Greater,
            (Component::Text(a), Component::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn components(version: &str) -> Vec<Component> {
    let mut out = Vec::new();
    let mut last = 0;
    let push_text = |text: &str, out: &mut Vec<Component>| {
        if !text.is_empty() {
            out.push(Component::Text(text.to_string()));
        }
    };

    for m in COMPONENT_RE.find_iter(version) {
        push_text(&version[last..m.start()], &mut out);
        let token = m.as_str();
        if token.starts_with(|c: char| c.is_ascii_digit()) {
            out.push(Component::Num(token.trim_start_matches('0').to_string()));
        } else if token != "." {
            out.push(Component::Text(token.to_string()));
        }
        last = m.end();
    }
    push_text(&version[last..], &mut out);
    out
}

/// Compare two version strings.
///
/// Returns `Ordering::Greater` when `a` is newer than `b`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = components(a);
    let mut right = components(b);
    let len = left.len().max(right.len());
    left.resize(len, Component::zero());
    right.resize(len, Component::zero());
    left.cmp(&right)
}

/// Sort version strings newest first.
pub fn sort_newest_first<S: AsRef<str>>(versions: &mut [S]) {
    versions.sort_by(|a, b| compare_versions(b.as_ref(), a.as_ref()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_numerically() {
        assert_eq!(compare_versions("2.3.0", "2.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.10.0", "2.3.0"), Ordering::Greater);
    }

    #[test]
    fn missing_segments_pad_with_zero() {
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_are_ignored() {
        assert_eq!(compare_versions("1.02", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.010", "1.9"), Ordering::Greater);
    }

    #[test]
    fn text_sorts_after_numbers() {
        assert_eq!(compare_versions("1.0b2", "1.0.2"), Ordering::Greater);
        assert_eq!(compare_versions("1.0a1", "1.0b1"), Ordering::Less);
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        assert_eq!(
            compare_versions("1.99999999999999999999999", "1.100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn sorts_newest_first() {
        let mut versions = vec!["2.3.0", "2.10.0", "1.9", "2.3"];
        sort_newest_first(&mut versions);
        assert_eq!(versions[0], "2.10.0");
        assert_eq!(versions[3], "1.9");
    }
}
