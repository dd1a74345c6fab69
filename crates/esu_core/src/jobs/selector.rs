//! Set specifier parsing.
//!
//! Grammar: `<digits>` | `<digits>-<digits>` | `<digits>-` | `*`.
//! Multiple specifiers combine by union. Parsing never touches the
//! filesystem.

use std::collections::BTreeSet;

use serde::Serialize;

/// Upper bound for open ranges (`"225-"`) and for any set number.
pub const MAX_SET_NUMBER: u32 = 999;

/// Which sets of a model directory to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SetSelector {
    /// Every subdirectory that contains images.
    All,
    /// Zero-padded identifiers, unique and ascending.
    ///
    /// An empty list means no selection was made (flat mode).
    Sets(Vec<String>),
}

impl SetSelector {
    /// Selector for flat mode (no sets given).
    pub fn none() -> Self {
        SetSelector::Sets(Vec::new())
    }

    /// Resolve specifiers into a selector, dropping anything unparseable.
    pub fn resolve<I, S>(specifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        resolve_sets(specifiers).selector
    }

    /// True when no set is selected and the sentinel is absent.
    pub fn is_empty(&self) -> bool {
        matches!(self, SetSelector::Sets(ids) if ids.is_empty())
    }

    /// Explicit identifiers (empty for the sentinel).
    pub fn ids(&self) -> &[String] {
        match self {
            SetSelector::All => &[],
            SetSelector::Sets(ids) => ids,
        }
    }
}

impl std::fmt::Display for SetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetSelector::All => write!(f, "*"),
            SetSelector::Sets(ids) if ids.is_empty() => write!(f, "(none)"),
            SetSelector::Sets(ids) => write!(f, "{}", compact_ranges(ids)),
        }
    }
}

/// Result of resolving specifiers, including the ones that were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSelection {
    pub selector: SetSelector,
    /// Specifiers that did not parse or selected nothing.
    pub ignored: Vec<String>,
}

/// Resolve set specifiers, reporting which ones were ignored.
///
/// `"*"` anywhere wins over everything else. Unparseable entries, reversed
/// ranges and numbers above [`MAX_SET_NUMBER`] are ignored and logged.
pub fn resolve_sets<I, S>(specifiers: I) -> SetSelection
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let specifiers: Vec<String> = specifiers
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .collect();

    if specifiers.iter().any(|s| s == "*") {
        return SetSelection {
            selector: SetSelector::All,
            ignored: Vec::new(),
        };
    }

    let mut numbers = BTreeSet::new();
    let mut ignored = Vec::new();

    for spec in &specifiers {
        match parse_specifier(spec) {
            Some((start, end)) if start <= end => numbers.extend(start..=end),
            _ => {
                tracing::warn!("Ignoring set specifier '{}'", spec);
                ignored.push(spec.clone());
            }
        }
    }

    SetSelection {
        selector: SetSelector::Sets(numbers.into_iter().map(format_set_id).collect()),
        ignored,
    }
}

/// Format a set number as a 3-digit identifier.
pub fn format_set_id(number: u32) -> String {
    format!("{:03}", number)
}

/// Parse one specifier into an inclusive range, clamped to [`MAX_SET_NUMBER`].
fn parse_specifier(spec: &str) -> Option<(u32, u32)> {
    if is_digits(spec) {
        let n = parse_number(spec)?;
        return Some((n, n));
    }

    let (start, end) = spec.split_once('-')?;
    if !is_digits(start) {
        return None;
    }
    let start = parse_number(start)?;
    let end = if end.is_empty() {
        MAX_SET_NUMBER
    } else if is_digits(end) {
        // Anything past the last possible set is the same as an open range.
        end.parse::<u64>().ok()?.min(u64::from(MAX_SET_NUMBER)) as u32
    } else {
        return None;
    };
    Some((start, end))
}

fn parse_number(s: &str) -> Option<u32> {
    s.parse::<u32>().ok().filter(|n| *n <= MAX_SET_NUMBER)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Render ids as `001-003, 007` for display.
fn compact_ranges(ids: &[String]) -> String {
    let numbers: Vec<u32> = ids.iter().filter_map(|id| id.parse().ok()).collect();
    let mut parts = Vec::new();
    let mut i = 0;
    while i < numbers.len() {
        let start = numbers[i];
        let mut end = start;
        while i + 1 < numbers.len() && numbers[i + 1] == end + 1 {
            i += 1;
            end = numbers[i];
        }
        if start == end {
            parts.push(format_set_id(start));
        } else {
            parts.push(format!("{}-{}", format_set_id(start), format_set_id(end)));
        }
        i += 1;
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(selector: &SetSelector) -> Vec<&str> {
        selector.ids().iter().map(String::as_str).collect()
    }

    #[test]
    fn wildcard_wins() {
        let selector = SetSelector::resolve(["003", "*", "010-012"]);
        assert_eq!(selector, SetSelector::All);
    }

    #[test]
    fn single_number_is_padded() {
        assert_eq!(ids(&SetSelector::resolve(["042"])), vec!["042"]);
        assert_eq!(ids(&SetSelector::resolve(["7"])), vec!["007"]);
    }

    #[test]
    fn closed_range_is_inclusive() {
        assert_eq!(
            ids(&SetSelector::resolve(["001-003"])),
            vec!["001", "002", "003"]
        );
    }

    #[test]
    fn open_range_runs_to_999() {
        let selector = SetSelector::resolve(["225-"]);
        let ids = selector.ids();
        assert_eq!(ids.len(), 999 - 225 + 1);
        assert_eq!(ids.first().map(String::as_str), Some("225"));
        assert_eq!(ids.last().map(String::as_str), Some("999"));
    }

    #[test]
    fn union_is_sorted_and_deduplicated() {
        let selector = SetSelector::resolve(["010", "002-004", "003", "001"]);
        assert_eq!(ids(&selector), vec!["001", "002", "003", "004", "010"]);
    }

    #[test]
    fn unparseable_specifiers_are_reported() {
        let selection = resolve_sets(["Blue Dress", "005", "9-3", "abc-", "1000"]);
        assert_eq!(ids(&selection.selector), vec!["005"]);
        assert_eq!(selection.ignored, vec!["Blue Dress", "9-3", "abc-", "1000"]);
    }

    #[test]
    fn range_end_is_clamped() {
        let selector = SetSelector::resolve(["998-5000"]);
        assert_eq!(ids(&selector), vec!["998", "999"]);
    }

    #[test]
    fn empty_input_is_flat_mode() {
        let selector = SetSelector::resolve(Vec::<String>::new());
        assert!(selector.is_empty());
        assert_eq!(selector, SetSelector::none());
    }

    #[test]
    fn display_compacts_ranges() {
        let selector = SetSelector::resolve(["001-003", "007"]);
        assert_eq!(selector.to_string(), "001-003, 007");
        assert_eq!(SetSelector::All.to_string(), "*");
    }
}
