//! # Core Types for the Poll
//!
//! The poll votes over a closed, ordered set of options fixed at
//! configuration time. Declaration order matters: it is the tie-break
//! order whenever two options hold the same count.
//!
//! ## Type Categories
//!
//! - [`PollOption`]: one voteable choice (key + display label)
//! - [`PollOptions`]: the validated, ordered option set
//! - [`Tally`]: per-option vote counts, one entry per configured option
//!
//! ## Usage Examples
//!
//! ```rust
//! use poll::types::{PollOptions, Tally};
//!
//! let options: PollOptions = "pizza=Піца,burger=Бургер,salad=Салат".parse().unwrap();
//! let tally = Tally::empty(&options);
//!
//! assert_eq!(tally.total(), 0);
//! assert_eq!(tally.count("burger"), Some(0));
//! assert_eq!(tally.count("sushi"), None);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// A single voteable choice
///
/// Identity is the `key`; the `label` is presentation text only and is
/// ignored when matching votes against options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollOption {
    /// Stable identifier, used as the persisted map key
    pub key: String,

    /// Human-readable name shown next to results
    pub label: String,
}

impl PollOption {
    /// Create an option with a distinct display label
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Create an option whose label is its key
    pub fn bare(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
        }
    }
}

/// The closed, ordered set of options a poll accepts
///
/// Guaranteed non-empty with unique, non-blank keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOptions {
    options: Vec<PollOption>,
}

impl PollOptions {
    /// Validate and build an option set
    pub fn new(options: Vec<PollOption>) -> Result<Self> {
        if options.is_empty() {
            return Err(Error::validation("options: at least one option is required"));
        }

        for (index, option) in options.iter().enumerate() {
            if option.key.trim().is_empty() {
                return Err(Error::validation(format!("options[{index}]: empty key")));
            }
            if options[..index].iter().any(|prev| prev.key == option.key) {
                return Err(Error::validation(format!(
                    "options[{index}]: duplicate key '{}'",
                    option.key
                )));
            }
        }

        Ok(Self { options })
    }

    /// Pizza, burger and salad: the default lunch poll
    pub fn lunch() -> Self {
        Self {
            options: vec![
                PollOption::new("pizza", "Піца"),
                PollOption::new("burger", "Бургер"),
                PollOption::new("salad", "Салат"),
            ],
        }
    }

    /// Look up an option by key
    pub fn get(&self, key: &str) -> Option<&PollOption> {
        self.options.iter().find(|option| option.key == key)
    }

    /// Whether `key` names a configured option
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Declaration index of an option, used for tie-breaking
    pub fn position(&self, key: &str) -> Option<usize> {
        self.options.iter().position(|option| option.key == key)
    }

    /// Options in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &PollOption> {
        self.options.iter()
    }

    /// Number of configured options
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always false for a validated set
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl FromStr for PollOptions {
    type Err = Error;

    /// Parse `key=Label` pairs separated by commas; the label is optional
    fn from_str(s: &str) -> Result<Self> {
        let options = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((key, label)) => {
                    let label = label.trim();
                    if label.is_empty() {
                        PollOption::bare(key.trim())
                    } else {
                        PollOption::new(key.trim(), label)
                    }
                }
                None => PollOption::bare(entry),
            })
            .collect();

        Self::new(options)
    }
}

/// One option's running count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyEntry {
    pub option: PollOption,
    pub count: u64,
}

/// Vote counts for every configured option, in declaration order
///
/// Every option has exactly one entry. Counts only move up by one per
/// accepted vote, or back to zero on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    entries: Vec<TallyEntry>,
}

impl Tally {
    /// All-zero tally for the given options
    pub fn empty(options: &PollOptions) -> Self {
        Self {
            entries: options
                .iter()
                .map(|option| TallyEntry {
                    option: option.clone(),
                    count: 0,
                })
                .collect(),
        }
    }

    /// Rebuild a tally from persisted counts
    ///
    /// Options missing from `counts` start at zero. Keys that are not
    /// configured options are returned so the caller can report them.
    /// Counts whose sum does not fit in a `u64` are rejected.
    pub fn from_counts(
        options: &PollOptions,
        counts: &HashMap<String, u64>,
    ) -> Result<(Self, Vec<String>)> {
        let mut tally = Self::empty(options);
        let mut total: u64 = 0;
        for entry in &mut tally.entries {
            if let Some(count) = counts.get(&entry.option.key) {
                total = total
                    .checked_add(*count)
                    .ok_or_else(|| Error::validation("votes: total exceeds u64"))?;
                entry.count = *count;
            }
        }

        let mut unknown: Vec<String> = counts
            .keys()
            .filter(|key| !options.contains(key))
            .cloned()
            .collect();
        unknown.sort();

        Ok((tally, unknown))
    }

    /// Persisted form: option key to count
    pub fn to_counts(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|entry| (entry.option.key.clone(), entry.count))
            .collect()
    }

    /// Count for one option, `None` if it is not configured
    pub fn count(&self, key: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.option.key == key)
            .map(|entry| entry.count)
    }

    /// Sum of all counts; always fits in a `u64`
    pub fn total(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Entries in declaration order
    pub fn entries(&self) -> &[TallyEntry] {
        &self.entries
    }

    /// Add one vote
    ///
    /// Fails without changing anything if the option is not part of this
    /// tally or the count or total would overflow.
    pub(crate) fn increment(&mut self, key: &str) -> Result<()> {
        if self.total().checked_add(1).is_none() {
            return Err(Error::validation("votes: total exceeds u64"));
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.option.key == key)
            .ok_or_else(|| Error::validation(format!("votes: unknown option '{key}'")))?;
        entry.count = entry
            .count
            .checked_add(1)
            .ok_or_else(|| Error::validation("votes: count exceeds u64"))?;
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_parsing() {
        let options: PollOptions = " pizza=Піца, burger ,salad= ".parse().unwrap();
        let parsed: Vec<_> = options.iter().cloned().collect();

        assert_eq!(
            parsed,
            vec![
                PollOption::new("pizza", "Піца"),
                PollOption::bare("burger"),
                PollOption::bare("salad"),
            ]
        );
        assert_eq!(options.position("salad"), Some(2));
    }

    #[test]
    fn test_option_validation() {
        assert!("".parse::<PollOptions>().is_err());
        assert!("a,b,a".parse::<PollOptions>().is_err());
        assert!(PollOptions::new(vec![PollOption::bare("  ")]).is_err());
        assert_eq!(PollOptions::lunch().len(), 3);
    }

    #[test]
    fn test_tally_counts() {
        let options = PollOptions::lunch();
        let mut tally = Tally::empty(&options);

        tally.increment("pizza").unwrap();
        tally.increment("pizza").unwrap();
        tally.increment("salad").unwrap();
        assert!(tally.increment("sushi").is_err());

        assert_eq!(tally.count("pizza"), Some(2));
        assert_eq!(tally.count("burger"), Some(0));
        assert_eq!(tally.total(), 3);

        tally.clear();
        assert_eq!(tally, Tally::empty(&options));
    }

    #[test]
    fn test_tally_from_partial_counts() {
        let options = PollOptions::lunch();
        let counts = HashMap::from([
            ("burger".to_string(), 4),
            ("sushi".to_string(), 9),
            ("kebab".to_string(), 1),
        ]);

        let (tally, unknown) = Tally::from_counts(&options, &counts).unwrap();

        assert_eq!(tally.count("pizza"), Some(0));
        assert_eq!(tally.count("burger"), Some(4));
        assert_eq!(tally.total(), 4);
        assert_eq!(unknown, vec!["kebab".to_string(), "sushi".to_string()]);

        let keys: Vec<_> = tally.entries().iter().map(|e| e.option.key.as_str()).collect();
        assert_eq!(keys, vec!["pizza", "burger", "salad"]);
    }

    #[test]
    fn test_tally_rejects_overflowing_counts() {
        let options = PollOptions::lunch();
        let counts = HashMap::from([("pizza".to_string(), u64::MAX), ("burger".to_string(), 1)]);
        assert!(Tally::from_counts(&options, &counts).is_err());

        // Counts on unknown keys are dropped before they can overflow
        let counts = HashMap::from([("pizza".to_string(), u64::MAX), ("sushi".to_string(), 1)]);
        let (tally, _) = Tally::from_counts(&options, &counts).unwrap();
        assert_eq!(tally.total(), u64::MAX);
    }

    #[test]
    fn test_increment_at_limit_changes_nothing() {
        let options = PollOptions::lunch();
        let counts = HashMap::from([("salad".to_string(), u64::MAX)]);
        let (mut tally, _) = Tally::from_counts(&options, &counts).unwrap();

        assert!(tally.increment("salad").is_err());
        assert!(tally.increment("pizza").is_err());
        assert_eq!(tally.count("salad"), Some(u64::MAX));
        assert_eq!(tally.count("pizza"), Some(0));
    }
}
