//! Results projector: ranked, percentage-annotated view of a tally
//!
//! Projection is pure. The same tally always yields the same rows.

use crate::types::Tally;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How per-option percentages are rounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Each share rounded on its own, halves up. Totals may land a point
    /// or two off 100.
    #[default]
    HalfUp,

    /// Floor every share, then give the leftover points to the largest
    /// remainders. Totals are exactly 100 whenever any vote exists.
    LargestRemainder,
}

impl FromStr for RoundingMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half-up" | "half_up" | "halfup" => Ok(Self::HalfUp),
            "largest-remainder" | "largest_remainder" | "hamilton" => Ok(Self::LargestRemainder),
            other => Err(crate::config_error!("unknown rounding mode '{}'", other)),
        }
    }
}

/// One ranked line of the results display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub option: String,
    pub label: String,
    pub count: u64,
    pub percentage: u8,
}

/// Ranked results for the whole poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    pub rows: Vec<ResultRow>,
    pub total: u64,
}

impl Projection {
    /// Leading row, if any vote has been cast
    pub fn leader(&self) -> Option<&ResultRow> {
        self.rows.first().filter(|row| row.count > 0)
    }

    /// Sum of displayed percentages
    pub fn percentage_sum(&self) -> u32 {
        self.rows.iter().map(|row| u32::from(row.percentage)).sum()
    }
}

/// Derives [`Projection`]s with a fixed rounding rule
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultsProjector {
    rounding: RoundingMode,
}

impl ResultsProjector {
    /// Projector using `rounding` for every projection
    pub fn new(rounding: RoundingMode) -> Self {
        Self { rounding }
    }

    /// Configured rounding rule
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Rank options by count, descending; equal counts keep declaration order
    pub fn project(&self, tally: &Tally) -> Projection {
        let total = tally.total();

        let mut rows: Vec<ResultRow> = tally
            .entries()
            .iter()
            .map(|entry| ResultRow {
                option: entry.option.key.clone(),
                label: entry.option.label.clone(),
                count: entry.count,
                percentage: 0,
            })
            .collect();

        // Stable sort keeps declaration order among ties
        rows.sort_by(|a, b| b.count.cmp(&a.count));

        if total > 0 {
            match self.rounding {
                RoundingMode::HalfUp => {
                    for row in &mut rows {
                        row.percentage = round_half_up(row.count, total);
                    }
                }
                RoundingMode::LargestRemainder => apportion(&mut rows, total),
            }
        }

        Projection { rows, total }
    }
}

/// Project with the default half-up rounding
pub fn project(tally: &Tally) -> Projection {
    ResultsProjector::default().project(tally)
}

/// round(100 * count / total), halves up, in integer arithmetic
fn round_half_up(count: u64, total: u64) -> u8 {
    let scaled = (200 * u128::from(count) + u128::from(total)) / (2 * u128::from(total));
    scaled as u8
}

fn apportion(rows: &mut [ResultRow], total: u64) {
    let total = u128::from(total);
    let mut remainders: Vec<(usize, u128)> = Vec::with_capacity(rows.len());
    let mut assigned: u128 = 0;

    for (index, row) in rows.iter_mut().enumerate() {
        let scaled = 100 * u128::from(row.count);
        row.percentage = (scaled / total) as u8;
        assigned += scaled / total;
        remainders.push((index, scaled % total));
    }

    // Ties go to the higher-ranked row
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let leftover = (100 - assigned) as usize;
    for (index, _) in remainders.into_iter().take(leftover) {
        rows[index].percentage += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PollOption, PollOptions};
    use std::collections::HashMap;

    fn abc(a: u64, b: u64, c: u64) -> Tally {
        let options = PollOptions::new(vec![
            PollOption::bare("A"),
            PollOption::bare("B"),
            PollOption::bare("C"),
        ])
        .unwrap();
        let counts = HashMap::from([
            ("A".to_string(), a),
            ("B".to_string(), b),
            ("C".to_string(), c),
        ]);
        Tally::from_counts(&options, &counts).unwrap().0
    }

    fn summary(projection: &Projection) -> Vec<(&str, u64, u8)> {
        projection
            .rows
            .iter()
            .map(|row| (row.option.as_str(), row.count, row.percentage))
            .collect()
    }

    #[test]
    fn test_scenario_ranking() {
        let projection = project(&abc(2, 1, 0));

        assert_eq!(
            summary(&projection),
            vec![("A", 2, 67), ("B", 1, 33), ("C", 0, 0)]
        );
        assert_eq!(projection.total, 3);
        assert_eq!(projection.percentage_sum(), 100);
        assert_eq!(projection.leader().unwrap().option, "A");
    }

    #[test]
    fn test_ties_follow_declaration_order() {
        let projection = project(&abc(1, 3, 3));
        assert_eq!(
            summary(&projection),
            vec![("B", 3, 43), ("C", 3, 43), ("A", 1, 14)]
        );

        let projection = project(&abc(0, 0, 0));
        assert_eq!(
            summary(&projection),
            vec![("A", 0, 0), ("B", 0, 0), ("C", 0, 0)]
        );
        assert!(projection.leader().is_none());
    }

    #[test]
    fn test_half_up_rounding() {
        // 1/8 = 12.5% and 7/8 = 87.5%
        let projection = project(&abc(7, 1, 0));
        assert_eq!(summary(&projection), vec![("A", 7, 88), ("B", 1, 13), ("C", 0, 0)]);
        assert_eq!(projection.percentage_sum(), 101);
    }

    #[test]
    fn test_largest_remainder_sums_to_hundred() {
        let projector = ResultsProjector::new(RoundingMode::LargestRemainder);

        let even = projector.project(&abc(1, 1, 1));
        assert_eq!(summary(&even), vec![("A", 1, 34), ("B", 1, 33), ("C", 1, 33)]);

        for (a, b, c) in [(7, 1, 0), (2, 1, 0), (5, 3, 3), (1, 0, 0), (13, 29, 58)] {
            let projection = projector.project(&abc(a, b, c));
            assert_eq!(projection.percentage_sum(), 100, "counts {a}/{b}/{c}");
        }

        assert_eq!(projector.project(&abc(0, 0, 0)).percentage_sum(), 0);
    }

    #[test]
    fn test_largest_possible_total() {
        for rounding in [RoundingMode::HalfUp, RoundingMode::LargestRemainder] {
            let projection = ResultsProjector::new(rounding).project(&abc(u64::MAX - 1, 1, 0));
            assert_eq!(projection.total, u64::MAX);
            assert_eq!(summary(&projection)[0], ("A", u64::MAX - 1, 100));
            assert_eq!(projection.percentage_sum(), 100);
        }
    }

    #[test]
    fn test_rounding_mode_parsing() {
        assert_eq!("half-up".parse::<RoundingMode>().unwrap(), RoundingMode::HalfUp);
        assert_eq!(
            "Largest-Remainder".parse::<RoundingMode>().unwrap(),
            RoundingMode::LargestRemainder
        );
        assert!("banker".parse::<RoundingMode>().is_err());
    }
}
