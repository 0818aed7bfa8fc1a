//! Ranking of Ritz values.
//!
//! A [`SelectionRule`] decides which end of the spectrum the solver is after. It is
//! reduced to a real sort key per Ritz value, and [`sort_indices`] orders the values
//! by ascending key with a stable sort, so the wanted values come first and equal
//! keys keep their original order.
//!
//! The two imaginary rules rank by `|Im θ|`. For a real operator the Ritz values come
//! in conjugate pairs, and ranking by magnitude keeps both members of a pair next to
//! each other, which the restart relies on to apply them as one double shift.

use faer::c64;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

/// Selects which eigenvalues are wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionRule {
    /// Largest `|θ|`.
    #[default]
    LargestMagnitude,
    /// Largest `Re θ`.
    LargestReal,
    /// Largest `|Im θ|`.
    LargestImaginary,
    /// Smallest `|θ|`.
    SmallestMagnitude,
    /// Smallest `Re θ`.
    SmallestReal,
    /// Smallest `|Im θ|`.
    SmallestImaginary,
}

impl SelectionRule {
    pub const ALL: [SelectionRule; 6] = [
        SelectionRule::LargestMagnitude,
        SelectionRule::LargestReal,
        SelectionRule::LargestImaginary,
        SelectionRule::SmallestMagnitude,
        SelectionRule::SmallestReal,
        SelectionRule::SmallestImaginary,
    ];

    /// The ARPACK abbreviation of the rule (`"LM"`, `"SR"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionRule::LargestMagnitude => "LM",
            SelectionRule::LargestReal => "LR",
            SelectionRule::LargestImaginary => "LI",
            SelectionRule::SmallestMagnitude => "SM",
            SelectionRule::SmallestReal => "SR",
            SelectionRule::SmallestImaginary => "SI",
        }
    }

    /// Sort key of `z`: ascending keys rank the wanted values first. NaN maps to
    /// `+∞` so that undefined values are never selected ahead of defined ones.
    pub fn sort_key(self, z: c64) -> f64 {
        let key = match self {
            SelectionRule::LargestMagnitude => -z.norm(),
            SelectionRule::LargestReal => -z.re,
            SelectionRule::LargestImaginary => -z.im.abs(),
            SelectionRule::SmallestMagnitude => z.norm(),
            SelectionRule::SmallestReal => z.re,
            SelectionRule::SmallestImaginary => z.im.abs(),
        };
        if key.is_nan() { f64::INFINITY } else { key }
    }

    /// Returns `true` if `a` ranks strictly ahead of `b`.
    pub fn precedes(self, a: c64, b: c64) -> bool {
        self.sort_key(a) < self.sort_key(b)
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown selection rule `{0}`; expected one of LM, LR, LI, SM, SR, SI.")]
pub struct ParseSelectionRuleError(String);

impl FromStr for SelectionRule {
    type Err = ParseSelectionRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SelectionRule::ALL
            .into_iter()
            .find(|rule| rule.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSelectionRuleError(s.to_string()))
    }
}

/// Returns the permutation that orders `values` by `rule`, wanted values first.
pub fn sort_indices(values: &[c64], rule: SelectionRule) -> Vec<usize> {
    let keys: Vec<f64> = values.iter().map(|&z| rule.sort_key(z)).collect();
    let mut order: Vec<usize> = (0..values.len()).collect();
    // `sort_by` is stable, so ties keep index order.
    order.sort_by(|&a, &b| keys[a].partial_cmp(&keys[b]).unwrap_or(Ordering::Equal));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<c64> {
        vec![
            c64::new(1.0, 0.0),
            c64::new(-3.0, 0.0),
            c64::new(0.5, 2.0),
            c64::new(0.5, -2.0),
            c64::new(2.0, 0.0),
        ]
    }

    #[test]
    fn test_each_rule_picks_its_end_of_the_spectrum() {
        let values = sample();
        let first = |rule| sort_indices(&values, rule)[0];

        assert_eq!(first(SelectionRule::LargestMagnitude), 1);
        assert_eq!(first(SelectionRule::LargestReal), 4);
        assert_eq!(first(SelectionRule::LargestImaginary), 2);
        assert_eq!(first(SelectionRule::SmallestMagnitude), 0);
        assert_eq!(first(SelectionRule::SmallestReal), 1);
        assert_eq!(first(SelectionRule::SmallestImaginary), 0);
    }

    #[test]
    fn test_ties_keep_index_order_and_pairs_stay_adjacent() {
        let values = sample();
        assert_eq!(
            sort_indices(&values, SelectionRule::LargestImaginary),
            vec![2, 3, 0, 1, 4]
        );
        assert_eq!(
            sort_indices(&values, SelectionRule::SmallestReal),
            vec![1, 2, 3, 0, 4]
        );
        // |−3| > |0.5 ± 2i| ≈ 2.06 > |2| > |1|
        assert_eq!(
            sort_indices(&values, SelectionRule::LargestMagnitude),
            vec![1, 2, 3, 4, 0]
        );
    }

    #[test]
    fn test_nan_is_ranked_last() {
        let values = vec![
            c64::new(f64::NAN, f64::NAN),
            c64::new(1.0, 0.0),
            c64::new(-1.0, 0.0),
        ];
        for rule in SelectionRule::ALL {
            assert_eq!(*sort_indices(&values, rule).last().unwrap(), 0, "{rule}");
        }
    }

    #[test]
    fn test_parse_and_display() {
        for rule in SelectionRule::ALL {
            assert_eq!(rule.to_string().parse::<SelectionRule>(), Ok(rule));
        }
        assert_eq!("sr".parse::<SelectionRule>(), Ok(SelectionRule::SmallestReal));
        let err = "XX".parse::<SelectionRule>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown selection rule `XX`; expected one of LM, LR, LI, SM, SR, SI."
        );
        assert_eq!(SelectionRule::default(), SelectionRule::LargestMagnitude);
    }
}
