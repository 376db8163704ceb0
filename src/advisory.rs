//! Clothing comfort advisories.
//!
//! Maps the set of clothing categories observed during a run plus one ambient
//! temperature reading to a per-category verdict. Categories without a comfort
//! range are skipped.

use std::collections::BTreeSet;
use std::fmt;

/// Ambient-temperature interval in which a clothing category is appropriate.
///
/// Either bound may be infinite to mean "no limit on that side".
#[derive(Clone, Copy, Debug)]
pub struct ComfortRange {
    pub min_temp: f32,
    pub max_temp: f32,
}

/// Per-category verdict against the current temperature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Temperature below the category's minimum.
    TooLight,
    /// Temperature above the category's maximum.
    TooWarm,
    Appropriate,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::TooLight => write!(f, "too light; consider dressing warmer"),
            Verdict::TooWarm => write!(f, "may be too warm; consider dressing lighter"),
            Verdict::Appropriate => write!(f, "appropriate"),
        }
    }
}

/// One advisory line: category plus verdict.
#[derive(Clone, Debug, PartialEq)]
pub struct Advisory {
    pub label: String,
    pub verdict: Verdict,
}

const COMFORT_TABLE: &[(&str, ComfortRange)] = &[
    (
        "Jacket",
        ComfortRange {
            min_temp: f32::NEG_INFINITY,
            max_temp: 15.0,
        },
    ),
    (
        "Jeans",
        ComfortRange {
            min_temp: 5.0,
            max_temp: 30.0,
        },
    ),
    (
        "Jogger",
        ComfortRange {
            min_temp: 5.0,
            max_temp: 25.0,
        },
    ),
    (
        "Polo",
        ComfortRange {
            min_temp: 18.0,
            max_temp: 32.0,
        },
    ),
    (
        "Shirt",
        ComfortRange {
            min_temp: 16.0,
            max_temp: 28.0,
        },
    ),
    (
        "Short",
        ComfortRange {
            min_temp: 22.0,
            max_temp: 40.0,
        },
    ),
    (
        "T-Shirt",
        ComfortRange {
            min_temp: 18.0,
            max_temp: f32::INFINITY,
        },
    ),
    (
        "Trouser",
        ComfortRange {
            min_temp: 5.0,
            max_temp: 30.0,
        },
    ),
];

/// Look up the comfort range for a clothing category.
pub fn comfort_range(label: &str) -> Option<ComfortRange> {
    COMFORT_TABLE
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, range)| *range)
}

/// Evaluate a range against a temperature. Bounds are inclusive on the
/// appropriate side: equality to either bound is appropriate.
pub fn verdict_for(range: ComfortRange, temp_c: f32) -> Verdict {
    if temp_c < range.min_temp {
        Verdict::TooLight
    } else if temp_c > range.max_temp {
        Verdict::TooWarm
    } else {
        Verdict::Appropriate
    }
}

/// Evaluate every observed category against the current temperature.
///
/// Categories absent from the comfort table produce no advisory. Each label is
/// processed exactly once; output is sorted by label (set iteration order).
pub fn evaluate(labels: &BTreeSet<String>, temp_c: f32) -> Vec<Advisory> {
    labels
        .iter()
        .filter_map(|label| {
            comfort_range(label).map(|range| Advisory {
                label: label.clone(),
                verdict: verdict_for(range, temp_c),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn jacket_at_twenty_degrees_is_too_warm() {
        let advisories = evaluate(&labels(&["Jacket"]), 20.0);
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].verdict, Verdict::TooWarm);
    }

    #[test]
    fn jeans_at_ten_degrees_are_appropriate() {
        let advisories = evaluate(&labels(&["Jeans"]), 10.0);
        assert_eq!(advisories[0].verdict, Verdict::Appropriate);
    }

    #[test]
    fn tshirt_at_ten_degrees_is_too_light() {
        let advisories = evaluate(&labels(&["T-Shirt"]), 10.0);
        assert_eq!(advisories[0].verdict, Verdict::TooLight);
    }

    #[test]
    fn bound_equality_counts_as_appropriate() {
        assert_eq!(
            verdict_for(comfort_range("Jeans").unwrap(), 5.0),
            Verdict::Appropriate
        );
        assert_eq!(
            verdict_for(comfort_range("Jeans").unwrap(), 30.0),
            Verdict::Appropriate
        );
    }

    #[test]
    fn open_ended_bounds_never_trigger() {
        // Jacket has no lower bound; T-Shirt has no upper bound.
        assert_eq!(
            verdict_for(comfort_range("Jacket").unwrap(), -60.0),
            Verdict::Appropriate
        );
        assert_eq!(
            verdict_for(comfort_range("T-Shirt").unwrap(), 55.0),
            Verdict::Appropriate
        );
    }

    #[test]
    fn unknown_labels_are_skipped() {
        let advisories = evaluate(&labels(&["Scarf", "Jeans"]), 10.0);
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].label, "Jeans");
    }

    #[test]
    fn every_table_label_gets_exactly_one_verdict() {
        let all = labels(&[
            "Jacket", "Jeans", "Jogger", "Polo", "Shirt", "Short", "T-Shirt", "Trouser",
        ]);
        let advisories = evaluate(&all, 20.0);
        assert_eq!(advisories.len(), all.len());
        let unique: BTreeSet<_> = advisories.iter().map(|a| a.label.clone()).collect();
        assert_eq!(unique.len(), advisories.len());
    }
}
