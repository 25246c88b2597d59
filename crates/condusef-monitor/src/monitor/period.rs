use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// One monthly reporting cycle on the portal.
///
/// Ordering is year first, then month. Field order matters: the derived
/// `Ord` compares fields in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = String;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Period::new(raw.year, raw.month)
            .ok_or_else(|| format!("month {} of {} is outside 1..=12", raw.month, raw.year))
    }
}

impl Period {
    /// Baseline used when no marker has ever been stored. Older than any
    /// period the parser can produce.
    pub const SENTINEL: Period = Period { year: 0, month: 1 };

    /// Builds a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// Calendar month containing `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Human label such as "December 2025".
    pub fn label(&self) -> String {
        let name = MONTH_NAMES[(self.month - 1) as usize];
        format!("{name} {}", self.year)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Freshness rule: `candidate` counts as new only when strictly later than
/// `baseline`.
pub fn is_newer(candidate: Period, baseline: Period) -> bool {
    candidate.cmp(&baseline) == Ordering::Greater
}

/// Latest period in `candidates`, if any.
pub fn latest<I>(candidates: I) -> Option<Period>
where
    I: IntoIterator<Item = Period>,
{
    candidates.into_iter().max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).expect("valid period")
    }

    #[test]
    fn rejects_months_out_of_range() {
        assert!(Period::new(2025, 0).is_none());
        assert!(Period::new(2025, 13).is_none());
        assert!(Period::new(2025, 12).is_some());
    }

    #[test]
    fn is_newer_matches_lexicographic_order() {
        for year_a in 2023..=2026 {
            for month_a in 1..=12 {
                for year_b in 2023..=2026 {
                    for month_b in 1..=12 {
                        let a = period(year_a, month_a);
                        let b = period(year_b, month_b);
                        assert_eq!(
                            is_newer(a, b),
                            (year_a, month_a) > (year_b, month_b),
                            "{a} vs {b}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn equal_periods_are_not_newer() {
        assert!(!is_newer(period(2025, 12), period(2025, 12)));
    }

    #[test]
    fn sentinel_is_older_than_any_real_period() {
        assert!(is_newer(period(1990, 1), Period::SENTINEL));
        assert!(Period::SENTINEL.is_sentinel());
    }

    #[test]
    fn deserializing_validates_month() {
        let parsed: Period =
            serde_json::from_str(r#"{"year":2025,"month":12}"#).expect("valid period");
        assert_eq!(parsed, period(2025, 12));

        for raw in [r#"{"year":2025,"month":0}"#, r#"{"year":2025,"month":13}"#] {
            assert!(serde_json::from_str::<Period>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn next_rolls_over_december() {
        assert_eq!(period(2025, 12).next(), period(2026, 1));
        assert_eq!(period(2025, 3).next(), period(2025, 4));
    }

    #[test]
    fn labels_and_display() {
        assert_eq!(period(2025, 12).label(), "December 2025");
        assert_eq!(period(2026, 1).to_string(), "2026-01");
    }

    #[test]
    fn containing_uses_calendar_month() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        assert_eq!(Period::containing(instant), period(2026, 2));
    }

    #[test]
    fn latest_picks_maximum() {
        let found = latest([period(2025, 11), period(2026, 1), period(2025, 12)]);
        assert_eq!(found, Some(period(2026, 1)));
        assert_eq!(latest(std::iter::empty()), None);
    }
}
