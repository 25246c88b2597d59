//! Period extraction from raw portal listings.
//!
//! Parsing never fails. Content with no recognizable period yields an empty
//! set plus a [`ParseWarning`], so a portal layout change degrades to "no
//! candidates from this source" instead of aborting the run.

mod html;
mod patterns;
mod table;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::institution::Institution;
use super::period::Period;
use super::source::RawListing;

pub use table::PortfolioFigures;

/// Recoverable parse problem. Logged and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    NoPeriodsFound,
    /// The listing has no table row for the institution, so whatever
    /// periods it mentions are not that institution's report.
    InstitutionNotListed,
    FuturePeriodsDiscarded {
        horizon: Period,
        discarded: Vec<Period>,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::NoPeriodsFound => {
                write!(f, "no reporting period recognized in portal content")
            }
            ParseWarning::InstitutionNotListed => {
                write!(f, "institution has no row in the portal listing")
            }
            ParseWarning::FuturePeriodsDiscarded { horizon, discarded } => {
                let listed = discarded
                    .iter()
                    .map(Period::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "ignored periods later than {horizon}: {listed}")
            }
        }
    }
}

/// Distinct periods found in one piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodParse {
    pub periods: BTreeSet<Period>,
    pub warnings: Vec<ParseWarning>,
}

impl PeriodParse {
    pub fn latest(&self) -> Option<Period> {
        self.periods.last().copied()
    }
}

/// Parse result for one institution's listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedListing {
    pub institution: Institution,
    pub listed: bool,
    pub periods: BTreeSet<Period>,
    pub warnings: Vec<ParseWarning>,
    pub figures: Option<PortfolioFigures>,
}

impl ParsedListing {
    /// Latest period this institution reported. `None` when the listing
    /// carries no row for it.
    pub fn latest(&self) -> Option<Period> {
        if !self.listed {
            return None;
        }
        self.periods.last().copied()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodParser {
    horizon: Option<Period>,
}

impl PeriodParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard periods later than `horizon`; a listing cannot report a month
    /// that has not started yet.
    pub fn with_horizon(horizon: Period) -> Self {
        Self {
            horizon: Some(horizon),
        }
    }

    pub fn parse(&self, raw: &str) -> PeriodParse {
        let nodes = html::text_nodes(raw);
        let mut periods: BTreeSet<Period> = nodes
            .iter()
            .flat_map(|node| patterns::text_periods(node))
            .collect();
        periods.extend(patterns::link_periods(raw));

        let mut warnings = Vec::new();
        if let Some(horizon) = self.horizon {
            let discarded: Vec<Period> = periods.split_off(&horizon.next()).into_iter().collect();
            if !discarded.is_empty() {
                warnings.push(ParseWarning::FuturePeriodsDiscarded { horizon, discarded });
            }
        }

        if periods.is_empty() {
            warnings.push(ParseWarning::NoPeriodsFound);
        }

        PeriodParse { periods, warnings }
    }

    pub fn parse_listing(&self, listing: &RawListing) -> ParsedListing {
        let PeriodParse {
            periods,
            mut warnings,
        } = self.parse(&listing.body);
        let listed = table::lists(&listing.body, &listing.institution);
        if !listed {
            warnings.push(ParseWarning::InstitutionNotListed);
        }
        ParsedListing {
            institution: listing.institution.clone(),
            listed,
            periods,
            warnings,
            figures: table::figures_for(&listing.body, &listing.institution),
        }
    }
}

/// Parse with no horizon.
pub fn parse_periods(raw: &str) -> PeriodParse {
    PeriodParser::new().parse(raw)
}
