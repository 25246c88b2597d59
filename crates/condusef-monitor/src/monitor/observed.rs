use serde::Serialize;

use super::institution::Institution;
use super::parser::PortfolioFigures;
use super::period::Period;

/// Latest period one institution showed during a single run. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservedReport {
    pub institution: Institution,
    pub period: Period,
    pub figures: Option<PortfolioFigures>,
}
