use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::html::to_text;
use crate::monitor::institution::Institution;

/// Credit portfolio figures the portal publishes per institution. Amounts
/// are MXN; `imora` is the delinquency index in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioFigures {
    pub total_loans: i64,
    pub performing_loans: i64,
    pub non_performing_loans: i64,
    pub imora: f64,
}

fn row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("row pattern compiles"))
}

fn cell_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>").expect("cell pattern compiles"))
}

/// Cell texts of every table row, in document order.
fn rows(body: &str) -> impl Iterator<Item = Vec<String>> + '_ {
    row_pattern().captures_iter(body).filter_map(|row| {
        let cells = cell_pattern()
            .captures_iter(row.get(1)?.as_str())
            .filter_map(|cell| cell.get(1).map(|m| to_text(m.as_str())))
            .collect();
        Some(cells)
    })
}

/// True when some table row opens with a cell naming `institution`.
pub(crate) fn lists(body: &str, institution: &Institution) -> bool {
    rows(body).any(|cells| {
        cells
            .first()
            .is_some_and(|name| institution.is_named_in(name))
    })
}

/// First table row naming `institution` with at least five parseable cells.
pub(crate) fn figures_for(body: &str, institution: &Institution) -> Option<PortfolioFigures> {
    rows(body).find_map(|cells| {
        if cells.len() < 5 || !institution.is_named_in(&cells[0]) {
            return None;
        }

        Some(PortfolioFigures {
            total_loans: parse_amount(&cells[1])?,
            performing_loans: parse_amount(&cells[2])?,
            non_performing_loans: parse_amount(&cells[3])?,
            imora: parse_percent(&cells[4])?,
        })
    })
}

fn parse_amount(value: &str) -> Option<i64> {
    let cleaned: String = value
        .chars()
        .filter(|ch| !matches!(ch, ',' | '$' | ' '))
        .collect();
    cleaned.parse().ok()
}

fn parse_percent(value: &str) -> Option<f64> {
    value.replace('%', "").trim().parse().ok()
}
