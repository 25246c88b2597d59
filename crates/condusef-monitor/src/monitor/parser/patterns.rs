use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::monitor::period::Period;

const MONTH_WORDS: &str = "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|\
octubre|noviembre|diciembre|january|february|march|april|june|july|august|september|october|\
november|december|ene|jan|feb|mar|abr|apr|may|jun|jul|ago|aug|sept|sep|oct|nov|dic|dec";

fn month_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\b({MONTH_WORDS})\.?(?:\s+del?\s+|[\s\-/_,]+)((?:19|20)\d{{2}})\b"
        ))
        .expect("month name pattern compiles")
    })
}

fn month_first_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(0?[1-9]|1[0-2])[/\-]((?:19|20)\d{2})\b")
            .expect("month/year pattern compiles")
    })
}

fn year_first_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b((?:19|20)\d{2})[/\-](0?[1-9]|1[0-2])\b")
            .expect("year/month pattern compiles")
    })
}

fn query_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)anio_s=((?:19|20)\d{2})[^"'\s<>]*?trim_s=(\d{1,2})\b"#)
            .expect("query link pattern compiles")
    })
}

/// Month number for a Spanish or English month name or abbreviation.
pub(crate) fn month_from_name(word: &str) -> Option<u32> {
    let lowered = word.to_lowercase();
    let prefix: String = lowered.chars().take(3).collect();
    let month = match prefix.as_str() {
        "ene" | "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "abr" | "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" | "aug" => 8,
        "sep" | "set" => 9,
        "oct" => 10,
        "nov" => 11,
        "dic" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn numeric(captures: &Captures<'_>, year_group: usize, month_group: usize) -> Option<Period> {
    let year = captures.get(year_group)?.as_str().parse().ok()?;
    let month = captures.get(month_group)?.as_str().parse().ok()?;
    Period::new(year, month)
}

/// False when the match is one piece of a full date such as `31/12/2025`,
/// `2025-10-31` or `15-Ene-2026`.
fn stands_alone(text: &str, captures: &Captures<'_>) -> bool {
    let Some(whole) = captures.get(0) else {
        return false;
    };
    let before = text[..whole.start()].as_bytes();
    let after = text[whole.end()..].as_bytes();
    let joined_before = matches!(before, [.., digit, b'/' | b'-'] if digit.is_ascii_digit());
    let joined_after = matches!(after, [b'/' | b'-', digit, ..] if digit.is_ascii_digit());
    !joined_before && !joined_after
}

/// Periods written out in one text node.
pub(crate) fn text_periods(text: &str) -> impl Iterator<Item = Period> + '_ {
    let named = month_name_pattern()
        .captures_iter(text)
        .filter(move |caps| stands_alone(text, caps))
        .filter_map(|caps| {
            let month = month_from_name(caps.get(1)?.as_str())?;
            let year = caps.get(2)?.as_str().parse().ok()?;
            Period::new(year, month)
        });
    let month_first = month_first_pattern()
        .captures_iter(text)
        .filter(move |caps| stands_alone(text, caps))
        .filter_map(|caps| numeric(&caps, 2, 1));
    let year_first = year_first_pattern()
        .captures_iter(text)
        .filter(move |caps| stands_alone(text, caps))
        .filter_map(|caps| numeric(&caps, 1, 2));

    named.chain(month_first).chain(year_first)
}

/// Periods encoded in the portal's own query links (`anio_s=2025&trim_s=12`).
pub(crate) fn link_periods(raw: &str) -> impl Iterator<Item = Period> + '_ {
    query_link_pattern()
        .captures_iter(raw)
        .filter_map(|caps| numeric(&caps, 1, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Vec<(i32, u32)> {
        let mut found: Vec<_> = text_periods(text)
            .map(|period| (period.year(), period.month()))
            .collect();
        found.sort();
        found.dedup();
        found
    }

    #[test]
    fn month_names_in_both_languages() {
        assert_eq!(month_from_name("Diciembre"), Some(12));
        assert_eq!(month_from_name("AUGUST"), Some(8));
        assert_eq!(month_from_name("setiembre"), Some(9));
        assert_eq!(month_from_name("Ago"), Some(8));
        assert_eq!(month_from_name("Total"), None);
    }

    #[test]
    fn recognizes_named_periods() {
        assert_eq!(collect("Información a Diciembre 2025"), vec![(2025, 12)]);
        assert_eq!(collect("corte de enero de 2026"), vec![(2026, 1)]);
        assert_eq!(collect("Dec-2025 and Nov. 2025"), vec![(2025, 11), (2025, 12)]);
    }

    #[test]
    fn recognizes_numeric_periods() {
        assert_eq!(collect("Periodo 12/2025"), vec![(2025, 12)]);
        assert_eq!(collect("Periodo 2026-01"), vec![(2026, 1)]);
        assert_eq!(collect("Periodo 01-2026."), vec![(2026, 1)]);
    }

    #[test]
    fn full_dates_are_not_periods() {
        assert!(collect("Fecha de consulta: 15/01/2026").is_empty());
        assert!(collect("actualizado 2025-10-31").is_empty());
        assert!(collect("corte 31/12/2025 09:00").is_empty());
        assert!(collect("publicado 15-Ene-2026").is_empty());
        assert_eq!(
            collect("Periodo 12/2025, consulta 15/01/2026"),
            vec![(2025, 12)]
        );
    }

    #[test]
    fn ignores_invalid_months_and_plain_numbers() {
        assert!(collect("13/2025 and 1,234,567 and 2025").is_empty());
    }

    #[test]
    fn recognizes_query_links() {
        let raw = r#"<a href="?sec=27&amp;anio_s=2025&amp;trim_s=11&amp;mone_s=peso">ver</a>"#;
        let found: Vec<_> = link_periods(raw).collect();
        assert_eq!(found, vec![Period::new(2025, 11).unwrap()]);
    }
}
