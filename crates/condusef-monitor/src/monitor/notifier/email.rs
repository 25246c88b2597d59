use std::fmt::Write as _;

use crate::monitor::observed::ObservedReport;
use crate::monitor::period::Period;

const SOURCE_URL: &str = "https://registros.condusef.gob.mx";

pub fn subject_for(period: Period) -> String {
    format!("CONDUSEF SOFIPO Update - {}", period.label())
}

/// HTML alert body for `period`. Rows are sorted by short name.
pub fn render_alert_html(period: Period, reports: &[ObservedReport]) -> String {
    let mut sorted: Vec<&ObservedReport> = reports.iter().collect();
    sorted.sort_by(|a, b| a.institution.short_name.cmp(&b.institution.short_name));

    let mut rows = String::new();
    for report in sorted {
        let name = escape_html(&report.institution.short_name);
        match report.figures {
            Some(figures) => {
                writeln!(
                    rows,
                    "<tr><td style=\"padding:10px 16px;font-weight:600;\">{name}</td>\
                     <td style=\"padding:10px 16px;text-align:right;\">{}</td>\
                     <td style=\"padding:10px 16px;text-align:right;\">{}</td>\
                     <td style=\"padding:10px 16px;text-align:right;\">{}</td>\
                     <td style=\"padding:10px 16px;text-align:right;font-weight:700;color:{};\">{:.1}%</td></tr>",
                    format_mxn(figures.total_loans),
                    format_mxn(figures.performing_loans),
                    format_mxn(figures.non_performing_loans),
                    imora_color(figures.imora),
                    figures.imora,
                )
                .expect("write figures row");
            }
            None => {
                writeln!(
                    rows,
                    "<tr><td style=\"padding:10px 16px;font-weight:600;\">{name}</td>\
                     <td colspan=\"4\" style=\"padding:10px 16px;color:#6b7280;\">figures not published in listing</td></tr>"
                )
                .expect("write placeholder row");
            }
        }
    }

    let mut html = String::new();
    writeln!(
        html,
        "<div style=\"font-family:'Segoe UI',Arial,sans-serif;max-width:700px;margin:0 auto;\">"
    )
    .expect("open container");
    writeln!(
        html,
        "<div style=\"background:#1a1a2e;padding:24px 30px;\"><h1 style=\"color:#fff;font-size:20px;margin:0;\">CONDUSEF SOFIPO Data Update</h1>\
         <p style=\"color:#9ca3af;font-size:13px;margin:4px 0 0;\">New credit portfolio data available</p></div>"
    )
    .expect("write header");
    writeln!(
        html,
        "<div style=\"padding:24px 30px;\"><p>New monthly data for <strong>{}</strong> has been published on CONDUSEF for the tracked SOFIPOs.</p>",
        escape_html(&period.label())
    )
    .expect("write intro");
    writeln!(
        html,
        "<table style=\"width:100%;border-collapse:collapse;font-size:13px;\"><thead><tr style=\"background:#1a1a2e;color:#fff;\">\
         <th style=\"text-align:left;padding:12px 16px;\">Entity</th><th style=\"padding:12px 16px;\">Total Loans</th>\
         <th style=\"padding:12px 16px;\">Performing</th><th style=\"padding:12px 16px;\">Non-Performing</th>\
         <th style=\"padding:12px 16px;\">IMORA</th></tr></thead><tbody>"
    )
    .expect("write table head");
    html.push_str(&rows);
    html.push_str("</tbody></table>");
    writeln!(
        html,
        "<p style=\"color:#6b7280;font-size:12px;margin-top:24px;\">Source: <a href=\"{SOURCE_URL}\">registros.condusef.gob.mx</a> (Section 27, SOFIPOs).<br>\
         This is an automated alert from the CONDUSEF SOFIPO monitor.</p></div></div>"
    )
    .expect("write footer");

    html
}

/// MXN amount abbreviated to billions, millions, or thousands.
pub(crate) fn format_mxn(amount: i64) -> String {
    let value = amount as f64;
    if value >= 1e9 {
        format!("${:.1}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.1}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.1}K", value / 1e3)
    } else {
        format!("${amount}")
    }
}

fn imora_color(imora: f64) -> &'static str {
    if imora < 10.0 {
        "#059669"
    } else if imora < 20.0 {
        "#d97706"
    } else {
        "#dc2626"
    }
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
