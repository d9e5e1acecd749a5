//! Presentation-time formatting. Values are rounded here and nowhere else.

use crate::pipeline::YearOverYear;

/// Placeholder for a KPI that cannot be computed.
pub const NOT_APPLICABLE: &str = "N/A";

/// Whole-dollar amount with thousands separators: `$12,346`, `-$1,200`.
pub fn format_currency(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let rounded = v.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded }; // normalize `-0.0`
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(rounded.abs() as u64))
}

/// Integer with thousands separators: `1,234,567`.
pub fn format_count(n: u64) -> String {
    group_thousands(n)
}

/// One-decimal percentage, or [`NOT_APPLICABLE`].
pub fn format_percent(v: Option<f64>) -> String {
    match v {
        Some(p) if p.is_finite() => format!("{p:.1}%"),
        _ => NOT_APPLICABLE.to_string(),
    }
}

/// Sales YoY as shown on the KPI card.
pub fn format_yoy(yoy: Option<&YearOverYear>) -> String {
    format_percent(yoy.map(|y| y.percent))
}

/// `"{rows} rows × {columns} columns"`.
pub fn format_dimensions((rows, columns): (usize, usize)) -> String {
    format!("{rows} rows × {columns} columns")
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
