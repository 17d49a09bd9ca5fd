use sift_core::{Money, StatementReport};
use std::fmt::Write;

use crate::commands::{CategoryView, RowView};

/// `1234567.8` → `1,234,567.80`, followed by the currency label if any.
pub fn format_amount(amount: Money, currency: Option<&str>) -> String {
    let text = amount.to_string();
    let (int_part, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match currency {
        Some(label) => format!("{sign}{grouped}.{frac} {label}"),
        None => format!("{sign}{grouped}.{frac}"),
    }
}

pub fn render_rows(title: &str, rows: &[RowView], currency: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    if rows.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }
    let width = rows.iter().map(|r| r.details.chars().count()).max().unwrap_or(0).max(7);
    let _ = writeln!(out, "  {:>4}  {:<10}  {:<width$}  {:>16}  Category", "Row", "Date", "Details", "Amount");
    for r in rows {
        let _ = writeln!(
            out,
            "  {:>4}  {:<10}  {:<width$}  {:>16}  {}",
            r.row,
            r.date,
            r.details,
            format_amount(r.amount, currency),
            r.category
        );
    }
    out
}

pub fn render_report(report: &StatementReport, currency: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Spending by category");
    if report.spending.is_empty() {
        let _ = writeln!(out, "  (no debits)");
    }
    let width = report
        .spending
        .iter()
        .map(|c| c.category.chars().count())
        .max()
        .unwrap_or(0)
        .max(8);
    for c in &report.spending {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>16}  {:>5}%  ({} txns)",
            c.category,
            format_amount(c.total, currency),
            c.share_of(report.total_debits).to_string(),
            c.count
        );
    }
    let _ = writeln!(out, "  {:<width$}  {:>16}", "Total", format_amount(report.total_debits, currency));
    let _ = writeln!(
        out,
        "\nPayments (credits): {} across {} txns",
        format_amount(report.total_credits, currency),
        report.credit_count
    );
    out
}

pub fn render_categories(categories: &[CategoryView]) -> String {
    let mut out = String::new();
    for c in categories {
        if c.keywords.is_empty() {
            let _ = writeln!(out, "{}", c.name);
        } else {
            let _ = writeln!(out, "{}: {}", c.name, c.keywords.join(" | "));
        }
    }
    out
}
