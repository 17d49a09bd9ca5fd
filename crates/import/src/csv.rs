use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sift_core::{CategoryMap, Direction, Money, Transaction};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::rules::CategoryMatcher;

/// Column names and value formats of a statement export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementFormat {
    pub date_column: String,
    pub details_column: String,
    pub amount_column: String,
    pub direction_column: String,
    pub date_format: String,
    pub delimiter: String,
}

impl Default for StatementFormat {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            details_column: "Details".to_string(),
            amount_column: "Amount".to_string(),
            direction_column: "Debit/Credit".to_string(),
            date_format: "%d %b %Y".to_string(),
            delimiter: ",".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
    #[error("Invalid amount on line {line}: '{value}'")]
    InvalidAmount { line: u64, value: String },
    #[error("Invalid date on line {line}: '{value}'")]
    InvalidDate { line: u64, value: String },
    #[error("Invalid debit/credit marker on line {line}: '{value}'")]
    InvalidDirection { line: u64, value: String },
    #[error("Delimiter must be a single byte, got '{0}'")]
    InvalidDelimiter(String),
}

/// Header positions of the required columns.
struct Columns {
    date: usize,
    details: usize,
    amount: usize,
    direction: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, format: &StatementFormat) -> Result<Self, LoadError> {
        let find = |name: &str| {
            let name = name.trim();
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };
        Ok(Columns {
            date: find(&format.date_column)?,
            details: find(&format.details_column)?,
            amount: find(&format.amount_column)?,
            direction: find(&format.direction_column)?,
        })
    }
}

fn parse_amount(s: &str, line: u64) -> Result<Money, LoadError> {
    let invalid = || LoadError::InvalidAmount {
        line,
        value: s.to_string(),
    };
    let cleaned = s.trim().replace(',', "");
    let amount = Decimal::from_str(&cleaned).map_err(|_| invalid())?;
    let amount = Money::from_decimal(amount);
    if amount.is_negative() || amount > Money::MAX_ROW {
        return Err(invalid());
    }
    Ok(amount)
}

fn parse_date(s: &str, format: &str, line: u64) -> Result<NaiveDate, LoadError> {
    NaiveDate::parse_from_str(s.trim(), format).map_err(|_| LoadError::InvalidDate {
        line,
        value: s.to_string(),
    })
}

fn parse_direction(s: &str, line: u64) -> Result<Direction, LoadError> {
    Direction::from_str(s).map_err(|_| LoadError::InvalidDirection {
        line,
        value: s.to_string(),
    })
}

/// Parses every row into a [`Transaction`] filed under "General".
///
/// The first bad row aborts the whole parse.
pub fn parse_statement<R: Read>(
    data: R,
    format: &StatementFormat,
) -> Result<Vec<Transaction>, LoadError> {
    let delimiter = match format.delimiter.as_bytes() {
        [byte] => *byte,
        _ => return Err(LoadError::InvalidDelimiter(format.delimiter.clone())),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(data);

    let columns = Columns::resolve(reader.headers()?, format)?;
    let mut transactions = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |idx: usize| record.get(idx).unwrap_or_default();

        let date = parse_date(field(columns.date), &format.date_format, line)?;
        let amount = parse_amount(field(columns.amount), line)?;
        let direction = parse_direction(field(columns.direction), line)?;

        transactions.push(Transaction::new(date, field(columns.details), amount, direction));
    }

    Ok(transactions)
}

/// Parses a statement and assigns categories from `rules`.
pub fn load_statement<R: Read>(
    data: R,
    format: &StatementFormat,
    rules: &CategoryMap,
) -> Result<Vec<Transaction>, LoadError> {
    let parsed = parse_statement(data, format)?;
    let transactions = CategoryMatcher::new(rules).assign(parsed);
    tracing::info!(count = transactions.len(), "statement loaded");
    Ok(transactions)
}

pub fn load_statement_file(
    path: &Path,
    format: &StatementFormat,
    rules: &CategoryMap,
) -> Result<Vec<Transaction>, LoadError> {
    tracing::debug!("Reading statement {}", path.display());
    load_statement(File::open(path)?, format, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::GENERAL;

    const HEADER: &str = "Date,Details,Amount,Debit/Credit\n";

    fn parse(body: &str) -> Result<Vec<Transaction>, LoadError> {
        parse_statement(format!("{HEADER}{body}").as_bytes(), &StatementFormat::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_with_thousands_separator() {
        assert_eq!(parse_amount("1,234.50", 2).unwrap(), Money::from_cents(123450));
    }

    #[test]
    fn parse_amount_whole_and_padded() {
        assert_eq!(parse_amount(" 100 ", 2).unwrap(), Money::from_cents(10000));
        assert_eq!(parse_amount("1,000,000", 2).unwrap(), Money::from_cents(100_000_000));
    }

    #[test]
    fn parse_amount_rejects_garbage_and_negatives() {
        assert!(matches!(
            parse_amount("twelve", 7),
            Err(LoadError::InvalidAmount { line: 7, .. })
        ));
        assert!(parse_amount("", 2).is_err());
        assert!(parse_amount("-5.00", 2).is_err());
    }

    #[test]
    fn parse_amount_rejects_amounts_above_row_limit() {
        assert_eq!(parse_amount("1,000,000,000,000,000", 2).unwrap(), Money::MAX_ROW);
        assert!(parse_amount("1,000,000,000,000,000.01", 2).is_err());
        assert!(matches!(
            parse_amount("79,228,162,514,264,337,593,543,950,335", 4),
            Err(LoadError::InvalidAmount { line: 4, .. })
        ));
    }

    #[test]
    fn oversized_rows_fail_the_load_instead_of_the_report() {
        let row = "05 Jan 2024,TESCO,\"79,228,162,514,264,337,593,543,950,335\",Debit\n";
        let err = parse(&format!("{row}{row}")).unwrap_err();
        assert!(matches!(err, LoadError::InvalidAmount { line: 2, .. }));
    }

    // ── parse_date ────────────────────────────────────────────────────────────

    #[test]
    fn parse_date_day_abbrev_month_year() {
        assert_eq!(parse_date("05 Jan 2024", "%d %b %Y", 2).unwrap(), date(2024, 1, 5));
        assert_eq!(parse_date(" 31 Dec 2023 ", "%d %b %Y", 2).unwrap(), date(2023, 12, 31));
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert!(parse_date("2024-01-05", "%d %b %Y", 2).is_err());
        assert!(parse_date("05/01/2024", "%d %b %Y", 2).is_err());
        assert!(parse_date("30 Feb 2024", "%d %b %Y", 2).is_err());
    }

    // ── parse_statement ───────────────────────────────────────────────────────

    #[test]
    fn parse_statement_basic() {
        let txs = parse(
            "05 Jan 2024,TESCO STORES,\"1,234.50\",Debit\n06 Jan 2024,SALARY,2500.00,Credit\n",
        )
        .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].date, date(2024, 1, 5));
        assert_eq!(txs[0].details, "TESCO STORES");
        assert_eq!(txs[0].amount, Money::from_cents(123450));
        assert_eq!(txs[0].direction, Direction::Debit);
        assert_eq!(txs[1].direction, Direction::Credit);
        assert!(txs.iter().all(|t| t.category == GENERAL));
    }

    #[test]
    fn parse_statement_trims_headers_and_ignores_extra_columns() {
        let data = " Date , Details ,Balance, Amount ,Debit/Credit ,Ref\n\
                    05 Jan 2024,TESCO,900.00,12.00,Debit,A1\n";
        let txs = parse_statement(data.as_bytes(), &StatementFormat::default()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, Money::from_cents(1200));
    }

    #[test]
    fn parse_statement_missing_column() {
        let data = "Date,Details,Amount\n05 Jan 2024,TESCO,12.00\n";
        let err = parse_statement(data.as_bytes(), &StatementFormat::default()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Debit/Credit"));
    }

    #[test]
    fn parse_statement_aborts_on_first_bad_row() {
        let err = parse(
            "05 Jan 2024,TESCO,12.00,Debit\n06 Jan 2024,ALDI,n/a,Debit\n07 Jan 2024,LIDL,3.00,Debit\n",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidAmount { line: 3, ref value } if value == "n/a"));
    }

    #[test]
    fn parse_statement_bad_date_and_direction() {
        assert!(matches!(
            parse("2024-01-05,TESCO,12.00,Debit\n"),
            Err(LoadError::InvalidDate { line: 2, .. })
        ));
        assert!(matches!(
            parse("05 Jan 2024,TESCO,12.00,Refund\n"),
            Err(LoadError::InvalidDirection { line: 2, .. })
        ));
    }

    #[test]
    fn parse_statement_header_only_is_empty() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn parse_statement_custom_format() {
        let format = StatementFormat {
            date_column: "Posted".to_string(),
            details_column: "Description".to_string(),
            amount_column: "Value".to_string(),
            direction_column: "Type".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            delimiter: ";".to_string(),
        };
        let data = "Posted;Description;Value;Type\n2024-01-05;TESCO;1,50;Debit\n";
        // Comma is a thousands separator, so "1,50" reads as 150.
        let txs = parse_statement(data.as_bytes(), &format).unwrap();
        assert_eq!(txs[0].amount, Money::from_cents(15000));
        assert_eq!(txs[0].date, date(2024, 1, 5));
    }

    #[test]
    fn parse_statement_rejects_bad_delimiter() {
        let data = format!("{HEADER}05 Jan 2024,TESCO,12.00,Debit\n");
        for delimiter in ["", ";;", "→"] {
            let format = StatementFormat {
                delimiter: delimiter.to_string(),
                ..StatementFormat::default()
            };
            let err = parse_statement(data.as_bytes(), &format).unwrap_err();
            assert!(matches!(err, LoadError::InvalidDelimiter(ref d) if d == delimiter));
        }
    }

    // ── load_statement ────────────────────────────────────────────────────────

    #[test]
    fn load_statement_categorizes_rows() {
        let mut rules = CategoryMap::new();
        rules.add_category("Food").unwrap();
        rules.add_keyword("Food", "tesco stores").unwrap();

        let data = format!("{HEADER}05 Jan 2024, Tesco Stores ,12.00,Debit\n05 Jan 2024,ALDI,3.00,Debit\n");
        let txs = load_statement(data.as_bytes(), &StatementFormat::default(), &rules).unwrap();
        assert_eq!(txs[0].category, "Food");
        assert_eq!(txs[1].category, GENERAL);
    }
}
