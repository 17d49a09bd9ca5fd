use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use sift_core::{Money, StatementReport, Transaction};
use sift_import::{load_statement_file, reconcile, CategoryEdit, Learned, StatementFormat};
use sift_storage::RuleStore;
use std::path::Path;

/// Everything a command needs: the rule store and how statements look.
pub struct Session {
    pub store: RuleStore,
    pub format: StatementFormat,
}

impl Session {
    pub fn new(store: RuleStore, format: StatementFormat) -> Self {
        Self { store, format }
    }

    fn load(&self, path: &Path) -> Result<Vec<Transaction>> {
        for (keyword, owners) in self.store.ambiguous_keywords() {
            tracing::warn!(
                "keyword '{keyword}' is in several categories ({}); '{}' wins",
                owners.join(", "),
                owners.last().map(String::as_str).unwrap_or_default()
            );
        }
        load_statement_file(path, &self.format, self.store.rules())
            .with_context(|| format!("There was an error processing {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    /// 1-based position among rows of the same direction.
    pub row: usize,
    pub date: String,
    pub details: String,
    pub amount: Money,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementView {
    pub debits: Vec<RowView>,
    pub credits: Vec<RowView>,
    pub report: StatementReport,
}

impl StatementView {
    fn build(records: &[Transaction]) -> Self {
        let rows = |debit: bool| -> Vec<RowView> {
            records
                .iter()
                .filter(|tx| tx.is_debit() == debit)
                .enumerate()
                .map(|(idx, tx)| RowView {
                    row: idx + 1,
                    date: tx.date.format("%d/%m/%Y").to_string(),
                    details: tx.details.clone(),
                    amount: tx.amount,
                    category: tx.category.clone(),
                })
                .collect()
        };
        StatementView {
            debits: rows(true),
            credits: rows(false),
            report: StatementReport::build(records),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub keywords: Vec<String>,
}

pub fn import_statement(session: &Session, path: &Path) -> Result<StatementView> {
    let records = session.load(path)?;
    Ok(StatementView::build(&records))
}

pub fn list_categories(session: &Session) -> Vec<CategoryView> {
    session
        .store
        .categories()
        .map(|c| CategoryView {
            name: c.name.clone(),
            keywords: c.keywords.clone(),
        })
        .collect()
}

pub fn add_category(session: &mut Session, name: &str) -> Result<()> {
    session
        .store
        .add_category(name)
        .with_context(|| format!("Could not add category '{}'", name.trim()))
}

pub fn add_keyword(session: &mut Session, category: &str, keyword: &str) -> Result<bool> {
    session
        .store
        .add_keyword(category, keyword)
        .with_context(|| format!("Could not add keyword to '{category}'"))
}

/// A `ROW=CATEGORY` pair from the command line; `row` counts debit rows
/// from 1 as printed by `import`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEdit {
    pub row: usize,
    pub category: String,
}

pub fn parse_row_edit(s: &str) -> Result<RowEdit, String> {
    let (row, category) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROW=CATEGORY, got '{s}'"))?;
    let row: usize = row
        .trim()
        .parse()
        .map_err(|_| format!("invalid row number '{}'", row.trim()))?;
    if row == 0 {
        return Err("rows are numbered from 1".to_string());
    }
    let category = category.trim();
    if category.is_empty() {
        return Err("category must not be empty".to_string());
    }
    Ok(RowEdit {
        row,
        category: category.to_string(),
    })
}

/// Loads the statement, applies the reviewer's corrections to its debit
/// rows and learns a keyword from each one.
pub fn recategorize(
    session: &mut Session,
    path: &Path,
    changes: &[RowEdit],
) -> Result<(Vec<Learned>, StatementView)> {
    if changes.is_empty() {
        bail!("Nothing to change; pass --set ROW=CATEGORY");
    }

    let mut records = session.load(path)?;
    let debit_rows: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, tx)| tx.is_debit())
        .map(|(idx, _)| idx)
        .collect();

    let edits = changes
        .iter()
        .map(|change| {
            change
                .row
                .checked_sub(1)
                .and_then(|idx| debit_rows.get(idx))
                .map(|&row| CategoryEdit {
                    row,
                    category: change.category.clone(),
                })
                .ok_or_else(|| anyhow!("No debit row {} in {}", change.row, path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let outcomes = reconcile(&mut records, &edits, &mut session.store)
        .context("Could not save category changes")?;
    Ok((outcomes, StatementView::build(&records)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::GENERAL;
    use std::fs;

    const STATEMENT: &str = "Date,Details,Amount,Debit/Credit\n\
        05 Jan 2024,STARBUCKS #123,4.50,Debit\n\
        06 Jan 2024,PAYROLL,\"2,000.00\",Credit\n\
        07 Jan 2024,TESCO,20.00,Debit\n";

    fn session_in(dir: &tempfile::TempDir) -> (Session, std::path::PathBuf) {
        let csv = dir.path().join("statement.csv");
        fs::write(&csv, STATEMENT).unwrap();
        let store = RuleStore::open(dir.path().join("categories.json")).unwrap();
        (Session::new(store, StatementFormat::default()), csv)
    }

    #[test]
    fn import_numbers_rows_per_direction() {
        let dir = tempfile::tempdir().unwrap();
        let (session, csv) = session_in(&dir);
        let view = import_statement(&session, &csv).unwrap();

        assert_eq!(view.debits.len(), 2);
        assert_eq!(view.debits[1].row, 2);
        assert_eq!(view.debits[1].details, "TESCO");
        assert_eq!(view.debits[0].date, "05/01/2024");
        assert_eq!(view.credits[0].row, 1);
        assert_eq!(view.report.total_credits, Money::from_cents(200000));
    }

    #[test]
    fn import_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _) = session_in(&dir);
        let err = import_statement(&session, &dir.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn recategorize_learns_from_debit_row() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, csv) = session_in(&dir);
        add_category(&mut session, "Coffee").unwrap();

        let changes = vec![parse_row_edit("1=Coffee").unwrap()];
        let (outcomes, view) = recategorize(&mut session, &csv, &changes).unwrap();
        assert!(matches!(outcomes[0], Learned::Recategorized { keyword_added: true, .. }));
        assert_eq!(view.debits[0].category, "Coffee");

        let fresh = import_statement(&session, &csv).unwrap();
        assert_eq!(fresh.debits[0].category, "Coffee");
        assert_eq!(fresh.debits[1].category, GENERAL);
    }

    #[test]
    fn recategorize_rejects_out_of_range_row() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, csv) = session_in(&dir);
        add_category(&mut session, "Coffee").unwrap();
        let changes = vec![RowEdit { row: 3, category: "Coffee".to_string() }];
        assert!(recategorize(&mut session, &csv, &changes).is_err());
    }

    #[test]
    fn parse_row_edit_validates_input() {
        assert_eq!(
            parse_row_edit(" 2 = Eating Out ").unwrap(),
            RowEdit { row: 2, category: "Eating Out".to_string() }
        );
        assert!(parse_row_edit("Coffee").is_err());
        assert!(parse_row_edit("0=Coffee").is_err());
        assert!(parse_row_edit("x=Coffee").is_err());
        assert!(parse_row_edit("1=").is_err());
    }

    #[test]
    fn list_categories_in_store_order() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session_in(&dir);
        add_category(&mut session, "Rent").unwrap();
        assert!(add_keyword(&mut session, "Rent", "LANDLORD LTD").unwrap());

        let names: Vec<_> = list_categories(&session).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec![GENERAL, "Rent"]);
        assert!(add_keyword(&mut session, "Missing", "x").is_err());
    }
}
