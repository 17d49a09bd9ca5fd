//! Turns manual category corrections into keyword rules.
//!
//! When a reviewer moves a transaction to another category, its details text
//! becomes a keyword of that category, so the next statement containing the
//! same details is filed there automatically. Rules are only ever added.

use serde::{Deserialize, Serialize};
use sift_core::{CategoryError, Transaction};
use sift_storage::{RuleStore, RuleStoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LearnError {
    #[error(transparent)]
    Rules(#[from] RuleStoreError),
    #[error("No transaction at row {0}")]
    NoSuchRow(usize),
}

/// A reviewer's category choice for the record at `row` (0-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEdit {
    pub row: usize,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Learned {
    Unchanged,
    Recategorized {
        from: String,
        to: String,
        keyword_added: bool,
    },
}

/// Applies one correction to `tx` and records its details as a keyword of
/// the new category.
///
/// An unknown category is rejected before `tx` is touched.
pub fn learn_from_edit(
    tx: &mut Transaction,
    new_category: &str,
    store: &mut RuleStore,
) -> Result<Learned, RuleStoreError> {
    if tx.category == new_category {
        return Ok(Learned::Unchanged);
    }
    if !store.contains(new_category) {
        return Err(CategoryError::UnknownCategory(new_category.to_string()).into());
    }

    let from = std::mem::replace(&mut tx.category, new_category.to_string());
    let keyword_added = store.add_keyword(new_category, &tx.details)?;
    tracing::debug!(
        details = %tx.details,
        from = %from,
        to = new_category,
        keyword_added,
        "transaction recategorized"
    );

    Ok(Learned::Recategorized {
        from,
        to: new_category.to_string(),
        keyword_added,
    })
}

/// Applies `edits` in order. The first failing edit stops the run; edits
/// before it stay applied.
pub fn reconcile(
    records: &mut [Transaction],
    edits: &[CategoryEdit],
    store: &mut RuleStore,
) -> Result<Vec<Learned>, LearnError> {
    let mut outcomes = Vec::with_capacity(edits.len());
    for edit in edits {
        let tx = records
            .get_mut(edit.row)
            .ok_or(LearnError::NoSuchRow(edit.row))?;
        outcomes.push(learn_from_edit(tx, &edit.category, store)?);
    }
    Ok(outcomes)
}

/// Rows whose category differs between the original and the edited table.
pub fn edits_between(original: &[Transaction], edited: &[Transaction]) -> Vec<CategoryEdit> {
    original
        .iter()
        .zip(edited)
        .enumerate()
        .filter(|(_, (before, after))| before.category != after.category)
        .map(|(row, (_, after))| CategoryEdit {
            row,
            category: after.category.clone(),
        })
        .collect()
}
