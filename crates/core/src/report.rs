use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

use super::money::Money;
use super::transaction::{Direction, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
    pub count: usize,
}

impl CategoryTotal {
    /// Percentage of `grand_total` this category accounts for, to one decimal.
    pub fn share_of(&self, grand_total: Money) -> Decimal {
        self.total
            .as_decimal()
            .checked_div(grand_total.as_decimal())
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(|share| share.round_dp(1))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Groups by category and sums amounts, largest total first.
/// Equal totals are ordered by category name.
pub fn summarize<'a, I>(transactions: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut groups: HashMap<&str, (Money, usize)> = HashMap::new();
    for tx in transactions {
        let entry = groups.entry(tx.category.as_str()).or_insert((Money::zero(), 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category: category.to_string(),
            total,
            count,
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    totals
}

pub fn total<'a, I>(transactions: I) -> Money
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions.into_iter().map(|tx| tx.amount).sum()
}

pub fn filter_direction(
    transactions: &[Transaction],
    direction: Direction,
) -> impl Iterator<Item = &Transaction> {
    transactions.iter().filter(move |tx| tx.direction == direction)
}

pub fn total_for(transactions: &[Transaction], direction: Direction) -> Money {
    total(filter_direction(transactions, direction))
}

/// Spending breakdown over debits plus the credit total of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub spending: Vec<CategoryTotal>,
    pub total_debits: Money,
    pub total_credits: Money,
    pub credit_count: usize,
}

impl StatementReport {
    pub fn build(transactions: &[Transaction]) -> Self {
        let spending = summarize(filter_direction(transactions, Direction::Debit));
        let total_debits = spending.iter().map(|c| c.total).sum();
        StatementReport {
            spending,
            total_debits,
            total_credits: total_for(transactions, Direction::Credit),
            credit_count: filter_direction(transactions, Direction::Credit).count(),
        }
    }
}
