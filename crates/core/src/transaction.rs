use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::categories::GENERAL;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Debit,
    Credit,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Debit => write!(f, "Debit"),
            Direction::Credit => write!(f, "Credit"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Debit" => Ok(Direction::Debit),
            "Credit" => Ok(Direction::Credit),
            other => Err(format!("Unknown direction: '{other}'")),
        }
    }
}

/// One statement row after loading. `category` is always a rule-store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub details: String,
    pub amount: Money,
    pub direction: Direction,
    pub category: String,
}

impl Transaction {
    /// New record filed under the fallback category.
    pub fn new(date: NaiveDate, details: &str, amount: Money, direction: Direction) -> Self {
        Transaction {
            date,
            details: details.to_string(),
            amount,
            direction,
            category: GENERAL.to_string(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn is_debit(&self) -> bool {
        self.direction == Direction::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }
}
