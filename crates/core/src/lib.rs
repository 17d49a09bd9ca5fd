pub mod categories;
pub mod money;
pub mod report;
pub mod transaction;

pub use categories::{normalize, Category, CategoryError, CategoryMap, GENERAL};
pub use money::Money;
pub use report::{filter_direction, summarize, total, total_for, CategoryTotal, StatementReport};
pub use transaction::{Direction, Transaction};
