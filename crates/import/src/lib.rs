pub mod csv;
pub mod learn;
pub mod rules;

pub use crate::csv::{load_statement, load_statement_file, parse_statement, LoadError, StatementFormat};
pub use learn::{edits_between, learn_from_edit, reconcile, CategoryEdit, LearnError, Learned};
pub use rules::{assign, CategoryMatcher};
