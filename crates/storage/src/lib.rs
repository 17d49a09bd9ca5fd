pub mod rules;

pub use rules::{load, save, RuleStore, RuleStoreError};
