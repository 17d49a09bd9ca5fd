use sift_core::{normalize, CategoryMap, Transaction, GENERAL};
use std::collections::HashSet;

/// Internal pairing of a category with its normalized keyword set.
struct CompiledCategory<'a> {
    name: &'a str,
    keywords: HashSet<String>,
}

/// Assigns categories by exact (normalized) keyword match.
///
/// Categories are visited in rule-store order and a later match overwrites
/// an earlier one, so when details match keywords of two categories the one
/// inserted last wins. "General" and categories without keywords are never
/// matched.
pub struct CategoryMatcher<'a> {
    categories: Vec<CompiledCategory<'a>>,
}

impl<'a> CategoryMatcher<'a> {
    pub fn new(rules: &'a CategoryMap) -> Self {
        let categories = rules
            .iter()
            .filter(|c| !c.is_general() && !c.keywords.is_empty())
            .map(|c| CompiledCategory {
                name: &c.name,
                keywords: c.keywords.iter().map(|k| normalize(k)).collect(),
            })
            .collect();
        Self { categories }
    }

    /// Every category whose keywords match `details`, in visiting order.
    pub fn matching_categories(&self, details: &str) -> Vec<&'a str> {
        let details = normalize(details);
        self.categories
            .iter()
            .filter(|c| c.keywords.contains(&details))
            .map(|c| c.name)
            .collect()
    }

    pub fn categorize(&self, details: &str) -> &'a str {
        self.matching_categories(details)
            .last()
            .copied()
            .unwrap_or(GENERAL)
    }

    /// Returns the records with their category recomputed from scratch.
    pub fn assign(&self, transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions
            .into_iter()
            .map(|tx| {
                let matches = self.matching_categories(&tx.details);
                if matches.len() > 1 {
                    tracing::debug!(
                        details = %tx.details,
                        candidates = ?matches,
                        "details match several categories; the last one wins"
                    );
                }
                let category = matches.last().copied().unwrap_or(GENERAL);
                tx.with_category(category)
            })
            .collect()
    }
}

/// Categorized copies of `transactions`; the input is left as it was.
pub fn assign(transactions: &[Transaction], rules: &CategoryMap) -> Vec<Transaction> {
    CategoryMatcher::new(rules).assign(transactions.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sift_core::{Direction, Money};

    fn make_tx(details: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            details,
            Money::from_cents(500),
            Direction::Debit,
        )
    }

    fn make_rules(raw: &[(&str, &[&str])]) -> CategoryMap {
        let mut rules = CategoryMap::new();
        for (name, keywords) in raw {
            rules.add_category(name).unwrap();
            for kw in *keywords {
                rules.add_keyword(name, kw).unwrap();
            }
        }
        rules
    }

    fn categories(txs: &[Transaction]) -> Vec<&str> {
        txs.iter().map(|t| t.category.as_str()).collect()
    }

    #[test]
    fn exact_match_assigns_category() {
        let rules = make_rules(&[("Food", &["Tesco Stores"])]);
        let txs = assign(&[make_tx("TESCO STORES"), make_tx("ALDI")], &rules);
        assert_eq!(categories(&txs), vec!["Food", GENERAL]);
    }

    #[test]
    fn substring_is_not_a_match() {
        let rules = make_rules(&[("Food", &["tesco"])]);
        let matcher = CategoryMatcher::new(&rules);
        assert_eq!(matcher.categorize("TESCO STORES 1234"), GENERAL);
        assert_eq!(matcher.categorize("  tesco\t"), "Food");
    }

    #[test]
    fn later_category_overwrites_earlier_match() {
        let rules = make_rules(&[("Food", &["tesco"]), ("Fuel", &["TESCO"]), ("Rent", &["landlord"])]);
        let matcher = CategoryMatcher::new(&rules);
        assert_eq!(matcher.matching_categories("Tesco"), vec!["Food", "Fuel"]);
        assert_eq!(matcher.categorize("Tesco"), "Fuel");
    }

    #[test]
    fn empty_categories_are_skipped() {
        let rules = make_rules(&[("Food", &["tesco"]), ("Empty", &[])]);
        let matcher = CategoryMatcher::new(&rules);
        assert_eq!(matcher.categories.len(), 1);
        assert_eq!(matcher.categorize(""), GENERAL);
    }

    #[test]
    fn assign_resets_previous_categories() {
        let rules = make_rules(&[("Food", &["tesco"])]);
        let stale = make_tx("ALDI").with_category("Food");
        let txs = assign(&[stale], &rules);
        assert_eq!(txs[0].category, GENERAL);
    }

    #[test]
    fn assign_is_idempotent_and_pure() {
        let rules = make_rules(&[("Food", &["tesco"]), ("Coffee", &["starbucks #123"])]);
        let input = vec![make_tx("tesco"), make_tx("STARBUCKS #123"), make_tx("unknown")];

        let once = assign(&input, &rules);
        let twice = assign(&once, &rules);
        assert_eq!(once, twice);
        assert!(input.iter().all(|t| t.category == GENERAL));
        assert_eq!(categories(&once), vec!["Food", "Coffee", GENERAL]);
    }

    #[test]
    fn default_rules_leave_everything_general() {
        let rules = CategoryMap::new();
        let txs = assign(&[make_tx("General"), make_tx("")], &rules);
        assert_eq!(categories(&txs), vec![GENERAL, GENERAL]);
    }
}
