//! The category → keyword rule model.
//!
//! A [`CategoryMap`] keeps categories in insertion order; that order is the
//! order the matcher visits them in, so it is preserved through
//! (de)serialization as well.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Fallback category. Always present, never carries keywords.
pub const GENERAL: &str = "General";

/// Lowercase + trim, applied to keywords and details before comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),
    #[error("Category already exists: '{0}'")]
    AlreadyExists(String),
    #[error("Category name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// Trimmed keywords in the order they were learned. No two share a
    /// normalized form; the first spelling seen is the one kept.
    pub keywords: Vec<String>,
}

impl Category {
    fn new(name: &str) -> Self {
        Category {
            name: name.to_string(),
            keywords: Vec::new(),
        }
    }

    pub fn is_general(&self) -> bool {
        self.name == GENERAL
    }

    /// Whether a keyword with the same normalized form is already stored.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        let wanted = normalize(keyword);
        self.keywords.iter().any(|k| normalize(k) == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    categories: Vec<Category>,
}

impl Default for CategoryMap {
    fn default() -> Self {
        CategoryMap {
            categories: vec![Category::new(GENERAL)],
        }
    }
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from stored entries, repairing anything that would break
    /// the model: "General" is added first when missing and stripped of
    /// keywords, repeated category names are merged and repeated keywords
    /// collapse to one.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut map = CategoryMap { categories: Vec::new() };

        for (name, keywords) in entries {
            let idx = match map.position(&name) {
                Some(idx) => idx,
                None => {
                    map.categories.push(Category::new(&name));
                    map.categories.len() - 1
                }
            };
            let category = &mut map.categories[idx];

            if category.is_general() {
                if !keywords.is_empty() {
                    tracing::warn!(
                        count = keywords.len(),
                        "dropping keywords stored under the fallback category"
                    );
                }
                continue;
            }

            for keyword in keywords {
                if !category.has_keyword(&keyword) {
                    category.keywords.push(keyword);
                }
            }
        }

        if !map.contains(GENERAL) {
            map.categories.insert(0, Category::new(GENERAL));
        }

        map
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Categories in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn keywords(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|c| c.keywords.as_slice())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Adds an empty category. The stored name is the trimmed input.
    pub fn add_category(&mut self, name: &str) -> Result<(), CategoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryError::EmptyName);
        }
        if self.contains(name) {
            return Err(CategoryError::AlreadyExists(name.to_string()));
        }
        self.categories.push(Category::new(name));
        Ok(())
    }

    /// Adds a trimmed keyword to `category`.
    ///
    /// Returns `Ok(false)` when nothing changed: the keyword was blank, was
    /// already present in any letter case, or the target is the fallback
    /// category.
    pub fn add_keyword(&mut self, category: &str, keyword: &str) -> Result<bool, CategoryError> {
        let idx = self
            .position(category)
            .ok_or_else(|| CategoryError::UnknownCategory(category.to_string()))?;
        let entry = &mut self.categories[idx];

        let keyword = keyword.trim();
        if keyword.is_empty() || entry.is_general() || entry.has_keyword(keyword) {
            return Ok(false);
        }

        entry.keywords.push(keyword.to_string());
        Ok(true)
    }

    /// Normalized keywords that appear under more than one category, with
    /// the categories in visiting order. The last of them wins a match.
    pub fn ambiguous_keywords(&self) -> Vec<(String, Vec<String>)> {
        let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for category in self.categories.iter().filter(|c| !c.is_general()) {
            for keyword in &category.keywords {
                let names = owners.entry(normalize(keyword)).or_default();
                if !names.contains(&category.name) {
                    names.push(category.name.clone());
                }
            }
        }

        owners.into_iter().filter(|(_, names)| names.len() > 1).collect()
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(&category.name, &category.keywords)?;
        }
        map.end()
    }
}

struct CategoryMapVisitor;

impl<'de> Visitor<'de> for CategoryMapVisitor {
    type Value = CategoryMap;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping category names to keyword arrays")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CategoryMap, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, keywords)) = access.next_entry::<String, Vec<String>>()? {
            entries.push((name, keywords));
        }
        Ok(CategoryMap::from_entries(entries))
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(CategoryMapVisitor)
    }
}
