use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One indicator column aligned 1:1 with a price series. `None` means "no value yet".
pub type IndicatorColumn = Vec<Option<f64>>;

/// Named indicator columns, all the same length as the source series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    len: usize,
    columns: BTreeMap<String, IndicatorColumn>,
}

impl IndicatorSet {
    /// Create an empty set for a series of `len` bars.
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Length of the series every column is aligned with.
    pub fn series_len(&self) -> usize {
        self.len
    }

    /// Insert a column. Columns of the wrong length are padded or cut to stay aligned.
    pub fn insert(&mut self, name: impl Into<String>, mut column: IndicatorColumn) {
        column.resize(self.len, None);
        self.columns.insert(name.into(), column);
    }

    /// Merge another set's columns into this one.
    pub fn extend(&mut self, other: IndicatorSet) {
        for (name, column) in other.columns {
            self.insert(name, column);
        }
    }

    pub fn get(&self, name: &str) -> Option<&IndicatorColumn> {
        self.columns.get(name)
    }

    /// Remove a column and return it.
    pub fn take(&mut self, name: &str) -> Option<IndicatorColumn> {
        self.columns.remove(name)
    }

    /// Value at `index`, if the column exists and is defined there.
    pub fn value_at(&self, name: &str, index: usize) -> Option<f64> {
        self.columns.get(name)?.get(index).copied().flatten()
    }

    /// Value at the final position of the series.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.value_at(name, self.len.checked_sub(1)?)
    }

    /// Index of the first defined value in a column.
    pub fn first_defined(&self, name: &str) -> Option<usize> {
        self.columns.get(name)?.iter().position(Option::is_some)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// True when no column holds any defined value.
    pub fn is_empty(&self) -> bool {
        self.columns.values().all(|c| c.iter().all(Option::is_none))
    }

    /// Latest value of every column, for report snapshots.
    pub fn snapshot(&self) -> BTreeMap<String, Option<f64>> {
        self.columns
            .keys()
            .map(|name| (name.clone(), self.latest(name)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_alignment() {
        let mut set = IndicatorSet::new(3);
        set.insert("A", vec![Some(1.0)]);
        set.insert("B", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(set.get("A").unwrap().len(), 3);
        assert_eq!(set.get("B").unwrap().len(), 3);
        assert_eq!(set.latest("B"), Some(3.0));
        assert_eq!(set.latest("A"), None);
    }

    #[test]
    fn test_empty_series_has_no_latest() {
        let mut set = IndicatorSet::new(0);
        set.insert("A", vec![]);
        assert_eq!(set.latest("A"), None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_first_defined() {
        let mut set = IndicatorSet::new(4);
        set.insert("A", vec![None, None, Some(2.0), Some(3.0)]);
        assert_eq!(set.first_defined("A"), Some(2));
        assert_eq!(set.first_defined("missing"), None);
    }
}
