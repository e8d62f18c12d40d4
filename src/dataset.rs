use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::error::{DashError, DashResult};

/// One survey response. Cells line up with the owning dataset's columns;
/// `None` marks a missing answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    cells: Vec<Option<String>>,
}

impl Record {
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Record { cells }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }
}

/// Immutable in-memory table. Filtering returns a new `Dataset` that shares
/// row storage with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Arc<[String]>,
    rows: Vec<Arc<Record>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Dataset {
            columns: columns.into(),
            rows: rows.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn rows(&self) -> impl Iterator<Item = &Record> + '_ {
        self.rows.iter().map(|r| r.as_ref())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn column_index(&self, column: &str) -> DashResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DashError::UnknownColumn(column.to_string()))
    }

    /// Values of one column, row by row.
    pub fn cells<'a>(
        &'a self,
        column: &str,
    ) -> DashResult<impl Iterator<Item = Option<&'a str>> + 'a> {
        let idx = self.column_index(column)?;
        Ok(self.rows.iter().map(move |r| r.get(idx)))
    }

    /// Distinct non-null values of `column` in first-seen order.
    pub fn distinct_values(&self, column: &str) -> DashResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for cell in self.cells(column)?.flatten() {
            if seen.insert(cell) {
                values.push(cell.to_string());
            }
        }
        Ok(values)
    }

    pub fn filter<F>(&self, predicate: F) -> Dataset
    where
        F: Fn(&Record) -> bool,
    {
        Dataset {
            columns: Arc::clone(&self.columns),
            rows: self
                .rows
                .iter()
                .filter(|r| {
                    let record: &Record = r;
                    predicate(record)
                })
                .cloned()
                .collect(),
        }
    }

    /// Rows whose `column` value is in `allowed`. An empty `allowed` set
    /// means no filter: the whole dataset is returned as is.
    pub fn filter_by_column_membership(
        &self,
        column: &str,
        allowed: &BTreeSet<String>,
    ) -> DashResult<Dataset> {
        let idx = self.column_index(column)?;
        if allowed.is_empty() {
            return Ok(self.clone());
        }
        Ok(self.filter(|r| r.get(idx).map_or(false, |v| allowed.contains(v))))
    }
}

#[cfg(test)]
pub(crate) fn dataset_from(columns: &[&str], rows: &[&[Option<&str>]]) -> Dataset {
    Dataset::new(
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|r| Record::new(r.iter().map(|c| c.map(str::to_string)).collect()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ages() -> Dataset {
        dataset_from(
            &["Age", "Country"],
            &[
                &[Some("Under 18"), Some("USA")],
                &[Some("25-34 years old"), Some("France")],
                &[Some("65 years or older"), None],
            ],
        )
    }

    #[test]
    fn test_columns_and_len() {
        let ds = ages();
        assert_eq!(ds.columns(), &["Age".to_string(), "Country".to_string()]);
        assert_eq!(ds.len(), 3);
        assert!(ds.has_column("Country"));
        assert!(!ds.has_column("country"));
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let ds = dataset_from(
            &["Country"],
            &[&[Some("USA")], &[Some("France")], &[None], &[Some("USA")]],
        );
        assert_eq!(ds.distinct_values("Country").unwrap(), vec!["USA", "France"]);
    }

    #[test]
    fn test_distinct_values_unknown_column() {
        let err = ages().distinct_values("Salary").unwrap_err();
        assert!(matches!(err, DashError::UnknownColumn(c) if c == "Salary"));
    }

    #[test]
    fn test_filter_single_age() {
        let allowed: BTreeSet<String> = ["Under 18".to_string()].into_iter().collect();
        let filtered = ages().filter_by_column_membership("Age", &allowed).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.rows().next().unwrap().get(1), Some("USA"));
    }

    #[test]
    fn test_empty_allowed_set_is_pass_through() {
        let ds = ages();
        let filtered = ds.filter_by_column_membership("Age", &BTreeSet::new()).unwrap();
        assert_eq!(filtered, ds);
    }

    #[test]
    fn test_filter_unknown_column_even_when_empty() {
        let err = ages()
            .filter_by_column_membership("Salary", &BTreeSet::new())
            .unwrap_err();
        assert!(matches!(err, DashError::UnknownColumn(_)));
    }

    #[test]
    fn test_null_cells_never_match() {
        let allowed: BTreeSet<String> = ["USA".to_string(), "France".to_string()].into();
        let filtered = ages().filter_by_column_membership("Country", &allowed).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_does_not_touch_source() {
        let ds = ages();
        let allowed: BTreeSet<String> = ["France".to_string()].into();
        let _ = ds.filter_by_column_membership("Country", &allowed).unwrap();
        assert_eq!(ds.len(), 3);
    }
}
