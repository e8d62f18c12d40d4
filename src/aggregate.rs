//! Chart aggregations over an already filtered dataset.
//!
//! Both transforms are pure: they read the dataset and build a fresh chart
//! value, so calling them twice with the same input gives equal output.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::category::Category;
use crate::dataset::Dataset;
use crate::error::DashResult;

pub const DEFAULT_TOP_N: usize = 20;
pub const DEFAULT_MULTI_VALUE_DELIMITER: char = ';';

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Top labels of one multi-valued column, smallest count first.
pub type TopCounts = Vec<LabelCount>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopChart {
    pub category: Category,
    pub n: usize,
    pub title: String,
    pub have_worked_with: TopCounts,
    pub want_to_work_with: TopCounts,
}

impl TopChart {
    pub fn empty(category: &Category, n: usize) -> Self {
        TopChart {
            category: category.clone(),
            n,
            title: top_chart_title(category, n),
            have_worked_with: Vec::new(),
            want_to_work_with: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.have_worked_with.is_empty() && self.want_to_work_with.is_empty()
    }
}

pub fn top_chart_title(category: &Category, n: usize) -> String {
    format!("Top {} {} Want to Work With vs. Have Worked With", n, category)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryChart {
    pub column: String,
    pub title: String,
    pub counts: BTreeMap<String, usize>,
}

impl CountryChart {
    pub fn empty(column: &str) -> Self {
        CountryChart {
            column: column.to_string(),
            title: country_chart_title(column),
            counts: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Entries by descending count, ties alphabetical.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

pub fn country_chart_title(column: &str) -> String {
    format!("Distribution of Survey Respondents by {}", column)
}

/// Counts every atomic label across `cells`, in first-encountered order.
/// A label repeated within one cell counts once for that row.
fn count_labels<'a, I>(cells: I, delimiter: char) -> Vec<LabelCount>
where
    I: Iterator<Item = Option<&'a str>>,
{
    let mut counts = Vec::<LabelCount>::new();
    let mut positions = HashMap::<&'a str, usize>::new();
    for cell in cells.flatten() {
        let mut in_row = HashSet::new();
        for label in cell.split(delimiter).filter(|l| !l.is_empty()) {
            if !in_row.insert(label) {
                continue;
            }
            match positions.get(label) {
                Some(&pos) => counts[pos].count += 1,
                None => {
                    positions.insert(label, counts.len());
                    counts.push(LabelCount {
                        label: label.to_string(),
                        count: 1,
                    });
                }
            }
        }
    }
    counts
}

/// Keeps the `n` largest counts and returns them in ascending order. Both
/// sorts are stable, so ties stay in first-encountered order.
fn top_n(mut counts: Vec<LabelCount>, n: usize) -> TopCounts {
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(n);
    counts.sort_by_key(|c| c.count);
    counts
}

fn top_of_column(dataset: &Dataset, column: &str, n: usize, delimiter: char) -> DashResult<TopCounts> {
    let cells = dataset.cells(column)?;
    Ok(top_n(count_labels(cells, delimiter), n))
}

/// Builds the "have worked with" vs "want to work with" chart for one
/// category. A category whose columns are not in the schema gives an empty
/// chart; a missing `WantToWorkWith` column gives an empty right series.
pub fn top_by_category(dataset: &Dataset, category: &Category, n: usize, delimiter: char) -> TopChart {
    let mut chart = TopChart::empty(category, n);
    let have_column = category.have_worked_with_column();
    if !dataset.has_column(&have_column) {
        return chart;
    }
    chart.have_worked_with = top_of_column(dataset, &have_column, n, delimiter).unwrap_or_default();
    chart.want_to_work_with =
        top_of_column(dataset, &category.want_to_work_with_column(), n, delimiter).unwrap_or_default();
    chart
}

/// Respondents per distinct value of `column`. Rows with no value are left
/// out; countries with no rows do not appear.
pub fn count_by_country(dataset: &Dataset, column: &str) -> DashResult<CountryChart> {
    let mut chart = CountryChart::empty(column);
    for country in dataset.cells(column)?.flatten() {
        *chart.counts.entry(country.to_string()).or_insert(0) += 1;
    }
    Ok(chart)
}
