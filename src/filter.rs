use std::collections::BTreeSet;

use serde::Serialize;

use crate::category::Category;

/// A subset of the fields of [`FilterState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet {
    pub category: bool,
    pub ages: bool,
}

impl FieldSet {
    pub const AGES: FieldSet = FieldSet { category: false, ages: true };
    pub const ALL: FieldSet = FieldSet { category: true, ages: true };

    pub fn intersects(&self, other: FieldSet) -> bool {
        (self.category && other.category) || (self.ages && other.ages)
    }

    pub fn is_empty(&self) -> bool {
        !self.category && !self.ages
    }
}

/// What the user has selected. Transitions build a new value; an empty age
/// set means every age passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterState {
    selected_category: Category,
    selected_ages: BTreeSet<String>,
}

impl FilterState {
    pub fn new(selected_category: Category) -> Self {
        FilterState {
            selected_category,
            selected_ages: BTreeSet::new(),
        }
    }

    pub fn selected_category(&self) -> &Category {
        &self.selected_category
    }

    pub fn selected_ages(&self) -> &BTreeSet<String> {
        &self.selected_ages
    }

    pub fn with_category(&self, category: Category) -> Self {
        FilterState {
            selected_category: category,
            selected_ages: self.selected_ages.clone(),
        }
    }

    pub fn with_ages<I, S>(&self, ages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterState {
            selected_category: self.selected_category.clone(),
            selected_ages: ages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn toggling_age(&self, raw: &str) -> Self {
        let mut ages = self.selected_ages.clone();
        if !ages.remove(raw) {
            ages.insert(raw.to_string());
        }
        FilterState {
            selected_category: self.selected_category.clone(),
            selected_ages: ages,
        }
    }

    pub fn changed_fields(&self, next: &FilterState) -> FieldSet {
        FieldSet {
            category: self.selected_category != next.selected_category,
            ages: self.selected_ages != next.selected_ages,
        }
    }
}
