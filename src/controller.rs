//! Filter state → chart recomputation.
//!
//! Each chart declares which filter fields it reads. When a new
//! [`FilterState`] arrives, only charts whose dependencies changed are
//! rebuilt, each from a dataset freshly filtered by the new state.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::age::{age_options, AgeOption};
use crate::aggregate::{
    count_by_country, top_by_category, CountryChart, TopChart, DEFAULT_MULTI_VALUE_DELIMITER,
    DEFAULT_TOP_N,
};
use crate::category::{derive_categories, Category};
use crate::dataset::Dataset;
use crate::error::{DashError, DashResult};
use crate::filter::{FieldSet, FilterState};
use crate::presenter::{Controls, Presenter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Output {
    TopChart,
    CountryChart,
}

impl Output {
    pub const ALL: [Output; 2] = [Output::TopChart, Output::CountryChart];

    pub fn depends_on(&self) -> FieldSet {
        match self {
            Output::TopChart => FieldSet::ALL,
            Output::CountryChart => FieldSet::AGES,
        }
    }
}

/// Outputs rebuilt by one state transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recomputed(Vec<Output>);

impl Recomputed {
    pub fn all() -> Self {
        Recomputed(Output::ALL.to_vec())
    }

    pub fn contains(&self, output: Output) -> bool {
        self.0.contains(&output)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn outputs(&self) -> &[Output] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub top_n: usize,
    pub multi_value_delimiter: char,
    pub age_column: String,
    pub country_column: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        ChartSettings {
            top_n: DEFAULT_TOP_N,
            multi_value_delimiter: DEFAULT_MULTI_VALUE_DELIMITER,
            age_column: "Age".to_string(),
            country_column: "Country".to_string(),
        }
    }
}

pub struct Controller {
    dataset: Arc<Dataset>,
    settings: ChartSettings,
    categories: Vec<Category>,
    age_options: Vec<AgeOption>,
    state: FilterState,
    top_chart: TopChart,
    country_chart: CountryChart,
    last_recomputed: DateTime<Local>,
}

impl Controller {
    pub fn new(dataset: Arc<Dataset>, settings: ChartSettings) -> DashResult<Self> {
        let categories = derive_categories(dataset.columns())?;
        let age_options = match dataset.distinct_values(&settings.age_column) {
            Ok(values) => age_options(values),
            Err(e) => {
                warn!(error = %e, "age filter unavailable");
                Vec::new()
            }
        };
        let state = FilterState::new(categories[0].clone());
        info!(
            categories = categories.len(),
            age_options = age_options.len(),
            "dashboard controls derived"
        );

        let mut controller = Controller {
            top_chart: TopChart::empty(state.selected_category(), settings.top_n),
            country_chart: CountryChart::empty(&settings.country_column),
            dataset,
            settings,
            categories,
            age_options,
            state,
            last_recomputed: Local::now(),
        };
        let state = controller.state.clone();
        controller.recompute(&state, FieldSet::ALL);
        Ok(controller)
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn age_options(&self) -> &[AgeOption] {
        &self.age_options
    }

    #[cfg(test)]
    pub fn top_chart(&self) -> &TopChart {
        &self.top_chart
    }

    #[cfg(test)]
    pub fn country_chart(&self) -> &CountryChart {
        &self.country_chart
    }

    pub fn last_recomputed(&self) -> DateTime<Local> {
        self.last_recomputed
    }

    pub fn controls(&self) -> Controls {
        Controls {
            categories: self.categories.clone(),
            selected_category: self.state.selected_category().clone(),
            age_options: self.age_options.clone(),
            selected_ages: self.state.selected_ages().iter().cloned().collect(),
        }
    }

    /// Replaces the filter state and rebuilds the charts that read a
    /// changed field.
    pub fn apply(&mut self, next: FilterState) -> Recomputed {
        let changed = self.state.changed_fields(&next);
        let recomputed = self.recompute(&next, changed);
        self.state = next;
        recomputed
    }

    fn recompute(&mut self, state: &FilterState, changed: FieldSet) -> Recomputed {
        if changed.is_empty() {
            return Recomputed::default();
        }
        let outputs: Vec<Output> = Output::ALL
            .into_iter()
            .filter(|o| o.depends_on().intersects(changed))
            .collect();
        if outputs.is_empty() {
            return Recomputed::default();
        }

        let filtered = self
            .dataset
            .filter_by_column_membership(&self.settings.age_column, state.selected_ages());
        if let Err(e) = &filtered {
            warn!(error = %e, "age filter failed; charts left empty");
        }

        for output in &outputs {
            match output {
                Output::TopChart => {
                    self.top_chart = match &filtered {
                        Ok(ds) => top_by_category(
                            ds,
                            state.selected_category(),
                            self.settings.top_n,
                            self.settings.multi_value_delimiter,
                        ),
                        Err(_) => TopChart::empty(state.selected_category(), self.settings.top_n),
                    };
                    if self.top_chart.have_worked_with.is_empty() {
                        debug!(category = %state.selected_category(), "top chart is empty");
                    }
                }
                Output::CountryChart => {
                    let column = &self.settings.country_column;
                    self.country_chart = match &filtered {
                        Ok(ds) => count_by_country(ds, column).unwrap_or_else(|e| {
                            warn!(error = %e, "country chart left empty");
                            CountryChart::empty(column)
                        }),
                        Err(_) => CountryChart::empty(column),
                    };
                }
            }
        }

        self.last_recomputed = Local::now();
        debug!(
            ?outputs,
            rows = filtered.as_ref().map(|d| d.len()).unwrap_or(0),
            "recomputed charts"
        );
        Recomputed(outputs)
    }

    pub fn select_category(&mut self, name: &str) -> DashResult<Recomputed> {
        let category = self
            .categories
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| DashError::UnknownCategory(name.to_string()))?;
        let next = self.state.with_category(category);
        Ok(self.apply(next))
    }

    pub fn next_category(&mut self) -> Recomputed {
        self.step_category(1)
    }

    pub fn previous_category(&mut self) -> Recomputed {
        self.step_category(self.categories.len() - 1)
    }

    fn step_category(&mut self, offset: usize) -> Recomputed {
        let current = self
            .categories
            .iter()
            .position(|c| c == self.state.selected_category())
            .unwrap_or(0);
        let idx = (current + offset) % self.categories.len();
        let next = self.state.with_category(self.categories[idx].clone());
        self.apply(next)
    }

    pub fn toggle_age(&mut self, raw: &str) -> Recomputed {
        if !self.age_options.iter().any(|o| o.value == raw) {
            warn!(age = raw, "age value not present in dataset");
        }
        let next = self.state.toggling_age(raw);
        self.apply(next)
    }

    pub fn set_ages<I, S>(&mut self, ages: I) -> Recomputed
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let next = self.state.with_ages(ages);
        self.apply(next)
    }

    pub fn clear_ages(&mut self) -> Recomputed {
        self.set_ages(Vec::<String>::new())
    }

    /// Pushes controls and the given outputs to a presenter.
    pub fn publish<P: Presenter>(&self, presenter: &mut P, outputs: &Recomputed) -> DashResult<()> {
        presenter.render_controls(&self.controls())?;
        if outputs.contains(Output::TopChart) {
            presenter.render_top_chart(&self.top_chart)?;
        }
        if outputs.contains(Output::CountryChart) {
            presenter.render_country_chart(&self.country_chart)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::dataset_from;

    fn survey() -> Arc<Dataset> {
        Arc::new(dataset_from(
            &[
                "Age",
                "Country",
                "LanguageHaveWorkedWith",
                "LanguageWantToWorkWith",
                "WebHaveWorkedWith",
            ],
            &[
                &[Some("Under 18"), Some("USA"), Some("Python;JS"), Some("Rust"), Some("React")],
                &[Some("25-34 years old"), Some("USA"), Some("Rust"), Some("Rust;Go"), None],
                &[Some("65 years or older"), Some("France"), Some("C"), None, Some("Django")],
            ],
        ))
    }

    fn controller() -> Controller {
        Controller::new(survey(), ChartSettings::default()).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        controls: usize,
        top: Vec<TopChart>,
        country: Vec<CountryChart>,
    }

    impl Presenter for Recorder {
        fn render_controls(&mut self, _controls: &Controls) -> DashResult<()> {
            self.controls += 1;
            Ok(())
        }

        fn render_top_chart(&mut self, chart: &TopChart) -> DashResult<()> {
            self.top.push(chart.clone());
            Ok(())
        }

        fn render_country_chart(&mut self, chart: &CountryChart) -> DashResult<()> {
            self.country.push(chart.clone());
            Ok(())
        }
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.state().selected_category().name(), "Language");
        assert!(c.state().selected_ages().is_empty());
        assert_eq!(c.categories().len(), 2);
        assert_eq!(c.age_options().len(), 3);
        assert_eq!(c.country_chart().total(), 3);
        assert_eq!(c.top_chart().have_worked_with.len(), 4);
    }

    #[test]
    fn test_no_categories_is_fatal() {
        let ds = Arc::new(dataset_from(&["Age", "Country"], &[&[Some("Under 18"), Some("USA")]]));
        let err = Controller::new(ds, ChartSettings::default()).err().unwrap();
        assert!(matches!(err, DashError::NoCategoriesFound));
    }

    #[test]
    fn test_category_change_only_recomputes_top_chart() {
        let mut c = controller();
        let before = c.country_chart().clone();
        let recomputed = c.select_category("Web").unwrap();
        assert!(recomputed.contains(Output::TopChart));
        assert!(!recomputed.contains(Output::CountryChart));
        assert_eq!(c.country_chart(), &before);
        assert_eq!(c.top_chart().category.name(), "Web");
        assert!(c.top_chart().want_to_work_with.is_empty());
    }

    #[test]
    fn test_age_change_recomputes_both() {
        let mut c = controller();
        let recomputed = c.toggle_age("Under 18");
        assert_eq!(recomputed, Recomputed::all());
        assert_eq!(c.country_chart().total(), 1);
        let labels: Vec<_> = c.top_chart().have_worked_with.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Python", "JS"]);
    }

    #[test]
    fn test_unchanged_state_recomputes_nothing() {
        let mut c = controller();
        let same = c.state().clone();
        assert!(c.apply(same).is_empty());
    }

    #[test]
    fn test_category_change_uses_current_age_filter() {
        let mut c = controller();
        c.toggle_age("65 years or older");
        c.select_category("Web").unwrap();
        let top = &c.top_chart().have_worked_with;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].label, "Django");
    }

    #[test]
    fn test_clearing_ages_restores_full_counts() {
        let mut c = controller();
        c.toggle_age("Under 18");
        c.clear_ages();
        assert_eq!(c.country_chart().total(), 3);
    }

    #[test]
    fn test_unknown_category_leaves_state() {
        let mut c = controller();
        let err = c.select_category("Database").unwrap_err();
        assert!(matches!(err, DashError::UnknownCategory(_)));
        assert_eq!(c.state().selected_category().name(), "Language");
    }

    #[test]
    fn test_category_cycling_wraps() {
        let mut c = controller();
        c.next_category();
        assert_eq!(c.state().selected_category().name(), "Web");
        c.next_category();
        assert_eq!(c.state().selected_category().name(), "Language");
        c.previous_category();
        assert_eq!(c.state().selected_category().name(), "Web");
    }

    #[test]
    fn test_missing_age_column_degrades() {
        let ds = Arc::new(dataset_from(
            &["Country", "WebHaveWorkedWith"],
            &[&[Some("USA"), Some("React")]],
        ));
        let c = Controller::new(ds, ChartSettings::default()).unwrap();
        assert!(c.age_options().is_empty());
        assert!(c.top_chart().is_empty());
        assert!(c.country_chart().counts.is_empty());
    }

    #[test]
    fn test_publish_only_recomputed_outputs() {
        let mut c = controller();
        let mut recorder = Recorder::default();
        c.publish(&mut recorder, &Recomputed::all()).unwrap();
        let recomputed = c.next_category();
        c.publish(&mut recorder, &recomputed).unwrap();
        assert_eq!(recorder.controls, 2);
        assert_eq!(recorder.top.len(), 2);
        assert_eq!(recorder.country.len(), 1);
        assert_eq!(recorder.top[1].category.name(), "Web");
    }
}
