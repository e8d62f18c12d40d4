use std::io::Write;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::age::AgeOption;
use crate::aggregate::{CountryChart, TopChart};
use crate::category::Category;
use crate::error::DashResult;

/// Everything a presenter needs to draw the category tabs and the age
/// checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub categories: Vec<Category>,
    pub selected_category: Category,
    pub age_options: Vec<AgeOption>,
    pub selected_ages: Vec<String>,
}

impl Controls {
    pub fn selected_tab(&self) -> usize {
        self.categories
            .iter()
            .position(|c| c == &self.selected_category)
            .unwrap_or(0)
    }

    pub fn is_age_selected(&self, option: &AgeOption) -> bool {
        self.selected_ages.iter().any(|a| a == &option.value)
    }
}

pub trait Presenter {
    fn render_controls(&mut self, controls: &Controls) -> DashResult<()>;
    fn render_top_chart(&mut self, chart: &TopChart) -> DashResult<()>;
    fn render_country_chart(&mut self, chart: &CountryChart) -> DashResult<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Local>,
    pub controls: Option<Controls>,
    pub top_chart: Option<TopChart>,
    pub country_chart: Option<CountryChart>,
}

/// Collects one round of rendered output and writes it as JSON.
pub struct JsonPresenter<W: Write> {
    out: W,
    snapshot: Snapshot,
}

impl<W: Write> JsonPresenter<W> {
    pub fn new(out: W) -> Self {
        JsonPresenter {
            out,
            snapshot: Snapshot {
                generated_at: Local::now(),
                controls: None,
                top_chart: None,
                country_chart: None,
            },
        }
    }

    pub fn finish(mut self) -> DashResult<W> {
        serde_json::to_writer_pretty(&mut self.out, &self.snapshot)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> Presenter for JsonPresenter<W> {
    fn render_controls(&mut self, controls: &Controls) -> DashResult<()> {
        self.snapshot.controls = Some(controls.clone());
        Ok(())
    }

    fn render_top_chart(&mut self, chart: &TopChart) -> DashResult<()> {
        self.snapshot.top_chart = Some(chart.clone());
        Ok(())
    }

    fn render_country_chart(&mut self, chart: &CountryChart) -> DashResult<()> {
        self.snapshot.country_chart = Some(chart.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::LabelCount;

    #[test]
    fn test_json_snapshot() {
        let mut presenter = JsonPresenter::new(Vec::new());
        let category = Category::new("Web");
        presenter
            .render_top_chart(&TopChart {
                have_worked_with: vec![LabelCount { label: "JS".into(), count: 1 }],
                ..TopChart::empty(&category, 20)
            })
            .unwrap();
        let mut country = CountryChart::empty("Country");
        country.counts.insert("USA".into(), 2);
        presenter.render_country_chart(&country).unwrap();

        let out = presenter.finish().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["top_chart"]["category"], "Web");
        assert_eq!(value["top_chart"]["have_worked_with"][0]["label"], "JS");
        assert_eq!(value["country_chart"]["counts"]["USA"], 2);
        assert!(value["controls"].is_null());
    }

    #[test]
    fn test_controls_selection() {
        let controls = Controls {
            categories: vec![Category::new("Language"), Category::new("Web")],
            selected_category: Category::new("Web"),
            age_options: vec![],
            selected_ages: vec!["Under 18".into()],
        };
        assert_eq!(controls.selected_tab(), 1);
        let option = AgeOption { label: "18-".into(), value: "Under 18".into() };
        assert!(controls.is_age_selected(&option));
    }
}
