use std::fmt;

use serde::Serialize;

use crate::error::{DashError, DashResult};

pub const HAVE_WORKED_WITH: &str = "HaveWorkedWith";
pub const WANT_TO_WORK_WITH: &str = "WantToWorkWith";

/// A technology grouping such as `Language` or `Database`, taken from the
/// prefix of a `...HaveWorkedWith` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn have_worked_with_column(&self) -> String {
        format!("{}{}", self.0, HAVE_WORKED_WITH)
    }

    pub fn want_to_work_with_column(&self) -> String {
        format!("{}{}", self.0, WANT_TO_WORK_WITH)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Categories in first-seen column order, one per distinct prefix.
pub fn derive_categories(columns: &[String]) -> DashResult<Vec<Category>> {
    let mut categories = Vec::<Category>::new();
    for column in columns {
        if let Some(prefix) = column.strip_suffix(HAVE_WORKED_WITH) {
            if !categories.iter().any(|c| c.name() == prefix) {
                categories.push(Category::new(prefix));
            }
        }
    }
    if categories.is_empty() {
        return Err(DashError::NoCategoriesFound);
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_derive_in_column_order() {
        let columns = cols(&[
            "ResponseId",
            "LanguageHaveWorkedWith",
            "LanguageWantToWorkWith",
            "DatabaseHaveWorkedWith",
            "PlatformWantToWorkWith",
            "WebframeHaveWorkedWith",
        ]);
        let names: Vec<_> = derive_categories(&columns)
            .unwrap()
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(names, vec!["Language", "Database", "Webframe"]);
    }

    #[test]
    fn test_duplicate_prefixes_collapse() {
        let columns = cols(&["WebHaveWorkedWith", "Age", "WebHaveWorkedWith"]);
        assert_eq!(derive_categories(&columns).unwrap().len(), 1);
    }

    #[test]
    fn test_no_categories() {
        let err = derive_categories(&cols(&["Age", "Country"])).unwrap_err();
        assert!(matches!(err, DashError::NoCategoriesFound));
    }

    #[test]
    fn test_column_names() {
        let web = Category::new("Web");
        assert_eq!(web.have_worked_with_column(), "WebHaveWorkedWith");
        assert_eq!(web.want_to_work_with_column(), "WebWantToWorkWith");
    }
}
