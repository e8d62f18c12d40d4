use serde::Serialize;

const YEARS_OLD: &str = " years old";
pub const OLDER_SENTINEL: &str = "65 years or older";
pub const OLDER_LABEL: &str = "65+";
pub const UNDER_SENTINEL: &str = "Under 18";
pub const UNDER_LABEL: &str = "18-";

/// One entry of the age checklist: shown as `label`, filtered on `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgeOption {
    pub label: String,
    pub value: String,
}

pub fn age_label(raw: &str) -> String {
    if let Some(idx) = raw.find(YEARS_OLD) {
        raw[..idx].to_string()
    } else if raw == OLDER_SENTINEL {
        OLDER_LABEL.to_string()
    } else if raw == UNDER_SENTINEL {
        UNDER_LABEL.to_string()
    } else {
        raw.to_string()
    }
}

/// Checklist options for the distinct raw values, order preserved.
pub fn age_options<I, S>(distinct: I) -> Vec<AgeOption>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    distinct
        .into_iter()
        .map(|raw| AgeOption {
            label: age_label(raw.as_ref()),
            value: raw.as_ref().to_string(),
        })
        .collect()
}
