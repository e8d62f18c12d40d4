use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::dataset::{Dataset, Record};
use crate::error::{DashError, DashResult};

/// How raw survey text is turned into cells.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Cell contents that count as a missing answer.
    pub null_values: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            delimiter: b',',
            null_values: vec![String::new(), "NA".to_string()],
        }
    }
}

pub fn read_data(path: &Path, options: &LoadOptions) -> DashResult<Dataset> {
    let file = File::open(path).map_err(|e| DashError::data_load(path, e))?;
    let dataset = read_from(file, path, options)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "loaded survey dataset"
    );
    Ok(dataset)
}

/// Parses a header row plus records from any reader. `origin` only labels
/// errors.
pub fn read_from<R: Read>(reader: R, origin: &Path, options: &LoadOptions) -> DashResult<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| DashError::data_load(origin, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(DashError::data_load(origin, "missing header row"));
    }

    let mut records = Vec::<Record>::new();
    for (line, result) in rdr.records().enumerate() {
        // header is line 1
        let row = result.map_err(|e| DashError::data_load(origin, format!("line {}: {}", line + 2, e)))?;
        let cells = row
            .iter()
            .map(|cell| {
                if options.null_values.iter().any(|n| n == cell) {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        records.push(Record::new(cells));
    }

    if records.is_empty() {
        return Err(DashError::data_load(origin, "dataset has zero rows"));
    }
    debug!(rows = records.len(), "parsed records");
    Ok(Dataset::new(columns, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SURVEY: &str = "\
Age,Country,WebHaveWorkedWith,WebWantToWorkWith
Under 18,USA,JS;Python,Rust
25-34 years old,USA,Python,NA
65 years or older,France,,Go
";

    fn origin() -> &'static Path {
        Path::new("memory.csv")
    }

    #[test]
    fn test_read_header_and_rows() {
        let ds = read_from(SURVEY.as_bytes(), origin(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.columns().len(), 4);
        assert_eq!(ds.columns()[2], "WebHaveWorkedWith");
        assert_eq!(ds.len(), 3);
        let first = ds.rows().next().unwrap();
        assert_eq!(first.get(4), None);
        assert_eq!(first.get(2), Some("JS;Python"));
    }

    #[test]
    fn test_null_markers() {
        let ds = read_from(SURVEY.as_bytes(), origin(), &LoadOptions::default()).unwrap();
        let want: Vec<_> = ds.cells("WebWantToWorkWith").unwrap().collect();
        assert_eq!(want, vec![Some("Rust"), None, Some("Go")]);
        let have: Vec<_> = ds.cells("WebHaveWorkedWith").unwrap().collect();
        assert_eq!(have[2], None);
    }

    #[test]
    fn test_custom_delimiter() {
        let text = "Age\tCountry\n18-24 years old\tGermany\n";
        let options = LoadOptions {
            delimiter: b'\t',
            ..LoadOptions::default()
        };
        let ds = read_from(text.as_bytes(), origin(), &options).unwrap();
        assert_eq!(ds.distinct_values("Country").unwrap(), vec!["Germany"]);
    }

    #[test]
    fn test_zero_rows_is_load_error() {
        let err = read_from("Age,Country\n".as_bytes(), origin(), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, DashError::DataLoad { .. }));
    }

    #[test]
    fn test_empty_source_is_load_error() {
        let err = read_from("".as_bytes(), origin(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, DashError::DataLoad { .. }));
    }

    #[test]
    fn test_ragged_row_is_load_error() {
        let text = "Age,Country\nUnder 18,USA\n25-34 years old\n";
        let err = read_from(text.as_bytes(), origin(), &LoadOptions::default()).unwrap_err();
        match err {
            DashError::DataLoad { reason, .. } => assert!(reason.contains("line 3")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_data(&dir.path().join("absent.csv"), &LoadOptions::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SURVEY.as_bytes()).unwrap();
        let ds = read_data(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(ds.len(), 3);
    }
}
