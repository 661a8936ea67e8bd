// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::report::RunReport;
use crate::utils::error::StorageError;

pub struct ReportStore {
    base_dir: PathBuf,
}

impl ReportStore {
    /// Creates a new ReportStore with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Saves the run as pretty-printed JSON, e.g. `8-K_2023-12-01_2024-06-01_report.json`.
    pub fn save_report(&self, report: &RunReport) -> Result<PathBuf, StorageError> {
        let filename = format!(
            "{}_{}_{}_report.json",
            report.query.form_type, report.query.start_date, report.query.end_date
        );
        let file_path = self.base_dir.join(filename);

        let document = serde_json::json!({
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "filing_count": report.filings.len(),
            "analyzed_count": report.filings.iter().filter(|f| f.impact.is_some()).count(),
            "report": report,
        });

        let document_str = serde_json::to_string_pretty(&document)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, document_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved report to {}", file_path.display());

        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::{FilingQuery, FilingRecord};
    use crate::report::FilingReport;
    use chrono::NaiveDate;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cyber8k-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_save_report_writes_json() {
        let dir = scratch_dir("store");
        let store = ReportStore::new(&dir).unwrap();
        assert!(dir.exists());

        let report = RunReport {
            query: FilingQuery {
                form_type: "8-K".to_string(),
                start_date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                max_results: 10,
            },
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            filings: vec![FilingReport {
                filing: FilingRecord {
                    company_name: "ACME CORP".to_string(),
                    cik: "1".to_string(),
                    filing_date: "2024-01-10".to_string(),
                    form_type: "8-K".to_string(),
                    accession_number: "0000000001-24-000001".to_string(),
                    filing_href: "https://example.test/index.htm".to_string(),
                    document_href: "https://example.test/doc.htm".to_string(),
                    ticker: None,
                    published_timestamp: None,
                },
                impact: None,
            }],
        };

        let path = store.save_report(&report).unwrap();
        assert_eq!(path.file_name().unwrap(), "8-K_2023-12-01_2024-06-01_report.json");

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["filing_count"], 1);
        assert_eq!(saved["analyzed_count"], 0);
        assert_eq!(saved["report"]["filings"][0]["company_name"], "ACME CORP");

        fs::remove_dir_all(&dir).unwrap();
    }
}
