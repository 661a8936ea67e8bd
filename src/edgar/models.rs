// src/edgar/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::extractors::extract_ticker;

/// Placeholder for any field a search hit does not carry.
pub const UNKNOWN: &str = "unknown";

/// Envelope of an EFTS full-text search response (Elasticsearch shaped).
/// Example: https://efts.sec.gov/LATEST/search-index?q=%22Item%201.05%22&forms=8-K
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Option<SearchHits>,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    #[serde(default)]
    pub total: Option<SearchTotal>,
    // Hits stay untyped so that one malformed field never rejects a whole page.
    #[serde(default)]
    pub hits: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchTotal {
    #[serde(default)]
    pub value: Option<u64>,
}

impl SearchResponse {
    pub fn total(&self) -> Option<u64> {
        self.hits.as_ref()?.total.as_ref()?.value
    }

    pub fn into_hits(self) -> Vec<Value> {
        self.hits.map(|h| h.hits).unwrap_or_default()
    }
}

/// Parameters of one filing search run.
#[derive(Debug, Clone, Serialize)]
pub struct FilingQuery {
    pub form_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_results: usize,
}

/// A normalized search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilingRecord {
    pub company_name: String,
    pub cik: String,
    pub filing_date: String,
    pub form_type: String,
    pub accession_number: String,
    pub filing_href: String,
    pub document_href: String,
    pub ticker: Option<String>,
    /// Acceptance time from the index page, Eastern Time. Filled in after the search.
    pub published_timestamp: Option<String>,
}

impl FilingRecord {
    /// Builds a record from a raw EFTS hit. Every field falls back to
    /// [`UNKNOWN`] on its own.
    pub fn from_hit(hit: &Value, archives_url: &str) -> Self {
        let source = &hit["_source"];

        let display_name = source["display_names"]
            .get(0)
            .and_then(Value::as_str);
        let cik = source["ciks"]
            .get(0)
            .and_then(json_scalar)
            .unwrap_or_else(|| UNKNOWN.to_string());
        let accession_number = string_field(source, "adsh");
        let doc_id = hit["_id"]
            .as_str()
            .and_then(|id| id.split(':').nth(1))
            .unwrap_or(UNKNOWN);

        Self {
            company_name: display_name.unwrap_or(UNKNOWN).to_string(),
            filing_date: string_field(source, "file_date"),
            form_type: string_field(source, "form"),
            filing_href: filing_index_url(archives_url, &cik, &accession_number),
            document_href: document_url(archives_url, &cik, &accession_number, doc_id),
            ticker: display_name.and_then(extract_ticker),
            cik,
            accession_number,
            published_timestamp: None,
        }
    }

    /// Date the price impact is measured around: the day of the acceptance
    /// timestamp when known, otherwise the search index's filing date.
    pub fn analysis_date(&self) -> Option<NaiveDate> {
        self.published_timestamp
            .as_deref()
            .and_then(normalize_filing_date)
            .or_else(|| normalize_filing_date(&self.filing_date))
    }
}

fn string_field(source: &Value, key: &str) -> String {
    source[key]
        .as_str()
        .unwrap_or(UNKNOWN)
        .to_string()
}

// CIKs come back as zero-padded strings, occasionally as bare numbers.
fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// URL of the filing index page (the one carrying the acceptance timestamp).
pub fn filing_index_url(archives_url: &str, cik: &str, accession_number: &str) -> String {
    let acc_no_dashes = accession_number.replace('-', "");
    format!(
        "{}/{}/{}/{}-index.htm",
        archives_url, cik, acc_no_dashes, accession_number
    )
}

/// URL of a single document inside a filing.
pub fn document_url(archives_url: &str, cik: &str, accession_number: &str, doc_id: &str) -> String {
    let acc_no_dashes = accession_number.replace('-', "");
    format!("{}/{}/{}/{}", archives_url, cik, acc_no_dashes, doc_id)
}

/// Parses `YYYY-MM-DD`, optionally followed by a time of day, into a date.
pub fn normalize_filing_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
