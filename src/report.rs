// src/report.rs
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::PriceImpact;
use crate::edgar::{FilingQuery, FilingRecord};

/// A filing together with the outcome of its price analysis.
#[derive(Debug, Clone, Serialize)]
pub struct FilingReport {
    #[serde(flatten)]
    pub filing: FilingRecord,
    pub impact: Option<PriceImpact>,
}

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub query: FilingQuery,
    pub reference_date: NaiveDate,
    pub filings: Vec<FilingReport>,
}

impl fmt::Display for FilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filing = &self.filing;
        writeln!(
            f,
            "Company: {}, CIK: {}, Date: {}, Form Type: {}",
            filing.company_name, filing.cik, filing.filing_date, filing.form_type
        )?;
        writeln!(f, "Filing URL: {}", filing.filing_href)?;
        writeln!(f, "Document URL: {}", filing.document_href)?;
        match &filing.published_timestamp {
            Some(ts) => writeln!(f, "Published at: {} Eastern Time", ts)?,
            None => writeln!(f, "Published at: unknown")?,
        }

        if let (Some(ticker), Some(impact)) = (&filing.ticker, &self.impact) {
            writeln!(f)?;
            writeln!(f, "Symbol/Ticker: {}", ticker)?;
            writeln!(
                f,
                "Close {} -> {}: {:.2} -> {:.2}",
                impact.before_date, impact.after_date, impact.before_price, impact.after_price
            )?;
            writeln!(f, "Approximate Price Change (%): {:.4}", impact.pct_change)?;
        }

        write!(f, "{}", "-".repeat(80))
    }
}
