// src/analysis/prices.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime};
use yahoo_finance_api as yahoo;

use crate::utils::error::PriceError;

/// One daily bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars indexed by trading date. An empty table means no data in range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    rows: BTreeMap<NaiveDate, PriceBar>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, bar: PriceBar) {
        self.rows.insert(date, bar);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.rows.contains_key(&date)
    }

    pub fn close(&self, date: NaiveDate) -> Option<f64> {
        self.rows.get(&date).map(|bar| bar.close)
    }
}

impl FromIterator<(NaiveDate, PriceBar)> for PriceTable {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, PriceBar)>>(iter: I) -> Self {
        Self { rows: iter.into_iter().collect() }
    }
}

impl fmt::Display for PriceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>10} {:>10} {:>10} {:>10} {:>12}",
            "Date", "Open", "High", "Low", "Close", "Volume"
        )?;
        for (date, bar) in &self.rows {
            writeln!(
                f,
                "{:<10} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>12}",
                date, bar.open, bar.high, bar.low, bar.close, bar.volume
            )?;
        }
        Ok(())
    }
}

/// Source of daily price history.
#[allow(async_fn_in_trait)]
pub trait PriceHistory {
    /// Daily bars for `ticker` with dates in `[start, end_exclusive)`.
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<PriceTable, PriceError>;
}

/// Yahoo Finance daily history.
pub struct YahooPriceHistory {
    connector: yahoo::YahooConnector,
}

impl YahooPriceHistory {
    pub fn new() -> Result<Self, PriceError> {
        Ok(Self {
            connector: yahoo::YahooConnector::new()?,
        })
    }
}

impl PriceHistory for YahooPriceHistory {
    async fn daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<PriceTable, PriceError> {
        let start_time = to_offset_datetime(start)?;
        let end_time = to_offset_datetime(end_exclusive)?;

        tracing::debug!("Requesting {} daily history [{}, {})", ticker, start, end_exclusive);
        let response = self
            .connector
            .get_quote_history(ticker, start_time, end_time)
            .await?;
        let quotes = response.quotes()?;

        let mut table = PriceTable::new();
        for quote in quotes {
            let date = DateTime::from_timestamp(quote.timestamp as i64, 0)
                .ok_or_else(|| PriceError::TimeConversion(format!("bad quote timestamp {}", quote.timestamp)))?
                .date_naive();
            // Bars are stamped at the session open, so the UTC date is the trading date.
            if date < start || date >= end_exclusive {
                continue;
            }
            table.insert(
                date,
                PriceBar {
                    open: quote.open,
                    high: quote.high,
                    low: quote.low,
                    close: quote.close,
                    volume: quote.volume,
                },
            );
        }

        Ok(table)
    }
}

fn to_offset_datetime(date: NaiveDate) -> Result<time::OffsetDateTime, PriceError> {
    let timestamp = date.and_time(NaiveTime::MIN).and_utc().timestamp();
    time::OffsetDateTime::from_unix_timestamp(timestamp)
        .map_err(|e| PriceError::TimeConversion(e.to_string()))
}
