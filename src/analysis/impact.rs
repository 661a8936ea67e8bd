// src/analysis/impact.rs
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

use crate::analysis::prices::{PriceHistory, PriceTable};

/// Widening stops once `before_span + after_span` reaches this value.
pub const SPAN_LIMIT: i64 = 10;

const INITIAL_SPAN: i64 = 1;

/// Closing prices on the trading days bracketing a filing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceImpact {
    pub before_date: NaiveDate,
    pub after_date: NaiveDate,
    pub before_price: f64,
    pub after_price: f64,
    pub pct_change: f64,
}

impl PriceImpact {
    fn new(before_date: NaiveDate, after_date: NaiveDate, before_price: f64, after_price: f64) -> Self {
        Self {
            before_date,
            after_date,
            before_price,
            after_price,
            pct_change: (after_price - before_price) / before_price * 100.0,
        }
    }
}

/// Business days (Mon-Fri) of a calendar range, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingWindow {
    days: Vec<NaiveDate>,
}

impl TradingWindow {
    pub fn business_days(start: NaiveDate, end: NaiveDate) -> Self {
        let days = start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .collect();
        Self { days }
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }
}

/// Which side of the window to grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widen {
    Before,
    After,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidenReason {
    EmptyWindow,
    NoPriceData,
    FilingOnLastDay,
    FilingOnFirstDay,
    LastDayMissing,
    FirstDayMissing,
    UnusablePrice,
    ProviderError,
}

/// Result of evaluating one window against its price data.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Found(PriceImpact),
    Widen(Widen, WidenReason),
}

/// Bounded search for a before/after trading-day pair around a filing date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSearch {
    filing_date: NaiveDate,
    before_span: i64,
    after_span: i64,
}

impl WindowSearch {
    pub fn new(filing_date: NaiveDate) -> Self {
        Self {
            filing_date,
            before_span: INITIAL_SPAN,
            after_span: INITIAL_SPAN,
        }
    }

    pub fn spans(&self) -> (i64, i64) {
        (self.before_span, self.after_span)
    }

    pub fn is_exhausted(&self) -> bool {
        self.before_span + self.after_span >= SPAN_LIMIT
    }

    pub fn window(&self) -> TradingWindow {
        TradingWindow::business_days(
            self.filing_date - Duration::days(self.before_span),
            self.filing_date + Duration::days(self.after_span),
        )
    }

    pub fn widen(&mut self, side: Widen) {
        match side {
            Widen::Before => self.before_span += 1,
            Widen::After => self.after_span += 1,
            Widen::Both => {
                self.before_span += 1;
                self.after_span += 1;
            }
        }
    }

    /// Decides whether `prices` yields a usable pair for `window`.
    ///
    /// The filing must fall strictly inside the window, so a weekend filing
    /// never gets a "before" or "after" day on the wrong side of it.
    pub fn evaluate(&self, window: &TradingWindow, prices: &PriceTable) -> Step {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Step::Widen(Widen::Both, WidenReason::EmptyWindow);
        };

        if prices.is_empty() {
            return Step::Widen(Widen::Both, WidenReason::NoPriceData);
        }
        if self.filing_date >= last {
            return Step::Widen(Widen::After, WidenReason::FilingOnLastDay);
        }
        if self.filing_date <= first {
            return Step::Widen(Widen::Before, WidenReason::FilingOnFirstDay);
        }
        if !prices.contains(last) {
            return Step::Widen(Widen::Both, WidenReason::LastDayMissing);
        }

        let (Some(before_price), Some(after_price)) = (prices.close(first), prices.close(last)) else {
            return Step::Widen(Widen::Both, WidenReason::FirstDayMissing);
        };
        if !is_usable_price(before_price) || !is_usable_price(after_price) {
            return Step::Widen(Widen::Both, WidenReason::UnusablePrice);
        }

        Step::Found(PriceImpact::new(first, last, before_price, after_price))
    }
}

fn is_usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Measures how a ticker's close moved across a filing date.
pub struct ImpactAnalyzer<P> {
    provider: P,
}

impl<P: PriceHistory> ImpactAnalyzer<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Finds the closest trading days on either side of `filing_date` that both
    /// have prices and returns the percent change between their closes.
    ///
    /// `reference_date` is the processing day: filings from that day (or later)
    /// have no completed session to measure, so `None` is returned without
    /// requesting data. `None` also means the window hit [`SPAN_LIMIT`].
    pub async fn analyze(
        &self,
        ticker: &str,
        filing_date: NaiveDate,
        reference_date: NaiveDate,
    ) -> Option<PriceImpact> {
        if filing_date >= reference_date {
            tracing::info!("Filing for {} is very recent, skipping stock analysis for now.", ticker);
            return None;
        }

        let mut search = WindowSearch::new(filing_date);
        while !search.is_exhausted() {
            let window = search.window();
            let (Some(first), Some(last)) = (window.first(), window.last()) else {
                search.widen(Widen::Both);
                continue;
            };

            let step = match self.provider.daily_history(ticker, first, last + Duration::days(1)).await {
                Ok(prices) => match search.evaluate(&window, &prices) {
                    Step::Found(impact) => {
                        tracing::info!(
                            "Price window for {} around {} ({} rows):\n{}",
                            ticker, filing_date, prices.len(), prices
                        );
                        return Some(impact);
                    }
                    step => step,
                },
                Err(e) => {
                    tracing::warn!("Price history for {} [{} .. {}] failed: {}", ticker, first, last, e);
                    Step::Widen(Widen::Both, WidenReason::ProviderError)
                }
            };

            if let Step::Widen(side, reason) = step {
                tracing::debug!(
                    "{}: window {} .. {} spans {:?}, widening {:?} ({:?})",
                    ticker, first, last, search.spans(), side, reason
                );
                search.widen(side);
            }
        }

        tracing::info!("No usable price window for {} around {}", ticker, filing_date);
        None
    }
}
