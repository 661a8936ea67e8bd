// src/main.rs
mod analysis;
mod edgar;
mod extractors;
mod report;
mod storage;
mod utils;

use std::process::ExitCode;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use clap::Parser;

use analysis::{ImpactAnalyzer, PriceHistory, YahooPriceHistory};
use edgar::client::{DEFAULT_REQUEST_DELAY_MS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use edgar::{EdgarClient, EdgarConfig, FilingQuery};
use report::{FilingReport, RunReport};
use storage::ReportStore;
use utils::AppError;

/// Environment variable consulted when `--user-agent` is not given.
const USER_AGENT_ENV: &str = "EDGAR_USER_AGENT";

/// Command Line Interface for the 8-K cybersecurity incident scanner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filing form type to search
    #[arg(long, default_value = "8-K")]
    form_type: String,

    /// First filing date to include (YYYY-MM-DD). The first Item 1.05 filing is from 2023-12-18.
    #[arg(long, default_value = "2023-12-01")]
    start_date: NaiveDate,

    /// Last filing date to include (YYYY-MM-DD, default: today)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Maximum number of filings to fetch
    #[arg(long, default_value_t = 999_999)]
    max_results: usize,

    /// User-Agent sent to the SEC (name and contact email); falls back to $EDGAR_USER_AGENT
    #[arg(short, long)]
    user_agent: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Delay before each SEC request in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_DELAY_MS)]
    request_delay_ms: u64,

    /// Skip the stock price analysis
    #[arg(long)]
    skip_impact: bool,

    /// Directory to save a JSON report of the run (optional)
    #[arg(short, long)]
    output_dir: Option<String>,
}

impl Args {
    fn edgar_config(&self) -> Result<EdgarConfig, AppError> {
        let user_agent = match &self.user_agent {
            Some(ua) => ua.clone(),
            None => std::env::var(USER_AGENT_ENV).unwrap_or_else(|_| {
                tracing::warn!("No User-Agent configured, using default '{}'", DEFAULT_USER_AGENT);
                DEFAULT_USER_AGENT.to_string()
            }),
        };
        if user_agent.trim().is_empty() {
            return Err(AppError::Config("User-Agent must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::Config("Timeout must be at least one second".to_string()));
        }

        Ok(EdgarConfig {
            user_agent,
            request_delay: Duration::from_millis(self.request_delay_ms),
            timeout: Duration::from_secs(self.timeout_secs),
            ..EdgarConfig::default()
        })
    }

    fn filing_query(&self, today: NaiveDate) -> Result<FilingQuery, AppError> {
        let end_date = self.end_date.unwrap_or(today);
        if self.start_date > end_date {
            return Err(AppError::Config(format!(
                "Start date {} is after end date {}",
                self.start_date, end_date
            )));
        }

        Ok(FilingQuery {
            form_type: self.form_type.clone(),
            start_date: self.start_date,
            end_date,
            max_results: self.max_results,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let query = args.filing_query(today)?;
    let client = EdgarClient::new(args.edgar_config()?)?;
    tracing::debug!("Using User-Agent: {}", client.config().user_agent);

    // 3. Fetch filings
    tracing::info!(
        "Fetching {} filings with Item 1.05 or Material Cybersecurity Incidents ({} .. {})",
        query.form_type, query.start_date, query.end_date
    );
    let mut filings = client.fetch_filings(&query).await?;

    if filings.is_empty() {
        println!("No filings found.");
        return Ok(());
    }

    // 4. Resolve acceptance timestamps; a failed index page only costs that timestamp
    for filing in filings.iter_mut() {
        match client.resolve_timestamp(&filing.filing_href).await {
            Ok(timestamp) => filing.published_timestamp = timestamp,
            Err(e) => tracing::warn!("Could not resolve timestamp for {}: {}", filing.filing_href, e),
        }
    }

    // 5. Price impact for filings with a ticker
    let reports: Vec<FilingReport> = if args.skip_impact {
        filings
            .into_iter()
            .map(|filing| FilingReport { filing, impact: None })
            .collect()
    } else {
        let analyzer = ImpactAnalyzer::new(YahooPriceHistory::new()?);
        analyze_filings(&analyzer, filings, today).await
    };

    // 6. Report
    println!("\nPrinting {} filings:", reports.len());
    for report in &reports {
        println!("{}", report);
    }

    let run_report = RunReport { query, reference_date: today, filings: reports };
    if let Some(dir) = &args.output_dir {
        let store = ReportStore::new(dir)?;
        store.save_report(&run_report)?;
    }

    tracing::info!(
        "Processing finished. Filings: {}, with price impact: {}",
        run_report.filings.len(),
        run_report.filings.iter().filter(|r| r.impact.is_some()).count()
    );

    Ok(())
}

async fn analyze_filings<P: PriceHistory>(
    analyzer: &ImpactAnalyzer<P>,
    filings: Vec<edgar::FilingRecord>,
    today: NaiveDate,
) -> Vec<FilingReport> {
    let mut reports = Vec::with_capacity(filings.len());

    for filing in filings {
        let impact = match (&filing.ticker, filing.analysis_date()) {
            (Some(ticker), Some(date)) => analyzer.analyze(ticker, date, today).await,
            (Some(ticker), None) => {
                tracing::warn!("No usable date for {} ({}), skipping analysis", ticker, filing.filing_date);
                None
            }
            (None, _) => None,
        };
        reports.push(FilingReport { filing, impact });
    }

    reports
}
