// src/edgar/client.rs
use crate::edgar::models::{FilingQuery, FilingRecord, SearchResponse};
use crate::extractors::extract_accepted_timestamp;
use crate::utils::error::EdgarError;
use reqwest::header;
use std::time::Duration;

// The SEC asks callers to identify themselves:
// https://www.sec.gov/os/accessing-edgar-data
pub const DEFAULT_USER_AGENT: &str = "cyber8k research contact@example.com";
pub const EFTS_SEARCH_URL: &str = "https://efts.sec.gov/LATEST/search-index";
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";
// SEC asks for 10 requests/second max. Be conservative. >100ms delay.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 150;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size of the full-text search endpoint.
pub const SEARCH_PAGE_SIZE: usize = 100;

// Item 1.05 is not always indexed, so the section title is searched as well.
const CYBER_INCIDENT_QUERY: &str = r#""Material Cybersecurity Incidents" OR "Item 1.05""#;

/// Settings shared by every EDGAR request, built once at startup.
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    pub user_agent: String,
    pub search_url: String,
    pub archives_url: String,
    pub request_delay: Duration,
    pub timeout: Duration,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            search_url: EFTS_SEARCH_URL.to_string(),
            archives_url: EDGAR_ARCHIVES_URL.to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for the EDGAR full-text search API and the filing archives.
pub struct EdgarClient {
    http: reqwest::Client,
    config: EdgarConfig,
}

impl EdgarClient {
    /// Creates a reqwest client configured for EDGAR interaction.
    pub fn new(config: EdgarConfig) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str()) // Set the required User-Agent
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &EdgarConfig {
        &self.config
    }

    /// Pages through the full-text search for cybersecurity incident filings.
    ///
    /// Stops at the server-reported total, on a short or empty page, or once
    /// `max_results` records are collected. A failed page aborts the whole fetch.
    pub async fn fetch_filings(&self, query: &FilingQuery) -> Result<Vec<FilingRecord>, EdgarError> {
        let mut records: Vec<FilingRecord> = Vec::new();
        let mut total_available: Option<u64> = None;

        while records.len() < query.max_results {
            let offset = records.len();
            let page = self.search_page(query, offset).await?;

            if total_available.is_none() {
                total_available = page.total();
            }

            let hits = page.into_hits();
            if hits.is_empty() {
                tracing::debug!("Empty page at offset {}, stopping", offset);
                break;
            }
            let page_len = hits.len();

            records.extend(
                hits.iter()
                    .map(|hit| FilingRecord::from_hit(hit, &self.config.archives_url)),
            );

            match total_available {
                Some(total) => tracing::info!("Fetched {}/{} filings...", records.len(), total),
                None => tracing::info!("Fetched {} filings...", records.len()),
            }

            let reached_total = total_available.is_some_and(|total| records.len() as u64 >= total);
            if reached_total || page_len < SEARCH_PAGE_SIZE {
                break;
            }
        }

        records.truncate(query.max_results);
        tracing::info!("Completed fetching filings ({} records).", records.len());

        Ok(records)
    }

    async fn search_page(&self, query: &FilingQuery, offset: usize) -> Result<SearchResponse, EdgarError> {
        let params = [
            ("q", CYBER_INCIDENT_QUERY.to_string()),
            ("forms", query.form_type.clone()),
            ("startdt", query.start_date.format("%Y-%m-%d").to_string()),
            ("enddt", query.end_date.format("%Y-%m-%d").to_string()),
            ("from", offset.to_string()),
            ("size", SEARCH_PAGE_SIZE.to_string()),
            ("sort", "desc".to_string()),
        ];

        tracing::debug!("Searching {} from offset {}", self.config.search_url, offset);
        self.pause().await;

        let response = self.http.get(&self.config.search_url)
            .query(&params)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = check_status(response, &self.config.search_url)?;

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| EdgarError::Parse(format!("search page at offset {}: {}", offset, e)))
    }

    /// Fetches a filing index page and extracts its acceptance timestamp.
    ///
    /// A page without the timestamp yields `Ok(None)`; only transport and
    /// HTTP status failures are errors.
    pub async fn resolve_timestamp(&self, index_url: &str) -> Result<Option<String>, EdgarError> {
        tracing::debug!("Resolving acceptance timestamp from: {}", index_url);
        self.pause().await;

        let response = self.http.get(index_url)
            .header(header::ACCEPT, "text/html,*/*")
            .send()
            .await?;
        let response = check_status(response, index_url)?;

        let body = response.text().await?;
        let timestamp = extract_accepted_timestamp(&body);
        if timestamp.is_none() {
            tracing::debug!("No acceptance timestamp found in {} ({} bytes)", index_url, body.len());
        }

        Ok(timestamp)
    }

    // --- Basic Rate Limiting ---
    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }
    }
}

fn check_status(response: reqwest::Response, url: &str) -> Result<reqwest::Response, EdgarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::error!("HTTP error status: {} for URL: {}", status, url);
    if status == reqwest::StatusCode::FORBIDDEN {
        tracing::warn!("Received 403 Forbidden - check User-Agent and rate limits.");
        return Err(EdgarError::RateLimited);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(EdgarError::NotFound(url.to_string()));
    }
    Err(EdgarError::Http(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockito::Matcher;
    use serde_json::json;
    use tokio_test::assert_err;

    const SEARCH_PATH: &str = "/LATEST/search-index";

    fn test_client(server: &mockito::ServerGuard) -> EdgarClient {
        EdgarClient::new(EdgarConfig {
            user_agent: "cyber8k-tests tests@example.com".to_string(),
            search_url: format!("{}{}", server.url(), SEARCH_PATH),
            archives_url: format!("{}/Archives/edgar/data", server.url()),
            request_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn query(max_results: usize) -> FilingQuery {
        FilingQuery {
            form_type: "8-K".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            max_results,
        }
    }

    fn page_body(total: u64, offset: usize, count: usize) -> String {
        let hits: Vec<_> = (offset..offset + count)
            .map(|i| {
                json!({
                    "_id": format!("0000000001-24-{:06}:doc{}.htm", i, i),
                    "_source": {
                        "display_names": [format!("COMPANY {}  (CO{})  (CIK 0000000001)", i, i)],
                        "ciks": ["0000000001"],
                        "file_date": "2024-01-10",
                        "form": "8-K",
                        "adsh": format!("0000000001-24-{:06}", i)
                    }
                })
            })
            .collect();
        json!({ "hits": { "total": { "value": total }, "hits": hits } }).to_string()
    }

    async fn mock_page(server: &mut mockito::ServerGuard, total: u64, offset: usize, count: usize) -> mockito::Mock {
        server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("from".into(), offset.to_string()),
                Matcher::UrlEncoded("size".into(), SEARCH_PAGE_SIZE.to_string()),
                Matcher::UrlEncoded("forms".into(), "8-K".into()),
                Matcher::UrlEncoded("startdt".into(), "2023-12-01".into()),
            ]))
            .match_header("user-agent", "cyber8k-tests tests@example.com")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page_body(total, offset, count))
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_pagination_stops_at_reported_total() {
        let mut server = mockito::Server::new_async().await;
        let first = mock_page(&mut server, 250, 0, 100).await;
        let second = mock_page(&mut server, 250, 100, 100).await;
        let third = mock_page(&mut server, 250, 200, 50).await;

        let client = test_client(&server);
        let filings = client.fetch_filings(&query(999_999)).await.unwrap();

        assert_eq!(filings.len(), 250);
        assert_eq!(filings[0].ticker.as_deref(), Some("CO0"));
        assert_eq!(filings[249].ticker.as_deref(), Some("CO249"));
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_short_page_ends_pagination() {
        let mut server = mockito::Server::new_async().await;
        // Server overstates the total; the short page still terminates.
        let only = mock_page(&mut server, 1_000, 0, 7).await;

        let client = test_client(&server);
        let filings = client.fetch_filings(&query(999_999)).await.unwrap();

        assert_eq!(filings.len(), 7);
        only.assert_async().await;
    }

    #[tokio::test]
    async fn test_max_results_caps_the_fetch() {
        let mut server = mockito::Server::new_async().await;
        let first = mock_page(&mut server, 250, 0, 100).await;

        let client = test_client(&server);
        let filings = client.fetch_filings(&query(40)).await.unwrap();

        assert_eq!(filings.len(), 40);
        first.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_page_aborts_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _first = mock_page(&mut server, 250, 0, 100).await;
        let _failing = server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::UrlEncoded("from".into(), "100".into()))
            .with_status(500)
            .create_async()
            .await;

        let client = test_client(&server);
        let result = client.fetch_filings(&query(999_999)).await;

        let err = assert_err!(result);
        assert!(matches!(err, EdgarError::Http(status) if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        let _garbage = server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>Service Unavailable</html>")
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client.fetch_filings(&query(10)).await.unwrap_err();
        assert!(matches!(err, EdgarError::Parse(_)));
    }

    #[tokio::test]
    async fn test_forbidden_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _forbidden = server
            .mock("GET", SEARCH_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client.fetch_filings(&query(10)).await.unwrap_err();
        assert!(matches!(err, EdgarError::RateLimited));
    }

    #[tokio::test]
    async fn test_resolve_timestamp_reads_second_info_block() {
        let mut server = mockito::Server::new_async().await;
        let index = server
            .mock("GET", "/Archives/edgar/data/1/000000000124000001/0000000001-24-000001-index.htm")
            .with_status(200)
            .with_body(r#"<div class="info">2024-01-10</div><div class="info">2024-01-09 17:31:44</div>"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let url = crate::edgar::models::filing_index_url(
            &client.config().archives_url,
            "1",
            "0000000001-24-000001",
        );
        let timestamp = client.resolve_timestamp(&url).await.unwrap();

        assert_eq!(timestamp.as_deref(), Some("2024-01-09 17:31:44"));
        index.assert_async().await;
    }

    #[tokio::test]
    async fn test_resolve_timestamp_single_marker_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _index = server
            .mock("GET", "/index.htm")
            .with_status(200)
            .with_body(r#"<div class="info">2024-01-10</div>"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let timestamp = client
            .resolve_timestamp(&format!("{}/index.htm", server.url()))
            .await
            .unwrap();
        assert_eq!(timestamp, None);
    }

    #[tokio::test]
    async fn test_resolve_timestamp_missing_page_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/gone-index.htm")
            .with_status(404)
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client
            .resolve_timestamp(&format!("{}/gone-index.htm", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, EdgarError::NotFound(_)));
    }
}
