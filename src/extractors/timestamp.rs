// src/extractors/timestamp.rs

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

// Filing index pages render "Filing Date", "Accepted", "Documents", ... as
// consecutive <div class="info"> blocks. The second one is the acceptance time.
static INFO_DIV_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[class="info"]"#).expect("Failed to compile INFO_DIV_SELECTOR")
});

const ACCEPTED_INFO_POSITION: usize = 1;

/// Extracts the acceptance timestamp (Eastern Time, e.g. `2024-05-29 16:05:12`)
/// from a filing index page.
///
/// Returns `None` when the page has fewer than two info blocks.
pub fn extract_accepted_timestamp(index_html: &str) -> Option<String> {
    let document = Html::parse_document(index_html);

    let accepted = document
        .select(&INFO_DIV_SELECTOR)
        .nth(ACCEPTED_INFO_POSITION)?;

    let text = accepted.text().collect::<String>();
    let text = text.trim();
    tracing::trace!("Found accepted info block: '{}'", text);

    Some(text.to_string())
}
