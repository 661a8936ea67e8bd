// src/extractors/ticker.rs

use once_cell::sync::Lazy;
use regex::Regex;

// EFTS display names look like "ACME CORP  (ACME, ACMW)  (CIK 0001234567)".
static PARENTHETICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((.*?)\)").expect("Failed to compile PARENTHETICAL_RE")
});

/// Label EDGAR uses for the CIK annotation; never a ticker.
const CIK_LABEL_PREFIX: &str = "CIK ";

/// Extracts the trading symbol from an EFTS display name.
///
/// Takes the first parenthetical group and, if it lists several symbols, the
/// first of them. Returns `None` when the group is the CIK annotation or empty.
pub fn extract_ticker(display_name: &str) -> Option<String> {
    let group = PARENTHETICAL_RE
        .captures(display_name)?
        .get(1)?
        .as_str();

    if group.starts_with(CIK_LABEL_PREFIX) {
        tracing::trace!("First parenthetical of '{}' is a CIK label, no ticker", display_name);
        return None;
    }

    let ticker = group.split(',').next().unwrap_or_default().trim();
    if ticker.is_empty() {
        return None;
    }

    Some(ticker.to_string())
}
