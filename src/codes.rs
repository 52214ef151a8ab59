//! Text transforms along the identifier chain.
//!
//! The attribute service returns full tickers with an asset-class suffix
//! (`"EUN5 GY Equity"`) and expects the same form back for bulk lookups.
//! Internally tickers are stored bare; position codes are derived from the
//! display-name attribute.

/// Asset-class suffix carried by full market tickers.
pub const EQUITY_SUFFIX: &str = " Equity";

const POSITION_CODE_PREFIX: &str = "NMP.";

/// Normalizes a raw resolved ticker: drops the trailing asset-class suffix
/// and surrounding whitespace. Returns `None` when nothing remains.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let bare = raw
        .trim_end()
        .strip_suffix(EQUITY_SUFFIX)
        .unwrap_or(raw)
        .trim();
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_string())
    }
}

/// Formats a bare market ticker for a bulk attribute call. Already-suffixed
/// tickers pass through unchanged.
pub fn format_equity_ticker(ticker: &str) -> String {
    if ticker.ends_with(EQUITY_SUFFIX) {
        ticker.to_string()
    } else {
        format!("{ticker}{EQUITY_SUFFIX}")
    }
}

/// Builds the position code for a display name: fixed prefix, spaces become
/// underscores.
pub fn position_code(display_name: &str) -> String {
    format!("{}{}", POSITION_CODE_PREFIX, display_name.replace(' ', "_"))
}
