//! HTTP dataset download.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::AppError;
use crate::io::{ParsedColumns, parse_columns};

/// Environment variable naming an alternative example dataset URL.
pub const EXAMPLE_URL_ENV: &str = "FUNCFIT_EXAMPLE_URL";

const TIMEOUT: Duration = Duration::from_secs(30);

/// `true` if `source` should be fetched rather than read from disk.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// `FUNCFIT_EXAMPLE_URL`, with `.env` taken into account.
pub fn example_url_from_env() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var(EXAMPLE_URL_ENV).ok().filter(|v| !v.trim().is_empty())
}

/// GET `url` and return the body as text.
pub fn fetch_text(url: &str) -> Result<String, AppError> {
    let client = Client::builder()
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;

    let resp = client
        .get(url)
        .send()
        .map_err(|e| AppError::new(2, format!("Request to {url} failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(AppError::new(
            2,
            format!("Request to {url} failed with status {}.", resp.status()),
        ));
    }

    resp.text()
        .map_err(|e| AppError::new(2, format!("Failed to read response from {url}: {e}")))
}

/// Download and parse a column file.
pub fn fetch_columns(url: &str) -> Result<ParsedColumns, AppError> {
    let text = fetch_text(url)?;
    let parsed = parse_columns(&text).map_err(|e| AppError::new(2, format!("Failed to parse {url}: {e}")))?;
    log::info!("fetched {} rows from {url}", parsed.len());
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_urls() {
        assert!(is_url("https://example.org/data.xye"));
        assert!(is_url("http://localhost:8000/a.dat"));
        assert!(!is_url("data/http.dat"));
        assert!(!is_url("./https"));
    }

    #[test]
    fn unreachable_host_is_an_input_error() {
        let err = fetch_text("http://127.0.0.1:1/none.dat").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
