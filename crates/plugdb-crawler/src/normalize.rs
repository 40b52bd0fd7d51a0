//! Text and URL cleanup applied to raw strings lifted out of vendor pages.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static PRICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$?\s*(\d[\d,]*(?:\.\d+)?)").expect("valid price regex")
});

static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("valid css url regex")
});

/// Parses the first monetary amount in `text`, ignoring an optional currency
/// symbol and thousands separators.
///
/// `"$1,299.00"` parses to `1299.0`. Returns `None` when no digits are found.
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let caps = PRICE_RE.captures(text)?;
    let digits = caps.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses a price and drops zero or negative amounts, which storefronts use
/// for "free" or placeholder prices.
#[must_use]
pub fn parse_positive_price(text: &str) -> Option<f64> {
    parse_price(text).filter(|v| *v > 0.0)
}

/// Collapses internal whitespace runs to single spaces and trims the ends.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `Some(trimmed)` for non-blank input.
#[must_use]
pub fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Extracts the URL from a CSS `background-image` value or inline style,
/// e.g. `background-image: url('/img/x.png')` yields `/img/x.png`.
#[must_use]
pub fn css_background_url(style: &str) -> Option<String> {
    CSS_URL_RE
        .captures(style)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Resolves a possibly relative URL scraped from a page on `origin`.
///
/// - protocol-relative (`//cdn...`) gains `https:`
/// - absolute `http(s)` URLs pass through
/// - root-relative paths are joined to `origin`, after stripping one
///   leading `/<origin-host>` segment that some storefronts duplicate
/// - other relative references are resolved against `origin`
///
/// Blank input and unresolvable references yield `None`.
#[must_use]
pub fn absolutize_url(origin: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_owned());
    }

    let base = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(origin, error = %e, "site origin is not a valid URL");
            return None;
        }
    };

    let path = match base.host_str() {
        Some(host) if raw.starts_with('/') => strip_host_segment(raw, host),
        _ => raw,
    };

    base.join(path).ok().map(String::from)
}

/// Removes one leading `/<host>` segment from a root-relative path.
fn strip_host_segment<'a>(path: &'a str, host: &str) -> &'a str {
    path.strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(host))
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(path)
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
