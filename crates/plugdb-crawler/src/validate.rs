//! The single boundary between scraped data and data the catalog trusts.
//!
//! Rejection is a value, not an error: the orchestrator records the reason and
//! moves on to the next record.

use plugdb_core::{RawCandidateRecord, ValidatedRecord, DEFAULT_CURRENCY};
use reqwest::Url;

/// Why a record was turned away.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    EmptyName,
    InvalidPrice { field: &'static str, value: f64 },
    InvalidUrl { field: &'static str, value: String },
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::EmptyName => write!(f, "name: must not be empty"),
            RejectReason::InvalidPrice { field, value } => {
                write!(f, "{field}: expected a positive finite amount, got {value}")
            }
            RejectReason::InvalidUrl { field, value } => {
                write!(f, "{field}: not an absolute URL: {value}")
            }
        }
    }
}

/// A rejected record and every rule it broke.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub record: RawCandidateRecord,
    pub reasons: Vec<RejectReason>,
}

impl RejectedRecord {
    /// One-line description suitable for a run's error list.
    #[must_use]
    pub fn summary(&self) -> String {
        let reasons: Vec<String> = self.reasons.iter().map(ToString::to_string).collect();
        let name = if self.record.name.trim().is_empty() {
            "<unnamed>"
        } else {
            self.record.name.as_str()
        };
        format!("record validation failed for {name}: {}", reasons.join("; "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid(ValidatedRecord),
    Rejected(RejectedRecord),
}

/// Applies the catalog's record rules.
///
/// - the name must contain non-whitespace text
/// - missing developer and description become empty strings
/// - missing currency becomes `USD`
/// - prices, when present, must be finite and greater than zero
/// - image and detail URLs, when present and non-blank, must be absolute
///
/// Every broken rule is reported, not just the first.
#[must_use]
pub fn validate_record(raw: RawCandidateRecord) -> ValidationOutcome {
    let mut reasons = Vec::new();

    let name = raw.name.trim().to_string();
    if name.is_empty() {
        reasons.push(RejectReason::EmptyName);
    }

    check_price("price", raw.price, &mut reasons);
    check_price("original_price", raw.original_price, &mut reasons);
    let image_url = check_url("image_url", raw.image_url.as_deref(), &mut reasons);
    let source_url = check_url("source_url", raw.source_url.as_deref(), &mut reasons);

    if !reasons.is_empty() {
        return ValidationOutcome::Rejected(RejectedRecord {
            record: raw,
            reasons,
        });
    }

    let currency = raw
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CURRENCY)
        .to_string();

    ValidationOutcome::Valid(ValidatedRecord {
        name,
        developer: raw.developer.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        price: raw.price,
        original_price: raw.original_price,
        currency,
        image_url,
        source_url,
    })
}

fn check_price(field: &'static str, value: Option<f64>, reasons: &mut Vec<RejectReason>) {
    if let Some(v) = value {
        if !v.is_finite() || v <= 0.0 {
            reasons.push(RejectReason::InvalidPrice { field, value: v });
        }
    }
}

/// Blank means "no URL". Anything else must parse with a scheme and host.
fn check_url(
    field: &'static str,
    value: Option<&str>,
    reasons: &mut Vec<RejectReason>,
) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() => Some(trimmed.to_string()),
        _ => {
            reasons.push(RejectReason::InvalidUrl {
                field,
                value: trimmed.to_string(),
            });
            None
        }
    }
}
