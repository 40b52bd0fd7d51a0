use serde::{Deserialize, Serialize};

/// Currency assumed when a storefront does not state one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Developer label persisted when a record carries no developer.
pub const UNKNOWN_DEVELOPER: &str = "Unknown";

/// A plugin listing as scraped from a vendor page, before validation.
///
/// Every field except `name` may be absent. An absent price is `None`,
/// never `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidateRecord {
    pub name: String,
    pub developer: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    /// List price shown struck through next to a sale price.
    pub original_price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
    /// Product detail page on the vendor site.
    pub source_url: Option<String>,
}

impl RawCandidateRecord {
    /// Convenience constructor for a record carrying only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A record that passed the validation layer.
///
/// `name` is non-empty, `developer`, `description` and `currency` are always
/// populated (possibly with defaults), prices are finite and positive when
/// present, and URLs are absolute when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub name: String,
    pub developer: String,
    pub description: String,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}

impl ValidatedRecord {
    /// Developer used for catalog identity, falling back to
    /// [`UNKNOWN_DEVELOPER`] when the scraped value was empty.
    #[must_use]
    pub fn developer_or_unknown(&self) -> &str {
        if self.developer.trim().is_empty() {
            UNKNOWN_DEVELOPER
        } else {
            &self.developer
        }
    }

    /// Description as stored in the catalog: empty becomes absent.
    #[must_use]
    pub fn description_or_none(&self) -> Option<&str> {
        let trimmed = self.description.trim();
        (!trimmed.is_empty()).then_some(self.description.as_str())
    }
}
