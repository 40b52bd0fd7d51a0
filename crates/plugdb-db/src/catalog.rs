//! Read side of the `plugins` catalog: paging, search and slug lookup.

use chrono::{DateTime, Utc};
use plugdb_core::name_to_slug;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `plugins` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CatalogEntryRow {
    pub id: i64,
    pub name: String,
    /// `Unknown` when the source did not name one.
    pub developer: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    /// Label of the vendor site the entry was crawled from.
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntryRow {
    #[must_use]
    pub fn slug(&self) -> String {
        name_to_slug(&self.name)
    }
}

/// One page of catalog entries plus the size of the whole filtered set.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntryRow>,
    pub total: i64,
}

const ENTRY_COLUMNS: &str = "id, name, developer, description, price, currency, image_url, \
                             source_url, source, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Escapes `LIKE`/`ILIKE` metacharacters so user input matches literally.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Returns catalog entries newest first, optionally filtered by a
/// case-insensitive substring of name, developer or description.
///
/// A blank `search` means no filter.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_catalog_entries(
    pool: &PgPool,
    offset: i64,
    limit: i64,
    search: Option<&str>,
) -> Result<CatalogPage, DbError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let filter = "($1::text IS NULL \
                   OR name ILIKE $1 ESCAPE '\\' \
                   OR developer ILIKE $1 ESCAPE '\\' \
                   OR description ILIKE $1 ESCAPE '\\')";

    let entries = sqlx::query_as::<_, CatalogEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM plugins WHERE {filter} \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(pattern.as_deref())
    .bind(limit.max(0))
    .bind(offset.max(0))
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM plugins WHERE {filter}"
    ))
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(CatalogPage { entries, total })
}

/// Fetches a single entry by its `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_entry(pool: &PgPool, id: i64) -> Result<CatalogEntryRow, DbError> {
    let row = sqlx::query_as::<_, CatalogEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM plugins WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Finds the newest entry whose name slugifies to `slug`.
///
/// Candidates are narrowed with a loose `ILIKE` built from the slug's words,
/// then compared exactly in Rust, since the slug is not stored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_catalog_entry_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<CatalogEntryRow>, DbError> {
    let wanted = name_to_slug(slug);
    if wanted.is_empty() {
        return Ok(None);
    }

    let candidates = sqlx::query_as::<_, CatalogEntryRow>(&format!(
        "SELECT {ENTRY_COLUMNS} FROM plugins WHERE name ILIKE $1 ESCAPE '\\' \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(slug_like_pattern(&wanted))
    .fetch_all(pool)
    .await?;

    Ok(candidates.into_iter().find(|row| row.slug() == wanted))
}

/// `fg-ds-902` becomes `%f%g%d%s%9%0%2%`.
///
/// Every slug character appears in the name in the same order, so any
/// punctuation the slug dropped (`A/B`, `Dave's`, `Re.Verb`) still matches.
/// Slug characters are ASCII alphanumerics and need no escaping.
fn slug_like_pattern(slug: &str) -> String {
    let mut pattern = String::with_capacity(slug.len() * 2 + 1);
    pattern.push('%');
    for ch in slug.chars().filter(char::is_ascii_alphanumeric) {
        pattern.push(ch);
        pattern.push('%');
    }
    pattern
}
