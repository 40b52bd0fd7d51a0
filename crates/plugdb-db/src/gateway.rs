//! Write side of the catalog: idempotent per-record upserts of crawl output.
//!
//! Identity is the detail-page URL when the record has one, otherwise
//! `(name, developer, source)`. Writes are per record; one failure is counted
//! and the batch moves on.

use async_trait::async_trait;
use plugdb_core::ValidatedRecord;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// Column values written for one catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntryWrite {
    pub name: String,
    pub developer: String,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
    pub source: String,
}

impl CatalogEntryWrite {
    /// Maps a validated record onto catalog columns: blank developer becomes
    /// `Unknown`, blank description becomes `NULL`, price is rounded to cents.
    /// A price that rounds to zero is stored as absent.
    #[must_use]
    pub fn from_record(record: &ValidatedRecord, source: &str) -> Self {
        Self {
            name: record.name.clone(),
            developer: record.developer_or_unknown().to_string(),
            description: record.description_or_none().map(str::to_string),
            price: record
                .price
                .and_then(Decimal::from_f64)
                .map(|p| p.round_dp(2))
                .filter(|p| *p > Decimal::ZERO),
            currency: record.currency.clone(),
            image_url: record.image_url.clone(),
            source_url: record.source_url.clone(),
            source: source.to_string(),
        }
    }
}

/// Storage operations the gateway needs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<i64>, DbError>;

    async fn find_by_identity(
        &self,
        name: &str,
        developer: &str,
        source: &str,
    ) -> Result<Option<i64>, DbError>;

    /// Inserts a new entry and returns its id.
    async fn insert_entry(&self, entry: &CatalogEntryWrite) -> Result<i64, DbError>;

    /// Refreshes the listing columns of entry `id` (description, price,
    /// currency, image and detail URLs) and bumps `updated_at`. Name,
    /// developer and source label keep their stored values.
    async fn update_entry(&self, id: i64, entry: &CatalogEntryWrite) -> Result<(), DbError>;
}

/// Counters for one [`save_batch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

impl SaveSummary {
    /// Records written, new or refreshed.
    #[must_use]
    pub fn saved(&self) -> usize {
        self.inserted + self.updated
    }

    /// Records that already existed. They are refreshed, not duplicated.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.updated
    }
}

/// Upserts `records` crawled from `source` one at a time.
///
/// An empty batch is a no-op. Lookup or write failures for one record are
/// logged and counted in [`SaveSummary::errors`]; they never stop the batch.
pub async fn save_batch<S>(store: &S, records: &[ValidatedRecord], source: &str) -> SaveSummary
where
    S: CatalogStore + ?Sized,
{
    let mut summary = SaveSummary::default();

    for record in records {
        let entry = CatalogEntryWrite::from_record(record, source);
        match upsert_one(store, &entry).await {
            Ok(Upserted::Inserted(id)) => {
                tracing::debug!(id, name = %entry.name, "catalog entry inserted");
                summary.inserted += 1;
            }
            Ok(Upserted::Updated(id)) => {
                tracing::debug!(id, name = %entry.name, "catalog entry refreshed");
                summary.updated += 1;
            }
            Err(e) => {
                tracing::warn!(
                    name = %entry.name,
                    source,
                    error = %e,
                    "failed to save catalog entry"
                );
                summary.errors += 1;
            }
        }
    }

    tracing::info!(
        source,
        inserted = summary.inserted,
        updated = summary.updated,
        errors = summary.errors,
        "catalog batch saved"
    );
    summary
}

enum Upserted {
    Inserted(i64),
    Updated(i64),
}

async fn upsert_one<S>(store: &S, entry: &CatalogEntryWrite) -> Result<Upserted, DbError>
where
    S: CatalogStore + ?Sized,
{
    let mut existing = None;
    if let Some(url) = entry.source_url.as_deref() {
        existing = store.find_by_source_url(url).await?;
    }
    if existing.is_none() {
        existing = store
            .find_by_identity(&entry.name, &entry.developer, &entry.source)
            .await?;
    }

    match existing {
        Some(id) => {
            store.update_entry(id, entry).await?;
            Ok(Upserted::Updated(id))
        }
        None => Ok(Upserted::Inserted(store.insert_entry(entry).await?)),
    }
}

// ---------------------------------------------------------------------------
// Postgres store
// ---------------------------------------------------------------------------

/// [`CatalogStore`] over the `plugins` table.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_by_source_url(&self, source_url: &str) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM plugins WHERE source_url = $1 ORDER BY id LIMIT 1",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_by_identity(
        &self,
        name: &str,
        developer: &str,
        source: &str,
    ) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM plugins \
             WHERE name = $1 AND developer = $2 AND source = $3 \
             ORDER BY id LIMIT 1",
        )
        .bind(name)
        .bind(developer)
        .bind(source)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_entry(&self, entry: &CatalogEntryWrite) -> Result<i64, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO plugins \
                 (name, developer, description, price, currency, image_url, source_url, source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id",
        )
        .bind(&entry.name)
        .bind(&entry.developer)
        .bind(entry.description.as_deref())
        .bind(entry.price)
        .bind(&entry.currency)
        .bind(entry.image_url.as_deref())
        .bind(entry.source_url.as_deref())
        .bind(&entry.source)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_entry(&self, id: i64, entry: &CatalogEntryWrite) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE plugins SET \
                 description = $1, price = $2, currency = $3, \
                 image_url = $4, source_url = $5, updated_at = NOW() \
             WHERE id = $6",
        )
        .bind(entry.description.as_deref())
        .bind(entry.price)
        .bind(&entry.currency)
        .bind(entry.image_url.as_deref())
        .bind(entry.source_url.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "gateway_test.rs"]
mod tests;
