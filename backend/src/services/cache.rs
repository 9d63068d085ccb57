//! SQLite-backed response cache
//!
//! Two tables:
//! - `series_cache`: fetched time series keyed by kind and request, valid for
//!   the configured TTL
//! - `precomputed`: endpoint payloads computed in the background, each with
//!   its own TTL

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use shared::TimeSeriesPoint;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use crate::error::AppResult;

/// Cache handle; cheap to clone
#[derive(Clone)]
pub struct CacheStore {
    pool: SqlitePool,
    series_ttl: Duration,
}

#[derive(Debug, FromRow)]
struct SeriesRow {
    data: String,
    created_at: i64,
}

#[derive(Debug, FromRow)]
struct PrecomputedRow {
    data: String,
    computed_at: i64,
    ttl_hours: i64,
}

/// A precomputed payload with the time it was produced
#[derive(Debug, Clone)]
pub struct Precomputed<T> {
    pub data: T,
    pub computed_at: DateTime<Utc>,
}

impl CacheStore {
    /// Open (creating if needed) the cache database and its tables
    pub async fn connect(database_url: &str, ttl_hours: i64) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::with_pool(pool, ttl_hours).await
    }

    /// Private in-memory cache. A single never-recycled connection keeps the
    /// database alive for the lifetime of the pool.
    pub async fn in_memory(ttl_hours: i64) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool, ttl_hours).await
    }

    async fn with_pool(pool: SqlitePool, ttl_hours: i64) -> AppResult<Self> {
        let store = Self {
            pool,
            series_ttl: Duration::hours(ttl_hours),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS series_cache (
                kind TEXT NOT NULL,
                cache_key TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (kind, cache_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS precomputed (
                kind TEXT NOT NULL,
                cache_key TEXT NOT NULL,
                data TEXT NOT NULL,
                computed_at INTEGER NOT NULL,
                ttl_hours INTEGER NOT NULL,
                PRIMARY KEY (kind, cache_key)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Connectivity probe for the health endpoint
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Cached series if present and younger than the TTL
    pub async fn get_series(&self, kind: &str, key: &str) -> AppResult<Option<Vec<TimeSeriesPoint>>> {
        let row = sqlx::query_as::<_, SeriesRow>(
            "SELECT data, created_at FROM series_cache WHERE kind = ? AND cache_key = ?",
        )
        .bind(kind)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if Utc::now().timestamp() - row.created_at > self.series_ttl.num_seconds() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&row.data)?))
    }

    pub async fn put_series(&self, kind: &str, key: &str, points: &[TimeSeriesPoint]) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO series_cache (kind, cache_key, data, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (kind, cache_key)
            DO UPDATE SET data = excluded.data, created_at = excluded.created_at
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(serde_json::to_string(points)?)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Precomputed payload if present and within its own TTL
    pub async fn get_precomputed<T: DeserializeOwned>(
        &self,
        kind: &str,
        key: &str,
    ) -> AppResult<Option<Precomputed<T>>> {
        let row = sqlx::query_as::<_, PrecomputedRow>(
            "SELECT data, computed_at, ttl_hours FROM precomputed WHERE kind = ? AND cache_key = ?",
        )
        .bind(kind)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Some(computed_at) = DateTime::<Utc>::from_timestamp(row.computed_at, 0) else {
            return Ok(None);
        };
        if Utc::now() - computed_at > Duration::hours(row.ttl_hours) {
            return Ok(None);
        }

        Ok(Some(Precomputed {
            data: serde_json::from_str(&row.data)?,
            computed_at,
        }))
    }

    pub async fn put_precomputed<T: Serialize>(
        &self,
        kind: &str,
        key: &str,
        data: &T,
        ttl_hours: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO precomputed (kind, cache_key, data, computed_at, ttl_hours)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (kind, cache_key)
            DO UPDATE SET data = excluded.data,
                          computed_at = excluded.computed_at,
                          ttl_hours = excluded.ttl_hours
            "#,
        )
        .bind(kind)
        .bind(key)
        .bind(serde_json::to_string(data)?)
        .bind(Utc::now().timestamp())
        .bind(ttl_hours)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete series older than twice the TTL and expired precomputed rows.
    /// Returns the number of rows removed.
    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        let now = Utc::now().timestamp();
        let series_cutoff = now - 2 * self.series_ttl.num_seconds();

        let series = sqlx::query("DELETE FROM series_cache WHERE created_at < ?")
            .bind(series_cutoff)
            .execute(&self.pool)
            .await?;
        let precomputed =
            sqlx::query("DELETE FROM precomputed WHERE computed_at + ttl_hours * 3600 < ?")
                .bind(now)
                .execute(&self.pool)
                .await?;

        Ok(series.rows_affected() + precomputed.rows_affected())
    }

    #[cfg(test)]
    async fn backdate(&self, table: &str, seconds: i64) -> AppResult<()> {
        let column = if table == "precomputed" { "computed_at" } else { "created_at" };
        sqlx::query(&format!("UPDATE {table} SET {column} = {column} - ?"))
            .bind(seconds)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
