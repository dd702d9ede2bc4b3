//! Time-bucketed operational metrics.
//!
//! A metrics series is a named, append-only sequence of `(timestamp, value)`
//! pairs stored in the shared database, bucketed at one-second granularity.
//! Tracking twice within the same bucket overwrites the earlier value rather
//! than aggregating; callers that need aggregation do it before tracking.
//!
//! The storage split mirrors the queue: a [`MetricsStore`] trait, the
//! PostgreSQL-backed [`MetricsTracker`], and an in-memory tracker behind the
//! `test` feature.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Database, Pool};

#[cfg(feature = "postgres")]
use sqlx::Row;

#[cfg(feature = "test")]
use crate::queue::test::MockClock;
#[cfg(feature = "test")]
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
#[cfg(feature = "test")]
use tokio::sync::RwLock;

/// A single recorded observation: the bucket timestamp and the value stored
/// for that bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Truncate a timestamp to its one-second bucket.
pub(crate) fn bucket_for(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(timestamp.timestamp(), 0).unwrap_or(timestamp)
}

/// Storage operations for metric series.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Record `value` into the current-time bucket of the named series,
    /// creating the series on first use. A later call for the same bucket
    /// overwrites the value.
    async fn track(&self, series: &str, value: f64) -> Result<()>;

    /// The full recorded history for a series, ascending by bucket.
    /// Unknown series produce an empty sequence, not an error.
    async fn range(&self, series: &str) -> Result<Vec<MetricPoint>>;
}

/// Database-backed metrics tracker.
///
/// Like [`crate::JobQueue`], the pool is an injected capability; trackers may
/// share a pool with the queue they observe.
pub struct MetricsTracker<DB: Database> {
    pub pool: Pool<DB>,
}

impl<DB: Database> Clone for MetricsTracker<DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<DB: Database> MetricsTracker<DB> {
    pub fn new(pool: Pool<DB>) -> Self {
        Self { pool }
    }
}

#[cfg(feature = "postgres")]
impl MetricsTracker<sqlx::Postgres> {
    /// Create the backing table if it does not exist. Idempotent.
    pub async fn create_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS driftq_metrics (
                series TEXT NOT NULL,
                bucket TIMESTAMPTZ NOT NULL,
                value DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (series, bucket)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(feature = "postgres")]
#[async_trait]
impl MetricsStore for MetricsTracker<sqlx::Postgres> {
    async fn track(&self, series: &str, value: f64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO driftq_metrics (series, bucket, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (series, bucket) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(series)
        .bind(bucket_for(Utc::now()))
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn range(&self, series: &str) -> Result<Vec<MetricPoint>> {
        let rows = sqlx::query(
            "SELECT bucket, value FROM driftq_metrics WHERE series = $1 ORDER BY bucket ASC",
        )
        .bind(series)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MetricPoint {
                    timestamp: row.try_get("bucket")?,
                    value: row.try_get("value")?,
                })
            })
            .collect()
    }
}

/// In-memory metrics tracker driven by a [`MockClock`], for tests.
#[cfg(feature = "test")]
#[derive(Clone)]
pub struct InMemoryMetricsTracker {
    series: Arc<RwLock<HashMap<String, BTreeMap<DateTime<Utc>, f64>>>>,
    clock: MockClock,
}

#[cfg(feature = "test")]
impl InMemoryMetricsTracker {
    pub fn new() -> Self {
        Self::with_clock(MockClock::new())
    }

    pub fn with_clock(clock: MockClock) -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }
}

#[cfg(feature = "test")]
impl Default for InMemoryMetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "test")]
#[async_trait]
impl MetricsStore for InMemoryMetricsTracker {
    async fn track(&self, series: &str, value: f64) -> Result<()> {
        let bucket = bucket_for(self.clock.now());
        let mut all = self.series.write().await;
        all.entry(series.to_string()).or_default().insert(bucket, value);
        Ok(())
    }

    async fn range(&self, series: &str) -> Result<Vec<MetricPoint>> {
        let all = self.series.read().await;
        Ok(all
            .get(series)
            .map(|buckets| {
                buckets
                    .iter()
                    .map(|(timestamp, value)| MetricPoint {
                        timestamp: *timestamp,
                        value: *value,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
