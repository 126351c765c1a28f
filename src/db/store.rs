use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::config::{Config, DbBackend};
use crate::db::models::{Sample, SamplePoint};
use crate::error::Result;

/// Append-only persistence for probe samples, plus the two read paths the
/// aggregation layer needs. One implementation per backend; the rest of the
/// engine only ever sees this trait.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Idempotent creation of the samples relation and its composite index.
    /// Safe to call on every startup.
    async fn init_schema(&self) -> Result<()>;

    /// Appends all samples as one atomic batch. No upsert: duplicate
    /// `(host, port, ts)` rows simply accumulate.
    async fn insert_batch(&self, samples: &[Sample]) -> Result<()>;

    /// `(total, online_sum)` over `ts >= since_epoch` for one endpoint.
    /// `(0, 0)` when no rows match.
    async fn count_and_sum(&self, host: &str, port: u16, since_epoch: i64) -> Result<(i64, i64)>;

    /// All matching samples ordered ascending by `ts`. Empty when none match.
    async fn series(&self, host: &str, port: u16, since_epoch: i64) -> Result<Vec<SamplePoint>>;
}

/// Connects to the backend selected by the configuration.
pub async fn connect(cfg: &Config) -> Result<Arc<dyn SampleStore>> {
    match cfg.db_backend {
        DbBackend::Sqlite => {
            let options = SqliteConnectOptions::new()
                .filename(&cfg.db_path)
                .create_if_missing(true);
            let pool = SqlitePoolOptions::new().connect_with(options).await?;
            info!("SQLite store ready at {}", cfg.db_path);
            Ok(Arc::new(SqliteSampleStore::new(pool)))
        }
        DbBackend::Postgres => {
            let pool = PgPool::connect(&cfg.db_url).await?;
            info!("Postgres store ready");
            Ok(Arc::new(PostgresSampleStore::new(pool)))
        }
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

pub struct SqliteSampleStore {
    pool: SqlitePool,
}

impl SqliteSampleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                ts INTEGER NOT NULL,
                online INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_host_port_ts ON samples(host, port, ts)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_batch(&self, samples: &[Sample]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for s in samples {
            sqlx::query("INSERT INTO samples (host, port, ts, online) VALUES (?, ?, ?, ?)")
                .bind(&s.host)
                .bind(i64::from(s.port))
                .bind(s.ts)
                .bind(i64::from(s.online))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count_and_sum(&self, host: &str, port: u16, since_epoch: i64) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total, COALESCE(SUM(online), 0) AS online_sum
            FROM samples
            WHERE host = ? AND port = ? AND ts >= ?
            "#,
        )
        .bind(host)
        .bind(i64::from(port))
        .bind(since_epoch)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("total"), row.get("online_sum")))
    }

    async fn series(&self, host: &str, port: u16, since_epoch: i64) -> Result<Vec<SamplePoint>> {
        let rows = sqlx::query(
            r#"
            SELECT ts, online
            FROM samples
            WHERE host = ? AND port = ? AND ts >= ?
            ORDER BY ts ASC
            "#,
        )
        .bind(host)
        .bind(i64::from(port))
        .bind(since_epoch)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SamplePoint {
                t: row.get("ts"),
                v: row.get::<i64, _>("online") != 0,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

pub struct PostgresSampleStore {
    pool: PgPool,
}

impl PostgresSampleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleStore for PostgresSampleStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS samples (
                id BIGSERIAL PRIMARY KEY,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                ts BIGINT NOT NULL,
                online INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_samples_host_port_ts ON samples(host, port, ts)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_batch(&self, samples: &[Sample]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for s in samples {
            sqlx::query("INSERT INTO samples (host, port, ts, online) VALUES ($1, $2, $3, $4)")
                .bind(&s.host)
                .bind(i32::from(s.port))
                .bind(s.ts)
                .bind(i32::from(s.online))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn count_and_sum(&self, host: &str, port: u16, since_epoch: i64) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total, COALESCE(SUM(online), 0) AS online_sum
            FROM samples
            WHERE host = $1 AND port = $2 AND ts >= $3
            "#,
        )
        .bind(host)
        .bind(i32::from(port))
        .bind(since_epoch)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("total"), row.get("online_sum")))
    }

    async fn series(&self, host: &str, port: u16, since_epoch: i64) -> Result<Vec<SamplePoint>> {
        let rows = sqlx::query(
            r#"
            SELECT ts, online
            FROM samples
            WHERE host = $1 AND port = $2 AND ts >= $3
            ORDER BY ts ASC
            "#,
        )
        .bind(host)
        .bind(i32::from(port))
        .bind(since_epoch)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SamplePoint {
                t: row.get("ts"),
                v: row.get::<i32, _>("online") != 0,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
