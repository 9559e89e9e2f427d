use crate::traits::ArticleCache;
use crate::types::{AggregatorError, Article, ArticleView, Result};
use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::{Any, AnyPool, Row, Transaction};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const TABLE: &str = "articles";
const BACKUP_TABLE: &str = "articles_old";

const RESTORE_ROW_SQL: &str =
    r#"INSERT INTO articles (id, title, link, source, "timestamp") VALUES ($1, $2, $3, $4, $5)"#;
// Tables from before the unique link constraint need the explicit link guard.
const MERGE_ROW_SQL: &str = r#"INSERT INTO articles (id, title, link, source, "timestamp")
    SELECT $1, $2, $3, $4, $5
    WHERE NOT EXISTS (SELECT 1 FROM articles WHERE link = $3)
    ON CONFLICT DO NOTHING"#;

/// Database flavour, picked from the connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(database_url: &str) -> Result<Self> {
        let scheme = database_url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(AggregatorError::Config(format!(
                "Unsupported database scheme '{}', expected sqlite or postgres",
                other
            ))),
        }
    }

    /// True for SQLite URLs that name no file, e.g. `sqlite::memory:` or
    /// `sqlite://cache.db?mode=memory`.
    pub fn is_in_memory(self, database_url: &str) -> bool {
        self == Backend::Sqlite && (database_url.contains(":memory:") || database_url.contains("mode=memory"))
    }

    fn create_table_sql(self) -> String {
        let id_column = match self {
            Backend::Sqlite => "id INTEGER PRIMARY KEY",
            Backend::Postgres => "id BIGSERIAL PRIMARY KEY",
        };
        format!(
            r#"
            CREATE TABLE {TABLE} (
                {id_column},
                title TEXT NOT NULL,
                link TEXT NOT NULL UNIQUE,
                source TEXT NOT NULL,
                "timestamp" BIGINT NOT NULL CHECK ("timestamp" > 0)
            )
            "#
        )
    }

    fn table_exists_sql(self, table: &str) -> String {
        match self {
            Backend::Sqlite => {
                format!("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '{table}'")
            }
            Backend::Postgres => format!(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = '{table}'"
            ),
        }
    }
}

/// What `initialize` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The table did not exist and was created empty.
    Created,
    /// The table existed and was rebuilt with its rows carried over.
    Rebuilt { restored: usize },
}

/// Article cache over SQLite or PostgreSQL.
pub struct ArticleStore {
    pool: AnyPool,
    backend: Backend,
    // SQLite has a single writer; keep our own writers from contending for it.
    write_lock: Mutex<()>,
}

impl ArticleStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let backend = Backend::from_url(database_url)?;
        sqlx::any::install_default_drivers();

        let options = AnyPoolOptions::new().acquire_timeout(Duration::from_secs(10));
        // Every connection to an in-memory SQLite database sees its own
        // empty database, so keep exactly one connection alive for the pool's lifetime.
        let options = if backend.is_in_memory(database_url) {
            debug!("In-memory SQLite database, using a single connection");
            options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options.max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .map_err(storage_error)?;

        debug!("Opened {:?} connection pool", backend);
        Ok(Self {
            pool,
            backend,
            write_lock: Mutex::new(()),
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Round-trip a trivial query to confirm the backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Bring the `articles` table to the current schema.
    ///
    /// A missing table is created. An existing one is rebuilt: its rows are
    /// read, the table is moved aside, a fresh table is created, every row is
    /// reinserted with its original id and timestamp, and the moved-aside
    /// table is dropped. Everything happens in one transaction, so a failure
    /// leaves the previous table untouched. A moved-aside table left behind
    /// by an interrupted run is folded back in first.
    pub async fn initialize(&self) -> Result<InitOutcome> {
        let _guard = self.write_lock.lock().await;
        info!("Starting article table initialization");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AggregatorError::migration("begin", e))?;

        self.recover_backup(&mut tx).await?;

        let outcome = if self.table_exists(&mut tx, TABLE).await? {
            let rows = read_rows(&mut tx, TABLE).await?;
            info!("Rebuilding '{}' with {} existing rows", TABLE, rows.len());

            sqlx::query(&format!("ALTER TABLE {TABLE} RENAME TO {BACKUP_TABLE}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| AggregatorError::migration("rename", e))?;

            self.create_table(&mut tx).await?;
            let restored = restore_rows(&mut tx, &rows).await?;
            self.reset_id_sequence(&mut tx).await?;
            drop_backup(&mut tx).await?;

            InitOutcome::Rebuilt { restored }
        } else {
            self.create_table(&mut tx).await?;
            InitOutcome::Created
        };

        tx.commit()
            .await
            .map_err(|e| AggregatorError::migration("commit", e))?;

        info!("Article table initialization completed: {:?}", outcome);
        Ok(outcome)
    }

    async fn recover_backup(&self, tx: &mut Transaction<'static, Any>) -> Result<()> {
        if !self.table_exists(tx, BACKUP_TABLE).await? {
            return Ok(());
        }

        if self.table_exists(tx, TABLE).await? {
            let rows = read_rows(tx, BACKUP_TABLE).await?;
            let mut merged = 0;
            for row in &rows {
                let result = insert_row(row, MERGE_ROW_SQL)
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| AggregatorError::migration("recover", e))?;
                merged += result.rows_affected() as usize;
            }
            warn!(
                "Recovered interrupted migration: merged {} of {} rows from '{}'",
                merged,
                rows.len(),
                BACKUP_TABLE
            );
            drop_backup(tx).await?;
        } else {
            warn!("Recovered interrupted migration: restoring '{}' as '{}'", BACKUP_TABLE, TABLE);
            sqlx::query(&format!("ALTER TABLE {BACKUP_TABLE} RENAME TO {TABLE}"))
                .execute(&mut **tx)
                .await
                .map_err(|e| AggregatorError::migration("recover", e))?;
        }
        Ok(())
    }

    async fn table_exists(&self, tx: &mut Transaction<'static, Any>, table: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&self.backend.table_exists_sql(table))
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AggregatorError::migration("inspect", e))?;
        Ok(count > 0)
    }

    async fn create_table(&self, tx: &mut Transaction<'static, Any>) -> Result<()> {
        debug!("Creating the '{}' table", TABLE);
        sqlx::query(&self.backend.create_table_sql())
            .execute(&mut **tx)
            .await
            .map_err(|e| AggregatorError::migration("create", e))?;
        Ok(())
    }

    /// Restored rows carry explicit ids; move the PostgreSQL sequence past them.
    async fn reset_id_sequence(&self, tx: &mut Transaction<'static, Any>) -> Result<()> {
        if self.backend != Backend::Postgres {
            return Ok(());
        }
        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{TABLE}', 'id'), \
             COALESCE((SELECT MAX(id) FROM {TABLE}), 0) + 1, false)"
        ))
        .execute(&mut **tx)
        .await
        .map_err(|e| AggregatorError::migration("sequence", e))?;
        Ok(())
    }

    pub async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {TABLE}"))
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(count as usize)
    }

    /// Every stored row regardless of age, in id order.
    pub async fn all_articles(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query(&format!(
            r#"SELECT id, title, link, source, "timestamp" FROM {TABLE} ORDER BY id"#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(Article {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                link: row.try_get("link")?,
                source: row.try_get("source")?,
                timestamp: row.try_get("timestamp")?,
            });
        }
        Ok(articles)
    }
}

#[async_trait]
impl ArticleCache for ArticleStore {
    async fn fetch_fresh(&self, now: i64, ttl: Duration) -> Result<Vec<ArticleView>> {
        let ttl_seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(ttl_seconds);

        let rows = sqlx::query(&format!(
            r#"SELECT title, link, source FROM {TABLE} WHERE "timestamp" > $1 ORDER BY id"#
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(ArticleView {
                title: row.try_get("title")?,
                link: row.try_get("link")?,
                source: row.try_get("source")?,
            });
        }

        debug!("Found {} fresh articles (cutoff {})", articles.len(), cutoff);
        Ok(articles)
    }

    async fn save_if_absent(&self, articles: &[ArticleView], now: i64) -> Result<usize> {
        if now <= 0 {
            return Err(AggregatorError::InvalidTimestamp(now));
        }
        if articles.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        let mut stored_count = 0;

        for article in articles {
            let result = sqlx::query(&format!(
                r#"INSERT INTO {TABLE} (title, link, source, "timestamp") VALUES ($1, $2, $3, $4)
                ON CONFLICT (link) DO NOTHING"#
            ))
            .bind(article.title.as_str())
            .bind(article.link.as_str())
            .bind(article.source.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

            stored_count += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(storage_error)?;

        info!("Stored {} new articles out of {} candidates", stored_count, articles.len());
        Ok(stored_count)
    }
}

/// A row as found in a table of possibly older schema.
struct StoredRow {
    id: i64,
    title: String,
    link: String,
    source: String,
    timestamp: i64,
}

async fn read_rows(tx: &mut Transaction<'static, Any>, table: &str) -> Result<Vec<StoredRow>> {
    let rows = sqlx::query(&format!(
        r#"SELECT CAST(id AS BIGINT) AS id, title, link, source,
           CAST("timestamp" AS BIGINT) AS "timestamp" FROM {table} ORDER BY id"#
    ))
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| AggregatorError::migration("read", e))?;

    let mut stored = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Option<i64> = row
            .try_get("id")
            .map_err(|e| AggregatorError::migration("read", e))?;
        let title: Option<String> = row
            .try_get("title")
            .map_err(|e| AggregatorError::migration("read", e))?;
        let link: Option<String> = row
            .try_get("link")
            .map_err(|e| AggregatorError::migration("read", e))?;
        let source: Option<String> = row
            .try_get("source")
            .map_err(|e| AggregatorError::migration("read", e))?;
        let timestamp: Option<i64> = row
            .try_get("timestamp")
            .map_err(|e| AggregatorError::migration("read", e))?;

        let (Some(id), Some(link)) = (id, link) else {
            return Err(AggregatorError::migration("read", format!("row in '{}' without id or link", table)));
        };
        let timestamp = match timestamp {
            Some(ts) if ts > 0 => ts,
            other => {
                return Err(AggregatorError::migration(
                    "read",
                    format!("row {} ({}) has invalid timestamp {:?}", id, link, other),
                ))
            }
        };

        stored.push(StoredRow {
            id,
            title: title.unwrap_or_default(),
            link,
            source: source.unwrap_or_default(),
            timestamp,
        });
    }
    Ok(stored)
}

fn insert_row<'a>(row: &'a StoredRow, sql: &'static str) -> sqlx::query::Query<'a, Any, AnyArguments<'a>> {
    sqlx::query(sql)
        .bind(row.id)
        .bind(row.title.as_str())
        .bind(row.link.as_str())
        .bind(row.source.as_str())
        .bind(row.timestamp)
}

async fn restore_rows(tx: &mut Transaction<'static, Any>, rows: &[StoredRow]) -> Result<usize> {
    debug!("Restoring {} rows into the new '{}' table", rows.len(), TABLE);
    for row in rows {
        insert_row(row, RESTORE_ROW_SQL)
            .execute(&mut **tx)
            .await
            .map_err(|e| AggregatorError::migration("restore", e))?;
    }
    Ok(rows.len())
}

async fn drop_backup(tx: &mut Transaction<'static, Any>) -> Result<()> {
    debug!("Dropping '{}' if it exists", BACKUP_TABLE);
    sqlx::query(&format!("DROP TABLE IF EXISTS {BACKUP_TABLE}"))
        .execute(&mut **tx)
        .await
        .map_err(|e| AggregatorError::migration("drop", e))?;
    Ok(())
}

/// Connection-level failures mean the store is unreachable; anything else is a
/// plain database error.
fn storage_error(err: sqlx::Error) -> AggregatorError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            AggregatorError::StorageUnavailable(err.to_string())
        }
        other => AggregatorError::Database(other),
    }
}
