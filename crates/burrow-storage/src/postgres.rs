use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeletionRequest, NewUrl, OwnedUrl, OwnerId, ReadStorage, ServiceStats, ShortCode, Storage,
    StorageError,
};
use jiff::Timestamp;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};

const CREATE_URLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    id BIGSERIAL PRIMARY KEY,
    short_code VARCHAR(32) NOT NULL,
    original_url TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
    created_at BIGINT NOT NULL
)
"#;

const ORIGINAL_URL_KEY: &str = "urls_original_url_key";
const SHORT_CODE_KEY: &str = "urls_short_code_key";

const CREATE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS urls_original_url_key ON urls (original_url)",
    "CREATE UNIQUE INDEX IF NOT EXISTS urls_short_code_key ON urls (short_code)",
    "CREATE INDEX IF NOT EXISTS urls_owner_id_idx ON urls (owner_id)",
];

/// Postgres caps a single statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;
const INSERT_COLUMNS: usize = 4;
const DELETE_COLUMNS: usize = 2;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Postgres implementation of the storage contract.
///
/// `original_url` is unique, so shortening the same URL twice returns
/// [`StorageError::Conflict`] and callers resolve the existing code with
/// [`ReadStorage::short_code_for`]. Soft delete flips `is_deleted`; rows are
/// never removed.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Creates a storage from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a storage by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Classifies a unique violation by the index that raised it.
fn map_write_error(err: sqlx::Error, subject: &str) -> StorageError {
    let violated = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().map(str::to_owned));

    match violated {
        Some(Some(constraint)) if constraint == SHORT_CODE_KEY => {
            StorageError::CodeCollision(subject.to_string())
        }
        Some(Some(constraint)) if constraint == ORIGINAL_URL_KEY => {
            StorageError::Conflict(subject.to_string())
        }
        Some(_) => StorageError::Conflict(subject.to_string()),
        None => map_sqlx_error(err),
    }
}

#[async_trait]
impl ReadStorage for PostgresStorage {
    async fn get_url(&self, code: &ShortCode) -> Result<String> {
        let row = sqlx::query(
            r#"
            SELECT original_url, is_deleted
            FROM urls
            WHERE short_code = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(code.to_string()));
        };

        let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
        if is_deleted {
            return Err(StorageError::Gone(code.to_string()));
        }

        row.try_get("original_url").map_err(map_sqlx_error)
    }

    async fn short_code_for(&self, original_url: &str) -> Result<ShortCode> {
        let code: Option<String> = sqlx::query_scalar(
            r#"
            SELECT short_code
            FROM urls
            WHERE original_url = $1
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        code.map(ShortCode::new_unchecked)
            .ok_or_else(|| StorageError::NotFound(original_url.to_string()))
    }

    async fn list_urls_for_owner(&self, owner: &OwnerId) -> Result<Vec<OwnedUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url
            FROM urls
            WHERE owner_id = $1
            ORDER BY id
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
                let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
                Ok(OwnedUrl {
                    short_code: ShortCode::new_unchecked(short_code),
                    original_url,
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<ServiceStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE NOT is_deleted) AS urls,
                COUNT(DISTINCT owner_id) AS users
            FROM urls
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;

        Ok(ServiceStats {
            urls: urls.max(0) as u64,
            users: users.max(0) as u64,
        })
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(CREATE_URLS_TABLE)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        for statement in CREATE_INDEXES {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        info!("postgres schema ready");
        Ok(())
    }

    async fn save_url(&self, original_url: &str, code: &ShortCode, owner: &OwnerId) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO urls (short_code, original_url, owner_id, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(code.as_str())
        .bind(original_url)
        .bind(owner.as_str())
        .bind(now_unix_seconds())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) => Err(match map_write_error(err, original_url) {
                StorageError::CodeCollision(_) => StorageError::CodeCollision(code.to_string()),
                other => other,
            }),
        }
    }

    async fn bulk_save_urls(&self, records: &[NewUrl], owner: &OwnerId) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let created_at = now_unix_seconds();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // One multi-row INSERT per chunk; chunking only kicks in past the
        // bind-parameter limit and the transaction keeps it all-or-nothing.
        for chunk in records.chunks(MAX_BIND_PARAMS / INSERT_COLUMNS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO urls (short_code, original_url, owner_id, created_at) ",
            );
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.short_code.as_str().to_owned())
                    .push_bind(record.original_url.clone())
                    .push_bind(owner.as_str().to_owned())
                    .push_bind(created_at);
            });

            builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|err| map_write_error(err, "bulk insert"))?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(owner = %owner, records = records.len(), "bulk insert committed");
        Ok(())
    }

    async fn soft_delete(&self, requests: &[DeletionRequest]) -> Result<()> {
        let pairs: Vec<(&str, &str)> = requests
            .iter()
            .flat_map(|request| {
                request
                    .short_codes
                    .iter()
                    .map(move |code| (code.as_str(), request.owner_id.as_str()))
            })
            .collect();

        if pairs.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut marked = 0u64;

        for chunk in pairs.chunks(MAX_BIND_PARAMS / DELETE_COLUMNS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "UPDATE urls SET is_deleted = TRUE WHERE is_deleted = FALSE AND (short_code, owner_id) IN ",
            );
            builder.push_tuples(chunk, |mut tuple, (code, owner)| {
                tuple.push_bind(code.to_string()).push_bind(owner.to_string());
            });

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            marked += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(requests = requests.len(), pairs = pairs.len(), marked, "soft delete applied");
        Ok(())
    }
}
