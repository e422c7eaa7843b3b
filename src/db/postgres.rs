//! PostgreSQL query executor.
//!
//! Provides `PostgresExecutor`, a blocking [`QueryExecutor`] over a sqlx
//! connection pool. The pool is opened lazily on the first query and torn
//! down by `close`, so a target change on the owning connection reconnects.

use crate::db::{ColumnInfo, ConnectionTarget, QueryExecutor, ResultSet, ResultSink, Row, Value};
use crate::error::{ConnError, Result};
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Either, Row as SqlxRow, TypeInfo};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows kept per result set.
const MAX_ROWS: usize = 1000;

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Tunables for [`PostgresExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Upper bound on a single `run`.
    pub query_timeout: Duration,
    /// Rows kept per result set; the rest are counted and dropped.
    pub max_rows: usize,
    /// Connection attempts before giving up on transient errors.
    pub max_retry_attempts: u32,
    /// Delay before the first retry.
    pub retry_base_delay: Duration,
    /// Pool size.
    pub max_connections: u32,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(QUERY_TIMEOUT_SECS),
            max_rows: MAX_ROWS,
            max_retry_attempts: MAX_RETRY_ATTEMPTS,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_connections: 5,
        }
    }
}

/// PostgreSQL query executor.
pub struct PostgresExecutor {
    runtime: Runtime,
    pool: Option<PgPool>,
    settings: ExecutorSettings,
}

impl PostgresExecutor {
    /// Creates an executor with default settings.
    pub fn new() -> Result<Self> {
        Self::with_settings(ExecutorSettings::default())
    }

    /// Creates an executor with the given settings.
    pub fn with_settings(settings: ExecutorSettings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConnError::internal(format!("Failed to start driver runtime: {e}")))?;

        Ok(Self {
            runtime,
            pool: None,
            settings,
        })
    }

    /// Returns true while a pool is open.
    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    /// Returns the open pool, connecting to `target` first if needed.
    fn pool(&mut self, target: &ConnectionTarget) -> Result<PgPool> {
        if let Some(pool) = &self.pool {
            return Ok(pool.clone());
        }

        let options = connect_options(target)?;
        let pool = self.runtime.block_on(connect(options, &self.settings))?;
        self.pool = Some(pool.clone());
        Ok(pool)
    }
}

impl QueryExecutor for PostgresExecutor {
    fn run(
        &mut self,
        target: &ConnectionTarget,
        query: &str,
        params: &[Value],
        results: &mut ResultSink<'_>,
    ) -> Result<()> {
        let pool = self.pool(target)?;

        if params.is_empty() {
            self.runtime
                .block_on(run_script(&pool, query, &self.settings, results))
        } else {
            let set = self
                .runtime
                .block_on(run_prepared(&pool, query, params, &self.settings))?;
            results.push(set);
            Ok(())
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(pool) = self.pool.take() {
            debug!("Closing connection pool");
            self.runtime.block_on(pool.close());
        }
        Ok(())
    }
}

impl Drop for PostgresExecutor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Builds connect options from the descriptor, applying the target database.
fn connect_options(target: &ConnectionTarget) -> Result<PgConnectOptions> {
    let descriptor = target
        .descriptor
        .as_deref()
        .ok_or_else(|| ConnError::connection("No connection descriptor set"))?;

    let mut options = PgConnectOptions::from_str(descriptor)
        .map_err(|e| ConnError::connection(format!("Invalid connection descriptor: {e}")))?;

    if let Some(database) = target.database.as_deref() {
        options = options.database(database);
    }

    Ok(options)
}

async fn connect(options: PgConnectOptions, settings: &ExecutorSettings) -> Result<PgPool> {
    let mut last_error = None;
    let mut delay = settings.retry_base_delay;

    for attempt in 1..=settings.max_retry_attempts {
        debug!(
            "Connection attempt {} of {}",
            attempt, settings.max_retry_attempts
        );

        let result = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options.clone())
            .await;

        match result {
            Ok(pool) => {
                debug!("Successfully connected to database");
                return Ok(pool);
            }
            Err(e) => {
                let is_transient = is_transient_error(&e);
                last_error = Some(e);

                if attempt < settings.max_retry_attempts && is_transient {
                    warn!(
                        "Connection attempt {} failed (transient error), retrying in {:?}",
                        attempt, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                } else {
                    break;
                }
            }
        }
    }

    Err(match last_error {
        Some(e) => map_connection_error(e, &options),
        None => ConnError::connection("No connection attempts were made"),
    })
}

/// Runs a possibly multi-statement script through the simple protocol.
///
/// Each completed statement becomes one result set.
async fn run_script(
    pool: &PgPool,
    query: &str,
    settings: &ExecutorSettings,
    results: &mut ResultSink<'_>,
) -> Result<()> {
    let statements = async {
        let mut stream = sqlx::raw_sql(query).fetch_many(pool);
        let mut rows: Vec<PgRow> = Vec::new();
        let mut started = Instant::now();

        while let Some(step) = stream
            .try_next()
            .await
            .map_err(|e| ConnError::query(format_query_error(e)))?
        {
            match step {
                Either::Left(done) => {
                    let set = build_result_set(
                        std::mem::take(&mut rows),
                        started.elapsed(),
                        settings.max_rows,
                    )
                    .with_rows_affected(done.rows_affected());
                    results.push(set);
                    started = Instant::now();
                }
                Either::Right(row) => rows.push(row),
            }
        }

        Ok::<(), ConnError>(())
    };

    tokio::time::timeout(settings.query_timeout, statements)
        .await
        .map_err(|_| timeout_error(settings))?
}

/// Runs a single statement with bound parameters.
async fn run_prepared(
    pool: &PgPool,
    query: &str,
    params: &[Value],
    settings: &ExecutorSettings,
) -> Result<ResultSet> {
    let started = Instant::now();
    let bound = params.iter().fold(sqlx::query(query), bind_value);

    let rows = tokio::time::timeout(settings.query_timeout, bound.fetch_all(pool))
        .await
        .map_err(|_| timeout_error(settings))?
        .map_err(|e| ConnError::query(format_query_error(e)))?;

    Ok(build_result_set(rows, started.elapsed(), settings.max_rows))
}

fn timeout_error(settings: &ExecutorSettings) -> ConnError {
    ConnError::query(format!(
        "Query timed out after {} seconds",
        settings.query_timeout.as_secs()
    ))
}

/// Binds one parameter according to its variant.
fn bind_value<'q>(query: PgQuery<'q>, value: &Value) -> PgQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
        Value::Bytes(b) => query.bind(b.clone()),
    }
}

fn build_result_set(rows: Vec<PgRow>, execution_time: Duration, max_rows: usize) -> ResultSet {
    let columns: Vec<ColumnInfo> = rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect()
        })
        .unwrap_or_default();

    let total_rows = rows.len();
    let was_truncated = total_rows > max_rows;

    if was_truncated {
        warn!(
            "Query returned {} rows, truncating to {} rows",
            total_rows, max_rows
        );
    }

    let rows: Vec<Row> = rows.iter().take(max_rows).map(convert_row).collect();
    let row_count = rows.len();

    ResultSet {
        columns,
        rows,
        execution_time,
        row_count,
        total_rows: Some(total_rows),
        was_truncated,
        rows_affected: None,
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "INT2" | "SMALLINT" => row
            .try_get::<Option<i16>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT4" | "INT" | "INTEGER" => row
            .try_get::<Option<i32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),

        "INT8" | "BIGINT" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "FLOAT4" | "REAL" => row
            .try_get::<Option<f32>, _>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),

        "FLOAT8" | "DOUBLE PRECISION" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BYTEA" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // For all other types, try to get as string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    let error_str = error.to_string().to_lowercase();

    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("timeout")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, options: &PgConnectOptions) -> ConnError {
    let host = options.get_host();
    let port = options.get_port();
    let user = options.get_username();
    let database = options.get_database().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        ConnError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        ConnError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        ConnError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        ConnError::connection(
            "Server requires SSL. Add '?sslmode=require' to the connection URL.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        ConnError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        ConnError::connection(error.to_string())
    }
}

/// Formats a query error with detail and hint lines if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }

        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }

        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
