//! SQL-backed metric store.
//!
//! Persists computed-metric records in a SQLite database through `rusqlite`.
//! Every store operation runs in its own transaction: committed on success,
//! rolled back on failure with the original error re-raised, so a failed write
//! never leaves a partial record behind.
//!
//! Timestamps are stored as integer nanoseconds since the Unix epoch, which
//! keeps `ORDER BY updated_at` exact and round-trips values without loss.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{Result, VerdictError};
use crate::store::keypair;
use crate::store::metric::{ComputedMetric, MetricDraft, MetricFilter, MetricKey, TimeRange};
use crate::store::MetricStore;

/// The registered class name of this backend.
pub const CLASS_NAME: &str = "SqlMetricStore";

/// Structured database credentials.
///
/// Mirrors the credential fragments found in config variables files: a driver
/// name plus driver-specific settings. Only SQLite drivers are supported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlCredentials {
    /// Driver identifier; must start with `sqlite`.
    pub drivername: String,
    /// Database path, or absent for an in-memory database.
    #[serde(default)]
    pub database: Option<String>,
    /// Optional schema name, recorded for diagnostics.
    #[serde(default)]
    pub schema: Option<String>,
    /// Driver settings applied as pragmas after connecting.
    #[serde(default)]
    pub connect_args: IndexMap<String, serde_yaml::Value>,
    /// Path to a PKCS#8 private key for key-pair authentication.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,
    /// Passphrase for an encrypted private key.
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
}

impl SqlCredentials {
    /// Creates credentials for the given driver.
    pub fn new(drivername: impl Into<String>) -> Self {
        Self {
            drivername: drivername.into(),
            database: None,
            schema: None,
            connect_args: IndexMap::new(),
            private_key_path: None,
            private_key_passphrase: None,
        }
    }

    /// Sets the database path.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the private-key path and optional passphrase.
    pub fn with_private_key(
        mut self,
        path: impl Into<PathBuf>,
        passphrase: Option<impl Into<String>>,
    ) -> Self {
        self.private_key_path = Some(path.into());
        self.private_key_passphrase = passphrase.map(Into::into);
        self
    }
}

/// Construction options for a [`SqlMetricStore`].
///
/// Exactly one connection mode is honored, in priority order: an existing
/// engine, then structured credentials, then a connection string, then a URL.
#[derive(Debug, Default)]
pub struct SqlStoreOptions {
    /// An already-open database connection.
    pub engine: Option<Connection>,
    /// Structured credentials.
    pub credentials: Option<SqlCredentials>,
    /// A `sqlite://` connection string.
    pub connection_string: Option<String>,
    /// A `sqlite://` URL (lowest priority; same format as the connection
    /// string).
    pub url: Option<String>,
    /// Instance name for this store.
    pub store_name: Option<String>,
}

impl SqlStoreOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies an existing connection.
    pub fn with_engine(mut self, engine: Connection) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Supplies structured credentials.
    pub fn with_credentials(mut self, credentials: SqlCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Supplies a connection string.
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Supplies a URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Names the store instance.
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = Some(store_name.into());
        self
    }
}

/// A metric store persisting records in SQLite.
pub struct SqlMetricStore {
    conn: Mutex<Connection>,
    store_name: Option<String>,
    drivername: Option<String>,
    schema_name: Option<String>,
    key_material: Option<Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for SqlMetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMetricStore")
            .field("store_name", &self.store_name)
            .field("drivername", &self.drivername)
            .field("schema_name", &self.schema_name)
            .field("has_key_material", &self.key_material.is_some())
            .finish()
    }
}

impl SqlMetricStore {
    /// Opens a store from construction options.
    ///
    /// Connection modes are considered in priority order (engine, credentials,
    /// connection string, URL). When an engine is given alongside credentials,
    /// the credentials are ignored with a warning. When no mode is given at
    /// all, construction fails with an invalid-configuration error.
    pub fn new(options: SqlStoreOptions) -> Result<Self> {
        let SqlStoreOptions {
            engine,
            credentials,
            connection_string,
            url,
            store_name,
        } = options;

        let mut drivername = None;
        let mut schema_name = None;
        let mut key_material = None;

        let conn = if let Some(conn) = engine {
            if credentials.is_some() {
                warn!("Both credentials and an engine were provided; ignoring credentials.");
            }
            conn
        } else if let Some(credentials) = credentials {
            drivername = Some(credentials.drivername.clone());
            schema_name = credentials.schema.clone();
            let (conn, key) = Self::build_engine(&credentials)?;
            key_material = key;
            conn
        } else if let Some(target) = connection_string.or(url) {
            Self::open_target(&parse_sqlite_target(&target)?)?
        } else {
            return Err(VerdictError::invalid_config(
                "credentials, url, connection_string, or an engine are required for a SQL metric store",
            ));
        };

        let store = Self {
            conn: Mutex::new(conn),
            store_name,
            drivername,
            schema_name,
            key_material,
        };
        store.init_schema()?;
        info!(
            store_name = store.store_name.as_deref().unwrap_or("<anonymous>"),
            "opened SQL metric store"
        );
        Ok(store)
    }

    /// Opens an in-memory store, mainly for tests and scratch use.
    pub fn in_memory() -> Result<Self> {
        Self::new(SqlStoreOptions::new().with_engine(Connection::open_in_memory()?))
    }

    /// The schema name recorded from credentials, if any.
    pub fn schema_name(&self) -> Option<&str> {
        self.schema_name.as_deref()
    }

    /// Whether key-pair authentication material was loaded.
    pub fn has_key_material(&self) -> bool {
        self.key_material.is_some()
    }

    fn build_engine(
        credentials: &SqlCredentials,
    ) -> Result<(Connection, Option<Zeroizing<Vec<u8>>>)> {
        if !credentials.drivername.starts_with("sqlite") {
            return Err(VerdictError::invalid_config(format!(
                "unsupported drivername '{}': only sqlite drivers are available",
                credentials.drivername
            )));
        }

        let key_material = match &credentials.private_key_path {
            Some(path) => Some(keypair::load_private_key(
                path,
                credentials.private_key_passphrase.as_deref(),
            )?),
            None => None,
        };

        let conn = match &credentials.database {
            Some(database) => Self::open_target(Path::new(database))?,
            None => Connection::open_in_memory()?,
        };

        for (pragma, value) in &credentials.connect_args {
            let rendered = match value {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(VerdictError::invalid_config(format!(
                        "connect_args entry '{pragma}' must be a scalar, got {other:?}"
                    )))
                }
            };
            conn.pragma_update(None, pragma, rendered)?;
        }

        Ok((conn, key_material))
    }

    fn open_target(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Connection::open(path)?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS computed_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                batch_id TEXT NOT NULL CHECK (batch_id <> ''),
                metric_name TEXT NOT NULL CHECK (metric_name <> ''),
                metric_domain_kwargs_id TEXT NOT NULL,
                metric_value_kwargs_id TEXT NOT NULL,
                datasource_name TEXT,
                data_asset_name TEXT,
                batch_name TEXT,
                data_context_uuid TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER,
                archived_at INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                value TEXT,
                details TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_computed_metrics_updated_at
                ON computed_metrics (updated_at);",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VerdictError::Internal("metric store lock poisoned".to_string()))
    }

    /// Runs `f` inside a transaction, committing on success and rolling back
    /// on failure before re-raising the original error.
    fn with_session<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback after failed store operation also failed");
                }
                Err(e)
            }
        }
    }
}

const SELECT_COLUMNS: &str = "id, batch_id, metric_name, metric_domain_kwargs_id, \
     metric_value_kwargs_id, datasource_name, data_asset_name, batch_name, \
     data_context_uuid, created_at, updated_at, deleted_at, archived_at, \
     deleted, archived, value, details";

impl MetricStore for SqlMetricStore {
    fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    fn create(&self, draft: MetricDraft) -> Result<()> {
        let metric = draft.into_metric(Utc::now());
        let value = metric
            .value
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let details = metric
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_session(|tx| {
            tx.execute(
                "INSERT INTO computed_metrics (
                    batch_id, metric_name, metric_domain_kwargs_id,
                    metric_value_kwargs_id, datasource_name, data_asset_name,
                    batch_name, data_context_uuid, created_at, updated_at,
                    deleted_at, archived_at, deleted, archived, value, details
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    metric.key.batch_id,
                    metric.key.metric_name,
                    metric.key.metric_domain_kwargs_id,
                    metric.key.metric_value_kwargs_id,
                    metric.datasource_name,
                    metric.data_asset_name,
                    metric.batch_name,
                    metric.data_context_uuid,
                    datetime_to_nanos(metric.created_at),
                    datetime_to_nanos(metric.updated_at),
                    metric.deleted_at.map(datetime_to_nanos),
                    metric.archived_at.map(datetime_to_nanos),
                    metric.deleted,
                    metric.archived,
                    value,
                    details,
                ],
            )?;
            debug!(
                batch_id = %metric.key.batch_id,
                metric_name = %metric.key.metric_name,
                "stored metric record"
            );
            Ok(())
        })
    }

    fn get(&self, filter: &MetricFilter) -> Result<Option<ComputedMetric>> {
        let (where_clause, params) = build_where(filter);
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM computed_metrics{where_clause} \
             ORDER BY updated_at DESC LIMIT 1"
        );

        self.with_session(|tx| {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
            match rows.next()? {
                Some(row) => Ok(Some(read_row(row)?)),
                None => Ok(None),
            }
        })
    }

    fn list(&self, time_range: &TimeRange) -> Result<Vec<ComputedMetric>> {
        let filter = MetricFilter::any().with_time_range(*time_range);
        let (where_clause, params) = build_where(&filter);
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM computed_metrics{where_clause} \
             ORDER BY updated_at DESC"
        );

        self.with_session(|tx| {
            let mut stmt = tx.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
            let mut metrics = Vec::new();
            while let Some(row) = rows.next()? {
                metrics.push(read_row(row)?);
            }
            Ok(metrics)
        })
    }
}

fn build_where(filter: &MetricFilter) -> (String, Vec<rusqlite::types::Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<rusqlite::types::Value> = Vec::new();

    let mut component = |column: &str, value: &Option<String>| {
        if let Some(value) = value {
            params.push(value.clone().into());
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    };
    component("batch_id", &filter.batch_id);
    component("metric_name", &filter.metric_name);
    component("metric_domain_kwargs_id", &filter.metric_domain_kwargs_id);
    component("metric_value_kwargs_id", &filter.metric_value_kwargs_id);

    match (filter.time_range.begin, filter.time_range.end) {
        (Some(begin), Some(end)) => {
            params.push(datetime_to_nanos(begin).into());
            let begin_idx = params.len();
            params.push(datetime_to_nanos(end).into());
            clauses.push(format!(
                "updated_at >= ?{begin_idx} AND updated_at <= ?{}",
                params.len()
            ));
        }
        (Some(begin), None) => {
            params.push(datetime_to_nanos(begin).into());
            clauses.push(format!("updated_at >= ?{}", params.len()));
        }
        (None, Some(end)) => {
            params.push(datetime_to_nanos(end).into());
            clauses.push(format!("updated_at <= ?{}", params.len()));
        }
        (None, None) => {}
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> Result<ComputedMetric> {
    let value: Option<String> = row.get(15)?;
    let details: Option<String> = row.get(16)?;
    let deleted_at: Option<i64> = row.get(11)?;
    let archived_at: Option<i64> = row.get(12)?;

    Ok(ComputedMetric {
        id: row.get(0)?,
        key: MetricKey {
            batch_id: row.get(1)?,
            metric_name: row.get(2)?,
            metric_domain_kwargs_id: row.get(3)?,
            metric_value_kwargs_id: row.get(4)?,
        },
        datasource_name: row.get(5)?,
        data_asset_name: row.get(6)?,
        batch_name: row.get(7)?,
        data_context_uuid: row.get(8)?,
        created_at: nanos_to_datetime(row.get(9)?),
        updated_at: nanos_to_datetime(row.get(10)?),
        deleted_at: deleted_at.map(nanos_to_datetime),
        archived_at: archived_at.map(nanos_to_datetime),
        deleted: row.get(13)?,
        archived: row.get(14)?,
        value: value.map(|v| serde_json::from_str(&v)).transpose()?,
        details: details.map(|d| serde_json::from_str(&d)).transpose()?,
    })
}

fn datetime_to_nanos(timestamp: DateTime<Utc>) -> i64 {
    // Nanosecond precision covers years 1677..2262, ample for metric records.
    timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

fn nanos_to_datetime(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(nanos.div_euclid(1_000_000_000), nanos.rem_euclid(1_000_000_000) as u32)
        .unwrap_or_else(Utc::now)
}

/// Extracts the database path from a `sqlite://` connection string.
fn parse_sqlite_target(target: &str) -> Result<PathBuf> {
    let rest = target
        .strip_prefix("sqlite:///")
        .or_else(|| target.strip_prefix("sqlite://"))
        .or_else(|| target.strip_prefix("sqlite:"))
        .ok_or_else(|| {
            VerdictError::invalid_config(format!(
                "unsupported connection string '{target}': only sqlite targets are available"
            ))
        })?;
    if rest.is_empty() {
        return Err(VerdictError::invalid_config(format!(
            "connection string '{target}' names no database"
        )));
    }
    Ok(PathBuf::from(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn draft(batch: &str, metric: &str, updated_secs: i64) -> MetricDraft {
        MetricDraft::new(MetricKey::new(batch, metric, "d", "v"))
            .with_timestamps(ts(updated_secs), ts(updated_secs))
    }

    #[test]
    fn test_no_connection_mode_rejected() {
        let err = SqlMetricStore::new(SqlStoreOptions::new()).unwrap_err();
        assert!(matches!(err, VerdictError::InvalidConfig(_)));
        assert!(err.to_string().contains("engine are required"));
    }

    #[test]
    fn test_engine_takes_priority_over_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let shadowed = dir.path().join("shadowed.db");
        let credentials =
            SqlCredentials::new("sqlite").with_database(shadowed.display().to_string());

        let store = SqlMetricStore::new(
            SqlStoreOptions::new()
                .with_engine(Connection::open_in_memory().unwrap())
                .with_credentials(credentials),
        )
        .unwrap();

        store.create(draft("b1", "m", 1)).unwrap();
        // Credentials were ignored, so no database file appears.
        assert!(!shadowed.exists());
    }

    #[test]
    fn test_credentials_open_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("metrics.db");
        let credentials = SqlCredentials::new("sqlite").with_database(db.display().to_string());

        let store =
            SqlMetricStore::new(SqlStoreOptions::new().with_credentials(credentials)).unwrap();
        store.create(draft("b1", "m", 1)).unwrap();
        assert!(db.exists());
    }

    #[test]
    fn test_non_sqlite_driver_rejected() {
        let credentials = SqlCredentials::new("postgresql").with_database("ignored");
        let err =
            SqlMetricStore::new(SqlStoreOptions::new().with_credentials(credentials)).unwrap_err();
        assert!(matches!(err, VerdictError::InvalidConfig(_)));
    }

    #[test]
    fn test_connection_string_and_url_forms() {
        assert_eq!(
            parse_sqlite_target("sqlite:///tmp/metrics.db").unwrap(),
            PathBuf::from("tmp/metrics.db")
        );
        assert_eq!(
            parse_sqlite_target("sqlite:metrics.db").unwrap(),
            PathBuf::from("metrics.db")
        );
        assert!(parse_sqlite_target("postgresql://host/db").is_err());
        assert!(parse_sqlite_target("sqlite://").is_err());
    }

    #[test]
    fn test_list_ordered_most_recent_first() {
        let store = SqlMetricStore::in_memory().unwrap();
        store.create(draft("b1", "m", 100)).unwrap();
        store.create(draft("b2", "m", 300)).unwrap();
        store.create(draft("b3", "m", 200)).unwrap();

        let records = store.list(&TimeRange::all()).unwrap();
        let batches: Vec<&str> = records.iter().map(|m| m.key.batch_id.as_str()).collect();
        assert_eq!(batches, ["b2", "b3", "b1"]);
    }

    #[test]
    fn test_get_returns_latest_match() {
        let store = SqlMetricStore::in_memory().unwrap();
        store.create(draft("b1", "column.mean", 100)).unwrap();
        store.create(draft("b1", "column.mean", 200)).unwrap();
        store.create(draft("b1", "column.max", 300)).unwrap();

        let filter = MetricFilter::any().with_metric_name("column.mean");
        let hit = store.get(&filter).unwrap().unwrap();
        assert_eq!(hit.updated_at, ts(200));
        assert!(hit.id.is_some());
    }

    #[test]
    fn test_time_filter_all_four_cases() {
        let store = SqlMetricStore::in_memory().unwrap();
        store.create(draft("b1", "m", 100)).unwrap();
        store.create(draft("b2", "m", 200)).unwrap();
        store.create(draft("b3", "m", 300)).unwrap();

        assert_eq!(store.list(&TimeRange::all()).unwrap().len(), 3);
        assert_eq!(store.list(&TimeRange::since(ts(200))).unwrap().len(), 2);
        assert_eq!(store.list(&TimeRange::until(ts(200))).unwrap().len(), 2);
        let between = store.list(&TimeRange::between(ts(150), ts(250))).unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(between[0].key.batch_id, "b2");
    }

    #[test]
    fn test_failed_create_leaves_no_partial_record() {
        let store = SqlMetricStore::in_memory().unwrap();
        // Violates the batch_id CHECK constraint.
        let err = store.create(draft("", "m", 100)).unwrap_err();
        assert!(matches!(err, VerdictError::Sql(_)));
        assert!(store.list(&TimeRange::all()).unwrap().is_empty());
    }

    #[test]
    fn test_session_rolls_back_on_error() {
        let store = SqlMetricStore::in_memory().unwrap();
        let result: Result<()> = store.with_session(|tx| {
            tx.execute(
                "INSERT INTO computed_metrics (
                    batch_id, metric_name, metric_domain_kwargs_id,
                    metric_value_kwargs_id, created_at, updated_at
                ) VALUES ('b', 'm', 'd', 'v', 0, 0)",
                [],
            )?;
            Err(VerdictError::Internal("forced failure".to_string()))
        });
        assert!(result.is_err());
        assert!(store.list(&TimeRange::all()).unwrap().is_empty());
    }

    #[test]
    fn test_full_record_roundtrip() {
        let store = SqlMetricStore::in_memory().unwrap();
        let mut details = serde_json::Map::new();
        details.insert("engine".to_string(), serde_json::json!("pandas"));

        let draft = MetricDraft::new(MetricKey::new("batch-7", "column.mean", "d7", "v7"))
            .with_datasource_name("warehouse")
            .with_data_asset_name("orders")
            .with_batch_name("orders-2026-08")
            .with_data_context_uuid("ctx-1234")
            .with_timestamps(ts(500), ts(600))
            .with_value(serde_json::json!({"mean": 42.5}))
            .with_details(details.clone());

        store.create(draft).unwrap();
        let metric = store
            .get(&MetricFilter::exact(&MetricKey::new(
                "batch-7",
                "column.mean",
                "d7",
                "v7",
            )))
            .unwrap()
            .unwrap();

        assert_eq!(metric.datasource_name.as_deref(), Some("warehouse"));
        assert_eq!(metric.data_asset_name.as_deref(), Some("orders"));
        assert_eq!(metric.batch_name.as_deref(), Some("orders-2026-08"));
        assert_eq!(metric.data_context_uuid.as_deref(), Some("ctx-1234"));
        assert_eq!(metric.created_at, ts(500));
        assert_eq!(metric.updated_at, ts(600));
        assert_eq!(metric.value, Some(serde_json::json!({"mean": 42.5})));
        assert_eq!(metric.details, Some(details));
        assert!(!metric.deleted);
        assert!(!metric.archived);
    }

    #[test]
    fn test_minimal_record_roundtrip() {
        let store = SqlMetricStore::in_memory().unwrap();
        store
            .create(MetricDraft::new(MetricKey::new("b", "m", "d", "v")))
            .unwrap();

        let metric = store.get(&MetricFilter::any()).unwrap().unwrap();
        assert_eq!(metric.datasource_name, None);
        assert_eq!(metric.value, None);
        assert_eq!(metric.details, None);
        // Timestamps were defaulted to the write time.
        assert_eq!(metric.created_at, metric.updated_at);
    }

    #[test]
    fn test_connect_args_applied_as_pragmas() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("metrics.db");
        let mut credentials =
            SqlCredentials::new("sqlite").with_database(db.display().to_string());
        credentials.connect_args.insert(
            "journal_mode".to_string(),
            serde_yaml::Value::String("wal".into()),
        );

        let store = SqlMetricStore::new(
            SqlStoreOptions::new()
                .with_credentials(credentials)
                .with_store_name("metrics_store"),
        )
        .unwrap();
        assert_eq!(store.store_name(), Some("metrics_store"));

        let conn = store.lock().unwrap();
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn test_nanos_roundtrip() {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        assert_eq!(nanos_to_datetime(datetime_to_nanos(timestamp)), timestamp);
    }
}
