use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use fs2::FileExt;
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use tempo_core::RecordId;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::retry::{READ_RETRY, WRITE_RETRY};
use crate::schema::{AttrType, Schema, Value};

const TABLE: &str = "records";

/// Where the backing database lives.
#[derive(Debug, Clone)]
pub enum StoreLocation {
    /// Private in-memory database. No cross-process coordination needed.
    InMemory,
    /// File on disk, shared with other connections and other processes.
    OnDisk(PathBuf),
}

impl StoreLocation {
    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        StoreLocation::OnDisk(path.into())
    }
}

/// Persistent table of schema-typed records keyed by an auto-assigned id.
///
/// Thread-safe: the connection lives behind a `Mutex`, so one store instance
/// can be shared across threads. Separate processes open their own store
/// against the same file and coordinate purely through SQLite's locking plus
/// the bounded retry policy.
pub struct RecordStore {
    conn: Mutex<Connection>,
    schema: Schema,
}

impl RecordStore {
    /// Open (and if necessary create) the store at `location`.
    ///
    /// Idempotent and safe to call concurrently from independent processes:
    /// first-time table/index creation is serialized by an exclusive lock on
    /// `<path>.initlock`. In-memory stores skip the lock.
    pub fn open(schema: Schema, location: StoreLocation) -> Result<Self> {
        schema.validate()?;

        let conn = match &location {
            StoreLocation::InMemory => Connection::open_in_memory()?,
            StoreLocation::OnDisk(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                Connection::open(path)?
            }
        };
        // Let SQLite itself wait on row locks before our retry layer kicks in.
        conn.busy_timeout(Duration::from_secs(10))?;

        let store = Self {
            conn: Mutex::new(conn),
            schema,
        };
        store.init(&location)?;
        Ok(store)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Insert a record whose key set must exactly match the schema.
    /// Returns the newly assigned id.
    pub fn insert(&self, record: &BTreeMap<String, Value>) -> Result<RecordId> {
        let mut missing: Vec<String> = self
            .schema
            .names()
            .filter(|n| !record.contains_key(*n))
            .map(String::from)
            .collect();
        let extra: Vec<String> = record
            .keys()
            .filter(|k| !self.schema.has(k))
            .cloned()
            .collect();
        if !missing.is_empty() || !extra.is_empty() {
            missing.sort();
            return Err(StoreError::SchemaMismatch { missing, extra });
        }

        let mut columns = Vec::with_capacity(self.schema.len());
        let mut placeholders = Vec::with_capacity(self.schema.len());
        let mut values = Vec::with_capacity(self.schema.len());
        for (i, (name, _)) in self.schema.iter().enumerate() {
            columns.push(name.to_string());
            placeholders.push(format!("?{}", i + 1));
            values.push(self.encode(name, &record[name])?);
        }
        let sql = format!(
            "INSERT INTO {TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let conn = self.conn.lock().unwrap();
        WRITE_RETRY.run(|| conn.execute(&sql, rusqlite::params_from_iter(values.iter())))?;
        let id = conn.last_insert_rowid();
        debug!(id, "record inserted");
        Ok(id)
    }

    /// Read one attribute of one record, decoded to its declared type.
    pub fn get_attr(&self, id: RecordId, attr: &str) -> Result<Value> {
        let ty = self.require_attr(attr)?;
        let sql = format!("SELECT {attr} FROM {TABLE} WHERE id = ?1");

        let conn = self.conn.lock().unwrap();
        let raw: Option<SqlValue> = READ_RETRY.run(|| {
            match conn.query_row(&sql, [id], |row| row.get::<_, SqlValue>(0)) {
                Ok(v) => Ok(Some(v)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;
        let raw = raw.ok_or(StoreError::NotFound { id })?;
        decode(attr, ty, raw)
    }

    /// Read a whole record as an attribute → value map.
    pub fn get_record(&self, id: RecordId) -> Result<BTreeMap<String, Value>> {
        let columns: Vec<&str> = self.schema.names().collect();
        let sql = format!("SELECT {} FROM {TABLE} WHERE id = ?1", columns.join(", "));

        let conn = self.conn.lock().unwrap();
        let raws: Option<Vec<SqlValue>> = READ_RETRY.run(|| {
            let fetch = conn.query_row(&sql, [id], |row| {
                (0..columns.len())
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            });
            match fetch {
                Ok(v) => Ok(Some(v)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;
        let raws = raws.ok_or(StoreError::NotFound { id })?;

        let mut record = BTreeMap::new();
        for ((name, ty), raw) in self.schema.iter().zip(raws) {
            record.insert(name.to_string(), decode(name, ty, raw)?);
        }
        Ok(record)
    }

    /// Update one attribute of one record.
    pub fn set_attr(&self, id: RecordId, attr: &str, value: &Value) -> Result<()> {
        let encoded = self.encode(attr, value)?;
        let sql = format!("UPDATE {TABLE} SET {attr} = ?1 WHERE id = ?2");

        let conn = self.conn.lock().unwrap();
        let changed = WRITE_RETRY.run(|| conn.execute(&sql, rusqlite::params![encoded, id]))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    /// Delete one record.
    pub fn remove(&self, id: RecordId) -> Result<()> {
        let sql = format!("DELETE FROM {TABLE} WHERE id = ?1");
        let conn = self.conn.lock().unwrap();
        let changed = WRITE_RETRY.run(|| conn.execute(&sql, [id]))?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        debug!(id, "record removed");
        Ok(())
    }

    /// Equality-AND filter across zero or more attributes. An empty filter
    /// returns every id. Filter values go through the same encoding as
    /// writes, so boolean and structured comparisons match the stored
    /// representation exactly.
    pub fn find(&self, filter: &BTreeMap<String, Value>) -> Result<Vec<RecordId>> {
        let (where_clause, values) = self.filter_clause(filter)?;
        let sql = format!("SELECT id FROM {TABLE}{where_clause} ORDER BY id");

        let conn = self.conn.lock().unwrap();
        READ_RETRY.run(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
                row.get::<_, RecordId>(0)
            })?;
            rows.collect()
        })
    }

    /// Up to `n` ids ordered by `attr`: numeric attributes by value,
    /// text/structured attributes by the length of their stored
    /// representation. Ties break toward the lower id. Booleans are not
    /// sortable.
    pub fn top_n(
        &self,
        attr: &str,
        n: usize,
        descending: bool,
        filter: &BTreeMap<String, Value>,
    ) -> Result<Vec<RecordId>> {
        let ty = self.require_attr(attr)?;
        let sort_key = match ty {
            AttrType::Integer | AttrType::Real => attr.to_string(),
            AttrType::Text | AttrType::Structured => format!("LENGTH({attr})"),
            AttrType::Bool => {
                return Err(StoreError::UnsupportedSortType {
                    attr: attr.to_string(),
                })
            }
        };
        let direction = if descending { "DESC" } else { "ASC" };

        let (where_clause, mut values) = self.filter_clause(filter)?;
        values.push(SqlValue::Integer(n as i64));
        let limit_idx = values.len();
        let sql = format!(
            "SELECT id FROM {TABLE}{where_clause} \
             ORDER BY {sort_key} {direction}, id ASC LIMIT ?{limit_idx}"
        );

        let conn = self.conn.lock().unwrap();
        READ_RETRY.run(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
                row.get::<_, RecordId>(0)
            })?;
            rows.collect()
        })
    }

    // --- internals ---------------------------------------------------------

    fn require_attr(&self, attr: &str) -> Result<AttrType> {
        self.schema
            .attr_type(attr)
            .ok_or_else(|| StoreError::UnknownAttribute {
                attr: attr.to_string(),
            })
    }

    /// Validate + encode a value for storage per its declared type.
    fn encode(&self, attr: &str, value: &Value) -> Result<SqlValue> {
        let expected = self.require_attr(attr)?;
        let actual = value.type_of();
        if actual != expected {
            return Err(StoreError::TypeMismatch {
                attr: attr.to_string(),
                expected,
                actual,
            });
        }
        Ok(match value {
            Value::Text(s) => SqlValue::Text(s.clone()),
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Real(r) => SqlValue::Real(*r),
            Value::Structured(j) => SqlValue::Text(j.to_string()),
        })
    }

    /// Build `" WHERE a = ?1 AND b = ?2"` plus the encoded parameter list.
    fn filter_clause(&self, filter: &BTreeMap<String, Value>) -> Result<(String, Vec<SqlValue>)> {
        if filter.is_empty() {
            return Ok((String::new(), Vec::new()));
        }
        let mut clauses = Vec::with_capacity(filter.len());
        let mut values = Vec::with_capacity(filter.len());
        for (i, (attr, value)) in filter.iter().enumerate() {
            values.push(self.encode(attr, value)?);
            clauses.push(format!("{attr} = ?{}", i + 1));
        }
        Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
    }

    fn init(&self, location: &StoreLocation) -> Result<()> {
        match location {
            StoreLocation::InMemory => {
                let conn = self.conn.lock().unwrap();
                conn.execute(&self.table_ddl(), [])?;
                Ok(())
            }
            StoreLocation::OnDisk(path) => {
                // Cross-process init lock so concurrent first-time DDL never
                // races. Held only for the duration of initialization.
                let lock_path = PathBuf::from(format!("{}.initlock", path.display()));
                let lock = fs::OpenOptions::new()
                    .create(true)
                    .read(true)
                    .write(true)
                    .open(&lock_path)?;
                lock.lock_exclusive()?;
                let result = self.init_on_disk();
                if let Err(e) = lock.unlock() {
                    warn!("failed to release init lock: {e}");
                }
                result
            }
        }
    }

    fn init_on_disk(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // Try the concurrency-friendly journal mode; some filesystems refuse
        // WAL, in which case SQLite stays on its rollback journal.
        let wal_enabled = match conn.query_row("PRAGMA journal_mode=WAL", [], |row| {
            row.get::<_, String>(0)
        }) {
            Ok(mode) => mode.eq_ignore_ascii_case("wal"),
            Err(e) => {
                warn!("could not enable WAL journal mode: {e}");
                false
            }
        };
        let sync = if wal_enabled { "NORMAL" } else { "FULL" };
        if let Err(e) = conn.execute_batch(&format!("PRAGMA synchronous={sync};")) {
            warn!("could not set synchronous pragma: {e}");
        }

        WRITE_RETRY.run(|| conn.execute(&self.table_ddl(), []))?;
        WRITE_RETRY.run(|| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS store_meta (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    wal_enabled INTEGER NOT NULL DEFAULT 0,
                    initialized_at REAL
                )",
                [],
            )
        })?;
        WRITE_RETRY.run(|| {
            conn.execute(
                "INSERT OR IGNORE INTO store_meta (id, wal_enabled) VALUES (1, 0)",
                [],
            )
        })?;

        // Timer-shaped schemas get an index backing the soonest-expiry query.
        if self.schema.has("status") && self.schema.has("end_time") {
            let ddl = format!(
                "CREATE INDEX IF NOT EXISTS idx_{TABLE}_status_end ON {TABLE}(status, end_time)"
            );
            WRITE_RETRY.run(|| conn.execute(&ddl, []))?;
        }

        // Informational only; not read by anything, so best-effort.
        if let Err(e) = conn.execute(
            "UPDATE store_meta
             SET wal_enabled = ?1, initialized_at = strftime('%s','now')
             WHERE id = 1",
            rusqlite::params![i64::from(wal_enabled)],
        ) {
            warn!("could not update store_meta: {e}");
        }

        debug!(wal_enabled, "store initialised");
        Ok(())
    }

    fn table_ddl(&self) -> String {
        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for (name, ty) in self.schema.iter() {
            columns.push(format!("{name} {}", ty.sql_type()));
        }
        format!("CREATE TABLE IF NOT EXISTS {TABLE} ({})", columns.join(", "))
    }
}

/// Decode a stored SQLite value back to its declared attribute type.
fn decode(attr: &str, ty: AttrType, raw: SqlValue) -> Result<Value> {
    match (ty, raw) {
        (AttrType::Text, SqlValue::Text(s)) => Ok(Value::Text(s)),
        (AttrType::Integer, SqlValue::Integer(i)) => Ok(Value::Integer(i)),
        (AttrType::Bool, SqlValue::Integer(i)) => Ok(Value::Bool(i != 0)),
        (AttrType::Real, SqlValue::Real(r)) => Ok(Value::Real(r)),
        // SQLite may hand integral REALs back as INTEGER.
        (AttrType::Real, SqlValue::Integer(i)) => Ok(Value::Real(i as f64)),
        (AttrType::Structured, SqlValue::Text(s)) => serde_json::from_str(&s)
            .map(Value::Structured)
            .map_err(|e| StoreError::Corrupt {
                attr: attr.to_string(),
                reason: e.to_string(),
            }),
        (ty, other) => Err(StoreError::Corrupt {
            attr: attr.to_string(),
            reason: format!("declared {ty}, stored as {other:?}"),
        }),
    }
}
