//! Append-only SQLite persistence.
//!
//! Tables are created on first write from the columns of the record type being written, with
//! declared types taken from a fixed lookup ([`column_type`]). Every write appends only the
//! rows whose natural key is not yet in the table, so re-running a crawl over the same dates
//! never duplicates data.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};

use super::error::{EdgarError, Result};

/// A row type that can be written by [`Store::upsert`].
pub trait Record {
    /// Column names, in the order [`values`](Record::values) returns them.
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;

    /// Declared SQL type of `column` when the table is created.
    fn sql_type(column: &str) -> Option<&'static str> {
        column_type(column)
    }
}

/// Declared SQL type for a known column name. Unknown columns get none, leaving SQLite's
/// default affinity.
pub fn column_type(column: &str) -> Option<&'static str> {
    match column {
        "CIK" | "form" | "type" | "file_no" | "signature" | "confd_flag" | "amend"
        | "instruct5" | "instrc5info" | "oth_mgr" | "incl_mgr" | "file_id" | "name" | "CUSIP"
        | "class" | "discretion" | "put_call" | "othmgrdisc" | "hold_id" | "company"
        | "street1" | "street2" | "city" | "stateorcountry" | "zipcode" | "comp_name"
        | "form_type" | "file_name" | "link" | "Link" | "manifest" => Some("TEXT"),
        "date_filed" => Some("DATETIME"),
        "period" | "quarter" | "Date" => Some("DATE"),
        "entry_total" | "incld_mgrs" | "CIK_int" => Some("INTEGER"),
        "value_total" | "mkt_val" | "shares" | "va_sole" | "va_shared" | "va_none" => {
            Some("REAL")
        }
        _ => None,
    }
}

/// Table and column names are interpolated into SQL, so only plain identifiers are accepted.
pub(crate) fn check_identifier(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(EdgarError::invalid(format!("invalid SQL identifier: {:?}", name)))
    }
}

/// Key values compare as text, whatever their storage class.
fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Null | Value::Blob(_) => None,
    }
}

#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    /// Useful for testing; data is lost when the store is dropped.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of rows in `table`, zero if it does not exist.
    pub fn count(&self, table: &str) -> Result<usize> {
        check_identifier(table)?;
        if !self.table_exists(table)? {
            return Ok(0);
        }
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| {
                row.get(0)
            })?;
        Ok(n as usize)
    }

    /// Every non-null value of `key` in `table`, as text.
    pub fn existing_keys(&self, table: &str, key: &str) -> Result<HashSet<String>> {
        check_identifier(table)?;
        check_identifier(key)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT \"{}\" FROM \"{}\"", key, table))?;
        let values = stmt.query_map([], |row| row.get::<_, Value>(0))?;

        let mut keys = HashSet::new();
        for value in values {
            if let Some(k) = key_text(&value?) {
                keys.insert(k);
            }
        }
        Ok(keys)
    }

    /// Runs raw DDL. Used for tables that need constraints beyond the typed column list.
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn create_table<R: Record>(&self, table: &str) -> Result<()> {
        let columns = R::COLUMNS
            .iter()
            .map(|column| match R::sql_type(column) {
                Some(ty) => format!("\"{}\" {}", column, ty),
                None => format!("\"{}\"", column),
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.conn
            .execute(&format!("CREATE TABLE \"{}\" ({})", table, columns), [])?;
        tracing::debug!(table, "table created");
        Ok(())
    }

    /// Appends the rows of `rows` whose `key` value is not already persisted in `table`.
    ///
    /// The table is created from `R`'s columns if missing. Rows sharing a key within `rows`
    /// are all written; an information table may list one CUSIP several times. All inserts
    /// run in one transaction. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `key` is empty or not one of `R`'s columns, or if a row has no
    /// value for it.
    pub fn upsert<R: Record>(&mut self, table: &str, rows: &[R], key: &str) -> Result<usize> {
        check_identifier(table)?;
        if key.is_empty() {
            return Err(EdgarError::invalid("upsert requires a key column"));
        }
        let key_idx = R::COLUMNS
            .iter()
            .position(|column| *column == key)
            .ok_or_else(|| {
                EdgarError::invalid(format!("key column {} not among {:?}", key, R::COLUMNS))
            })?;
        if rows.is_empty() {
            return Ok(0);
        }

        if !self.table_exists(table)? {
            self.create_table::<R>(table)?;
        }
        let existing = self.existing_keys(table, key)?;

        let columns = R::COLUMNS
            .iter()
            .map(|column| format!("\"{}\"", column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=R::COLUMNS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table, columns, placeholders
        );

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values = row.values();
                let k = values.get(key_idx).and_then(key_text).ok_or_else(|| {
                    EdgarError::invalid(format!("{}: row without a {} value", table, key))
                })?;
                if existing.contains(&k) {
                    continue;
                }
                stmt.execute(params_from_iter(values))?;
                written += 1;
            }
        }
        tx.commit()?;

        tracing::debug!(table, written, skipped = rows.len() - written, "upsert finished");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Position {
        id: Option<&'static str>,
        cusip: &'static str,
        value: f64,
    }

    impl Record for Position {
        const COLUMNS: &'static [&'static str] = &["hold_id", "CUSIP", "mkt_val", "note"];

        fn values(&self) -> Vec<Value> {
            vec![
                self.id.map_or(Value::Null, |id| Value::Text(id.to_string())),
                Value::Text(self.cusip.to_string()),
                Value::Real(self.value),
                Value::Null,
            ]
        }
    }

    fn position(id: &'static str, value: f64) -> Position {
        Position {
            id: Some(id),
            cusip: "037833100",
            value,
        }
    }

    #[test]
    fn test_column_type_lookup() {
        assert_eq!(column_type("CIK"), Some("TEXT"));
        assert_eq!(column_type("date_filed"), Some("DATETIME"));
        assert_eq!(column_type("period"), Some("DATE"));
        assert_eq!(column_type("entry_total"), Some("INTEGER"));
        assert_eq!(column_type("va_none"), Some("REAL"));
        assert_eq!(column_type("unknown"), None);
    }

    #[test]
    fn test_first_write_creates_typed_table() {
        let mut store = Store::open_in_memory().unwrap();
        assert!(!store.table_exists("holdings").unwrap());

        store.upsert("holdings", &[position("a", 1.0)], "hold_id").unwrap();
        assert!(store.table_exists("holdings").unwrap());

        let ddl: String = store
            .connection()
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'holdings'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(ddl.contains("\"hold_id\" TEXT"));
        assert!(ddl.contains("\"mkt_val\" REAL"));
        assert!(ddl.contains("\"note\")"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        let rows = vec![position("a", 1.0), position("b", 2.0)];

        assert_eq!(store.upsert("holdings", &rows, "hold_id").unwrap(), 2);
        assert_eq!(store.upsert("holdings", &rows, "hold_id").unwrap(), 0);
        assert_eq!(store.count("holdings").unwrap(), 2);

        let more = vec![position("b", 5.0), position("c", 3.0)];
        assert_eq!(store.upsert("holdings", &more, "hold_id").unwrap(), 1);

        // Existing rows are never updated.
        let value: f64 = store
            .connection()
            .query_row(
                "SELECT mkt_val FROM holdings WHERE hold_id = 'b'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, 2.0);
    }

    #[test]
    fn test_duplicates_within_batch_are_kept() {
        let mut store = Store::open_in_memory().unwrap();
        let rows = vec![position("a", 1.0), position("a", 9.0)];
        assert_eq!(store.upsert("holdings", &rows, "hold_id").unwrap(), 2);
        assert_eq!(store.count("holdings").unwrap(), 2);

        // Once persisted, the key filters both on the next write.
        assert_eq!(store.upsert("holdings", &rows, "hold_id").unwrap(), 0);
        assert_eq!(store.count("holdings").unwrap(), 2);
    }

    #[test]
    fn test_invalid_keys() {
        let mut store = Store::open_in_memory().unwrap();
        let rows = vec![position("a", 1.0)];

        assert!(matches!(
            store.upsert("holdings", &rows, ""),
            Err(EdgarError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.upsert("holdings", &rows, "file_id"),
            Err(EdgarError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.upsert("bad table", &rows, "hold_id"),
            Err(EdgarError::InvalidArgument(_))
        ));

        let nameless = Position {
            id: None,
            cusip: "x",
            value: 0.0,
        };
        assert!(matches!(
            store.upsert("holdings", &[nameless], "hold_id"),
            Err(EdgarError::InvalidArgument(_))
        ));
        assert_eq!(store.count("holdings").unwrap(), 0);
    }

    #[test]
    fn test_empty_batch_does_not_create_table() {
        let mut store = Store::open_in_memory().unwrap();
        let rows: Vec<Position> = Vec::new();
        assert_eq!(store.upsert("holdings", &rows, "hold_id").unwrap(), 0);
        assert!(!store.table_exists("holdings").unwrap());
    }
}
