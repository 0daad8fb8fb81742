//! Storage layer for circle.
//!
//! This module provides `SQLite`-based persistent storage for orders and
//! their audit trail. Every change to an order is written together with its
//! history entry in one transaction.

pub mod migrations;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::order::{CircleData, HistoryEntry, Order, OrderStatus};

/// Columns selected for an [`Order`], in [`Storage::row_to_order`] order.
const ORDER_COLUMNS: &str = "cle, status, current_holder, created_by, last_modified_by, \
                             created_at, updated_at, circle_data";

/// History action recorded when an order is created.
pub const ACTION_CREATED: &str = "created";

/// History action recorded when order data is amended.
pub const ACTION_AMENDED: &str = "amended";

/// Storage engine for orders.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new order together with its `created` history entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateOrder`] if the key is taken, or an error if
    /// the database operation fails.
    pub fn insert_order(&self, order: &Order) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let data = serde_json::to_string(&order.data)?;

        let inserted = tx.execute(
            r"
            INSERT INTO orders (cle, current_holder, status, created_by, last_modified_by,
                                created_at, updated_at, circle_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                order.cle,
                order.current_holder,
                order.status,
                order.created_by,
                order.last_modified_by,
                timestamp(order.created_at),
                timestamp(order.updated_at),
                data,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::DuplicateOrder {
                    cle: order.cle.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        append_history(
            &tx,
            &order.cle,
            order.created_at,
            &order.created_by,
            ACTION_CREATED,
            Some(&data),
        )?;
        tx.commit()?;

        debug!("Inserted order {}", order.cle);
        Ok(())
    }

    /// Get an order by its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_order(&self, cle: &str) -> Result<Option<Order>> {
        let order = self
            .conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE cle = ?1"),
                [cle],
                Self::row_to_order,
            )
            .optional()?;
        Ok(order)
    }

    /// Replace an order's data and record an `amended` history entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`] if no order has this key, or an
    /// error if the database operation fails.
    pub fn update_data(&self, cle: &str, data: &CircleData, modifier: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now();
        let data = serde_json::to_string(data)?;

        let affected = tx.execute(
            r"
            UPDATE orders SET circle_data = ?1, last_modified_by = ?2, updated_at = ?3
            WHERE cle = ?4
            ",
            params![data, modifier, timestamp(now), cle],
        )?;
        if affected == 0 {
            return Err(Error::order_not_found(cle));
        }

        append_history(&tx, cle, now, modifier, ACTION_AMENDED, Some(&data))?;
        tx.commit()?;

        debug!("Updated data of order {cle}");
        Ok(())
    }

    /// Move an order to a new status and holder, recording `action` in its
    /// history. When `data` is given it replaces the order data in the same
    /// update.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`] if no order has this key, or an
    /// error if the database operation fails.
    pub fn update_status(
        &self,
        cle: &str,
        status: OrderStatus,
        holder: &str,
        modifier: &str,
        action: &str,
        data: Option<&CircleData>,
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now();
        let data = data.map(serde_json::to_string).transpose()?;

        let affected = tx.execute(
            r"
            UPDATE orders
            SET status = ?1, current_holder = ?2, last_modified_by = ?3, updated_at = ?4,
                circle_data = COALESCE(?5, circle_data)
            WHERE cle = ?6
            ",
            params![status, holder, modifier, timestamp(now), data, cle],
        )?;
        if affected == 0 {
            return Err(Error::order_not_found(cle));
        }

        append_history(&tx, cle, now, modifier, action, data.as_deref())?;
        tx.commit()?;

        debug!("Order {cle} is now {status}, held by {holder}");
        Ok(())
    }

    /// Get the orders held by `holder`, optionally with one status, most
    /// recently changed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn orders_for_holder(&self, holder: &str, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE current_holder = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY updated_at DESC
            "
        ))?;

        let orders = stmt
            .query_map(params![holder, status], Self::row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Get the orders created by `creator`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn orders_created_by(&self, creator: &str) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE created_by = ?1 ORDER BY created_at DESC"
        ))?;

        let orders = stmt
            .query_map([creator], Self::row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Get the most recently changed orders, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn recent_orders(&self, limit: usize, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE (?1 IS NULL OR status = ?1)
            ORDER BY updated_at DESC LIMIT ?2
            "
        ))?;

        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let orders = stmt
            .query_map(params![status, limit_i64], Self::row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    /// Get an order's history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn history(&self, cle: &str) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, cle, timestamp, actor, action, changed_data
            FROM order_history WHERE cle = ?1 ORDER BY id ASC
            ",
        )?;

        let entries = stmt
            .query_map([cle], Self::row_to_history)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Count total orders in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let total_orders = self.count()?;
        let history_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM order_history", [], |row| row.get(0))?;

        let mut by_status: BTreeMap<String, i64> = OrderStatus::ALL
            .iter()
            .map(|status| (status.to_string(), 0))
            .collect();
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM orders GROUP BY status")?;
        let counts = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
        for count in counts {
            let (status, n) = count?;
            by_status.insert(status, n);
        }

        let newest: Option<String> = self
            .conn
            .query_row(
                "SELECT updated_at FROM orders ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let last_change = newest.and_then(|s| parse_timestamp(&s));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            total_orders,
            by_status,
            history_entries,
            last_change,
            db_size_bytes,
        })
    }

    /// Convert a database row to an Order struct.
    fn row_to_order(row: &rusqlite::Row) -> rusqlite::Result<Order> {
        let data_str: String = row.get(7)?;
        let data: CircleData = serde_json::from_str(&data_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

        Ok(Order {
            cle: row.get(0)?,
            status: row.get(1)?,
            current_holder: row.get(2)?,
            created_by: row.get(3)?,
            last_modified_by: row.get(4)?,
            created_at: timestamp_column(row, 5)?,
            updated_at: timestamp_column(row, 6)?,
            data,
        })
    }

    /// Convert a database row to a `HistoryEntry` struct.
    fn row_to_history(row: &rusqlite::Row) -> rusqlite::Result<HistoryEntry> {
        let changed: Option<String> = row.get(5)?;
        let changed_data = changed
            .map(|s| serde_json::from_str::<CircleData>(&s))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

        Ok(HistoryEntry {
            id: row.get(0)?,
            cle: row.get(1)?,
            timestamp: timestamp_column(row, 2)?,
            actor: row.get(3)?,
            action: row.get(4)?,
            changed_data,
        })
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Total number of orders stored.
    pub total_orders: i64,
    /// Number of orders in each status, including empty ones.
    pub by_status: BTreeMap<String, i64>,
    /// Total number of history entries.
    pub history_entries: i64,
    /// Time of the most recent change to any order.
    pub last_change: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

fn append_history(
    conn: &Connection,
    cle: &str,
    at: DateTime<Utc>,
    actor: &str,
    action: &str,
    data: Option<&str>,
) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO order_history (cle, timestamp, actor, action, changed_data)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![cle, timestamp(at), actor, action, data],
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 so that text order is time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a stored timestamp. `YYYY-MM-DD HH:MM:SS` (UTC) is also accepted.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn timestamp_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {raw}").into(),
        )
    })
}

impl ToSql for OrderStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for OrderStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse()
            .map_err(|_| FromSqlError::Other(format!("unknown order status: {s}").into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn sample_data() -> CircleData {
        json!({"C0": "11", "C1": "A0", "C10": "1111A0", "C11": "2019"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn create_test_order(cle: &str, holder: &str) -> Order {
        Order::new_draft(cle.to_string(), sample_data(), "broker_a", holder)
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let order = create_test_order("CLE-1", "broker_a");
        storage.insert_order(&order).unwrap();

        let retrieved = storage.get_order("CLE-1").unwrap().unwrap();
        assert_eq!(retrieved.cle, "CLE-1");
        assert_eq!(retrieved.status, OrderStatus::NewDraft);
        assert_eq!(retrieved.data, sample_data());
        assert_eq!(retrieved.created_at, order.created_at);
    }

    #[test]
    fn test_get_missing() {
        let storage = create_test_storage();
        assert!(storage.get_order("CLE-NONE").unwrap().is_none());
    }

    #[test]
    fn test_insert_records_created_history() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();

        let history = storage.history("CLE-1").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ACTION_CREATED);
        assert_eq!(history[0].actor, "broker_a");
        assert_eq!(history[0].changed_data.as_ref(), Some(&sample_data()));
    }

    #[test]
    fn test_duplicate_insert() {
        let storage = create_test_storage();
        let order = create_test_order("CLE-1", "broker_a");
        storage.insert_order(&order).unwrap();

        let err = storage.insert_order(&order).unwrap_err();
        assert!(matches!(err, Error::DuplicateOrder { .. }));
        assert_eq!(storage.history("CLE-1").unwrap().len(), 1);
    }

    #[test]
    fn test_update_data() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();

        let mut data = sample_data();
        data.insert("C40".to_string(), json!("1200"));
        storage.update_data("CLE-1", &data, "broker_a").unwrap();

        let order = storage.get_order("CLE-1").unwrap().unwrap();
        assert_eq!(order.data["C40"], json!("1200"));
        assert!(order.updated_at >= order.created_at);

        let history = storage.history("CLE-1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, ACTION_AMENDED);
    }

    #[test]
    fn test_update_missing_order() {
        let storage = create_test_storage();
        let err = storage
            .update_data("CLE-NONE", &sample_data(), "broker_a")
            .unwrap_err();
        assert!(err.is_not_found());

        let err = storage
            .update_status("CLE-NONE", OrderStatus::PendingCastleReview, "c", "b", "send_to_castle", None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_status() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();

        storage
            .update_status(
                "CLE-1",
                OrderStatus::PendingCastleReview,
                "castle_x",
                "broker_a",
                "send_to_castle",
                None,
            )
            .unwrap();

        let order = storage.get_order("CLE-1").unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::PendingCastleReview);
        assert_eq!(order.current_holder, "castle_x");
        assert_eq!(order.last_modified_by, "broker_a");
        assert_eq!(order.data, sample_data());

        let history = storage.history("CLE-1").unwrap();
        assert_eq!(history[1].action, "send_to_castle");
        assert!(history[1].changed_data.is_none());
    }

    #[test]
    fn test_update_status_with_data() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "merchant_m")).unwrap();

        let mut data = sample_data();
        data.insert("C_MERCHANT_RETURN_REASON".to_string(), json!("price"));
        storage
            .update_status(
                "CLE-1",
                OrderStatus::MerchantAmended,
                "castle_x",
                "merchant_m",
                "return_to_castle",
                Some(&data),
            )
            .unwrap();

        let order = storage.get_order("CLE-1").unwrap().unwrap();
        assert_eq!(order.data["C_MERCHANT_RETURN_REASON"], json!("price"));
    }

    #[test]
    fn test_orders_for_holder() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "castle_x")).unwrap();
        storage.insert_order(&create_test_order("CLE-2", "castle_x")).unwrap();
        storage.insert_order(&create_test_order("CLE-3", "castle_y")).unwrap();
        storage
            .update_status("CLE-2", OrderStatus::PendingCastleReview, "castle_x", "b", "send_to_castle", None)
            .unwrap();

        let all = storage.orders_for_holder("castle_x", None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].cle, "CLE-2");

        let pending = storage
            .orders_for_holder("castle_x", Some(OrderStatus::PendingCastleReview))
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].cle, "CLE-2");

        assert!(storage.orders_for_holder("nobody", None).unwrap().is_empty());
    }

    #[test]
    fn test_orders_created_by() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "castle_x")).unwrap();
        let mut other = create_test_order("CLE-2", "castle_x");
        other.created_by = "broker_b".to_string();
        storage.insert_order(&other).unwrap();

        let orders = storage.orders_created_by("broker_a").unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].cle, "CLE-1");
    }

    #[test]
    fn test_recent_orders_limit() {
        let storage = create_test_storage();
        for i in 0..5 {
            storage
                .insert_order(&create_test_order(&format!("CLE-{i}"), "broker_a"))
                .unwrap();
        }
        assert_eq!(storage.recent_orders(3, None).unwrap().len(), 3);
    }

    #[test]
    fn test_recent_orders_filters_before_limit() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-OLD", "broker_a")).unwrap();
        storage
            .update_status(
                "CLE-OLD",
                OrderStatus::PendingCastleReview,
                "castle_x",
                "broker_a",
                "send_to_castle",
                None,
            )
            .unwrap();
        storage.insert_order(&create_test_order("CLE-NEW", "broker_a")).unwrap();

        let orders = storage
            .recent_orders(1, Some(OrderStatus::PendingCastleReview))
            .unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].cle, "CLE-OLD");

        let drafts = storage.recent_orders(10, Some(OrderStatus::NewDraft)).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].cle, "CLE-NEW");
    }

    #[test]
    fn test_stats() {
        let storage = create_test_storage();
        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.by_status.len(), OrderStatus::ALL.len());
        assert!(stats.last_change.is_none());
        assert_eq!(stats.db_size_bytes, 0);

        storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();
        storage.insert_order(&create_test_order("CLE-2", "broker_a")).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.by_status["new_draft"], 2);
        assert_eq!(stats.by_status["merchant_approved"], 0);
        assert_eq!(stats.history_entries, 2);
        assert!(stats.last_change.is_some());
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("orders.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();
            assert_eq!(storage.path(), path);
        }

        let reopened = Storage::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
        assert!(reopened.stats().unwrap().db_size_bytes > 0);
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        let storage = create_test_storage();
        storage.insert_order(&create_test_order("CLE-1", "broker_a")).unwrap();
        storage
            .conn
            .execute("UPDATE orders SET status = 'shipped'", [])
            .unwrap();

        assert!(storage.get_order("CLE-1").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01T10:00:00.000000000Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-05-01 10:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_timestamp_sorts_as_text() {
        let early = DateTime::parse_from_rfc3339("2024-05-01T10:00:00.5Z").unwrap().with_timezone(&Utc);
        let late = DateTime::parse_from_rfc3339("2024-05-01T10:00:01Z").unwrap().with_timezone(&Utc);
        assert!(timestamp(early) < timestamp(late));
    }
}
