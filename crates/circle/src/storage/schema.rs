//! `SQLite` schema definitions for circle.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the orders table.
///
/// `circle_data` holds the order's CIRCLE fields as a JSON object.
pub const CREATE_ORDERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS orders (
    cle TEXT PRIMARY KEY,
    current_holder TEXT NOT NULL,
    status TEXT NOT NULL,
    created_by TEXT NOT NULL,
    last_modified_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    circle_data TEXT NOT NULL
)
";

/// SQL statement to create the order history table.
pub const CREATE_HISTORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS order_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cle TEXT NOT NULL REFERENCES orders(cle),
    timestamp TEXT NOT NULL,
    actor TEXT NOT NULL,
    action TEXT NOT NULL,
    changed_data TEXT
)
";

/// SQL statement to create an index for inbox queries.
pub const CREATE_HOLDER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_orders_holder ON orders(current_holder, status)
";

/// SQL statement to create an index on `created_by` for broker listings.
pub const CREATE_CREATOR_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_orders_creator ON orders(created_by)
";

/// SQL statement to create an index on the history's order key.
pub const CREATE_HISTORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_history_cle ON order_history(cle, id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_ORDERS_TABLE,
    CREATE_HISTORY_TABLE,
    CREATE_HOLDER_INDEX,
    CREATE_CREATOR_INDEX,
    CREATE_HISTORY_INDEX,
    CREATE_METADATA_TABLE,
];
