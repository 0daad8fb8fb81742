//! `circle` - Multi-actor wine order workflow
//!
//! Brokers, castles, merchants and warehouses pass orders along a fixed
//! path. Each order is a row in `SQLite` with a JSON object of CIRCLE fields,
//! checked against a JSON rule file and CSV reference data.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod order;
pub mod service;
pub mod storage;
pub mod validation;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use order::{CircleData, HistoryEntry, Order, OrderStatus, OrderWithHistory};
pub use service::OrderService;
pub use storage::{Storage, StorageStats};
pub use validation::{CircleValidator, ReferenceData, RuleSet, StaticLookup, ValidationReport};
pub use workflow::{Action, Role};
