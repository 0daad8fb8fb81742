//! Error types for circle.
//!
//! Every fallible operation in the crate returns [`Result`]. Workflow
//! refusals and validation failures are ordinary variants so front ends can
//! map them to exit codes and HTTP statuses.

use std::path::PathBuf;
use thiserror::Error;

use crate::order::OrderStatus;
use crate::validation::ValidationReport;
use crate::workflow::Action;

/// The main error type for circle operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// The order database could not be opened.
    #[error("cannot open order database {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A statement against the order database failed.
    #[error("database error: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// The schema could not be brought to the current version.
    #[error("schema migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// The configuration sources could not be merged or parsed.
    #[error("cannot load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Rule Errors ===
    /// The CIRCLE rule file could not be parsed.
    #[error("invalid rule file {path}: {message}")]
    RuleFile {
        /// Path to the rule file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// A reference data file could not be read.
    #[error("failed to read reference data {path}: {source}")]
    ReferenceData {
        /// Path to the CSV file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    // === Order Errors ===
    /// The order payload failed CIRCLE validation.
    #[error("order failed validation: {0}")]
    Validation(ValidationReport),

    /// No order exists with the given key.
    #[error("order {cle} not found")]
    OrderNotFound {
        /// The order key.
        cle: String,
    },

    /// An order with the given key already exists.
    #[error("order {cle} already exists")]
    DuplicateOrder {
        /// The order key.
        cle: String,
    },

    /// The acting party does not hold the order.
    #[error("order {cle} is held by {holder}, not {actor}")]
    NotHolder {
        /// The order key.
        cle: String,
        /// Current holder of the order.
        holder: String,
        /// The actor who attempted the change.
        actor: String,
    },

    /// The requested action is not allowed from the current status.
    #[error("cannot {action} order {cle} while it is {status}")]
    TransitionRefused {
        /// The order key.
        cle: String,
        /// The refused action.
        action: Action,
        /// Status the order is currently in.
        status: OrderStatus,
    },

    /// The order is in a status whose holder may only view it.
    #[error("order {cle} is {status} and can no longer be amended")]
    OrderLocked {
        /// The order key.
        cle: String,
        /// Status the order is currently in.
        status: OrderStatus,
    },

    /// Caller supplied an unusable argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // === I/O Errors ===
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parent directory for the database could not be created.
    #[error("cannot create directory {path}: {source}")]
    DirectoryCreate {
        /// The directory.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// Order data could not be encoded or decoded.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// A broken invariant inside circle.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for circle operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Build an [`Error::Internal`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a new invalid input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an order not found error.
    #[must_use]
    pub fn order_not_found(cle: impl Into<String>) -> Self {
        Self::OrderNotFound { cle: cle.into() }
    }

    /// Check if this error means the order does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::OrderNotFound { .. })
    }

    /// Check if this error carries a validation report.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error is a workflow refusal (wrong holder or status).
    #[must_use]
    pub fn is_workflow_refusal(&self) -> bool {
        matches!(
            self,
            Self::NotHolder { .. } | Self::TransitionRefused { .. } | Self::OrderLocked { .. }
        )
    }
}
