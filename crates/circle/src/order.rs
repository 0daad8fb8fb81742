//! Core order types for circle.
//!
//! An order is a single row: a generated key, a lifecycle status, the actor
//! currently holding it, and a JSON object of CIRCLE fields.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The CIRCLE fields of an order, keyed by field code (`C0`, `C10`, ...).
pub type CircleData = Map<String, Value>;

/// Fields that contribute to the order key, in addition to the parties and
/// the creation time.
const KEY_FIELDS: [&str; 4] = ["C0", "C1", "C10", "C11"];

/// Prefix of every generated order key.
const CLE_PREFIX: &str = "CLE-";

/// Number of hex digits of the hash kept in the key.
const CLE_HASH_LEN: usize = 16;

/// Data field that carries the merchant's reason for sending an order back.
pub const MERCHANT_RETURN_REASON_FIELD: &str = "C_MERCHANT_RETURN_REASON";

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created by a broker, not yet sent anywhere.
    NewDraft,
    /// Waiting for the castle to review.
    PendingCastleReview,
    /// Sent back to the broker by the castle.
    CastleAmended,
    /// Waiting for the merchant to approve.
    PendingMerchantApproval,
    /// Sent back to the castle by the merchant.
    MerchantAmended,
    /// Approved by the merchant and handed to logistics.
    MerchantApproved,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::NewDraft,
        Self::PendingCastleReview,
        Self::CastleAmended,
        Self::PendingMerchantApproval,
        Self::MerchantAmended,
        Self::MerchantApproved,
    ];

    /// The stored string form of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewDraft => "new_draft",
            Self::PendingCastleReview => "pending_castle_review",
            Self::CastleAmended => "castle_amended",
            Self::PendingMerchantApproval => "pending_merchant_approval",
            Self::MerchantAmended => "merchant_amended",
            Self::MerchantApproved => "merchant_approved",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::invalid_input(format!("unknown order status: {s}")))
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// The order key.
    pub cle: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Actor ID currently responsible for the order.
    pub current_holder: String,
    /// Actor ID that created the order.
    pub created_by: String,
    /// Actor ID of the last change.
    pub last_modified_by: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last change.
    pub updated_at: DateTime<Utc>,
    /// CIRCLE fields.
    pub data: CircleData,
}

impl Order {
    /// Build a fresh draft held by `holder`.
    #[must_use]
    pub fn new_draft(cle: String, data: CircleData, creator: &str, holder: &str) -> Self {
        let now = Utc::now();
        Self {
            cle,
            status: OrderStatus::NewDraft,
            current_holder: holder.to_string(),
            created_by: creator.to_string(),
            last_modified_by: creator.to_string(),
            created_at: now,
            updated_at: now,
            data,
        }
    }

    /// Text of a field, for display.
    #[must_use]
    pub fn field(&self, code: &str) -> Option<String> {
        self.data.get(code).and_then(value_text)
    }

    /// Check whether `actor_id` currently holds this order.
    #[must_use]
    pub fn is_held_by(&self, actor_id: &str) -> bool {
        self.current_holder == actor_id
    }
}

/// One entry of an order's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Row ID assigned by storage.
    pub id: i64,
    /// The order key.
    pub cle: String,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
    /// Who made the change.
    pub actor: String,
    /// What was done (`created`, `amended`, or an action name).
    pub action: String,
    /// Snapshot of the order data after the change.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_data: Option<CircleData>,
}

/// An order together with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWithHistory {
    /// The order.
    #[serde(flatten)]
    pub order: Order,
    /// Oldest entry first.
    pub history: Vec<HistoryEntry>,
}

/// Generate the key for a new order.
///
/// The key hashes the present key fields (sorted), the creator, the initial
/// holder and the creation time, so two orders for the same wine never
/// collide.
#[must_use]
pub fn generate_cle(data: &CircleData, creator: &str, holder: &str, at: DateTime<Utc>) -> String {
    let mut key_fields: Vec<String> = KEY_FIELDS
        .iter()
        .filter_map(|code| data.get(*code).and_then(value_text))
        .filter(|text| !text.is_empty())
        .collect();
    key_fields.sort();

    let key_string = format!(
        "{}|{creator}|{holder}|{}",
        key_fields.join("-"),
        at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    );
    let hash = blake3::hash(key_string.as_bytes()).to_hex().to_string();

    format!("{CLE_PREFIX}{}", hash[..CLE_HASH_LEN].to_ascii_uppercase())
}

/// Render a scalar JSON value as text. Strings are returned unquoted;
/// `null` yields `None`.
#[must_use]
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a `CODE=VALUE` field assignment.
///
/// The value is read as JSON when it parses (`["A0","B1"]`, `12`), and kept
/// as a plain string otherwise.
///
/// # Errors
///
/// Returns an error if there is no `=` or the code is empty.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let (code, value) = raw
        .split_once('=')
        .ok_or_else(|| Error::invalid_input(format!("expected CODE=VALUE, got '{raw}'")))?;

    let code = code.trim();
    if code.is_empty() {
        return Err(Error::invalid_input(format!("empty field code in '{raw}'")));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((code.to_string(), value))
}

/// Apply a list of `CODE=VALUE` assignments on top of `data`.
///
/// # Errors
///
/// Returns an error if any assignment is malformed.
pub fn apply_assignments<S: AsRef<str>>(mut data: CircleData, assignments: &[S]) -> Result<CircleData> {
    for raw in assignments {
        let (code, value) = parse_assignment(raw.as_ref())?;
        data.insert(code, value);
    }
    Ok(data)
}
