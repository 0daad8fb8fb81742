//! Request and response types for the circle HTTP API.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use serde::{Deserialize, Serialize};

use crate::order::CircleData;
use crate::validation::ValidationReport;
use crate::workflow::Action;

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `true`.
    pub ok: bool,
    /// Service name.
    pub service: String,
    /// Crate version.
    pub version: String,
}

// ---------------------------------------------------------------------------
// /orders
// ---------------------------------------------------------------------------

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// CIRCLE fields.
    pub data: CircleData,
    /// Who is creating the order.
    pub creator_id: String,
    /// Broker that will hold the draft.
    pub broker_id: String,
}

/// Body of `PUT /orders/:cle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    /// Replacement CIRCLE fields.
    pub data: CircleData,
    /// Who is making the change; must hold the order.
    pub modifier_id: String,
}

/// Body of `POST /orders/:cle/transition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Workflow action, e.g. `send_to_castle`.
    pub action: Action,
    /// Who is acting; must hold the order.
    pub actor_id: String,
    /// Party receiving the order.
    pub target_id: String,
    /// Required for `return_to_castle`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Query of `GET /orders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// Only orders held by this actor.
    pub holder: Option<String>,
    /// Only orders in this status.
    pub status: Option<String>,
    /// Maximum number of orders when no holder is given.
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// /validate
// ---------------------------------------------------------------------------

/// Body of `POST /validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    /// CIRCLE fields to check.
    pub data: CircleData,
}

/// Result of a dry-run validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Whether the data passed every rule.
    pub valid: bool,
    /// Error messages by field code; empty when valid.
    pub errors: ValidationReport,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Validation errors by field code, for 422 responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ValidationReport>,
}
