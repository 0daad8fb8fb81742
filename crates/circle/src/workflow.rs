//! Order lifecycle rules.
//!
//! Orders move along a fixed directed path between the four actor roles.
//! Each [`Action`] belongs to one role, is allowed from a set of statuses,
//! and hands the order to a party of the next role.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::order::{Order, OrderStatus};

/// A party that can hold and change orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Creates orders and sends them to a castle.
    Broker,
    /// Reviews orders and forwards them to a merchant.
    Castle,
    /// Approves orders or sends them back.
    Merchant,
    /// Views approved orders for dispatch.
    Warehouse,
}

impl Role {
    /// Every role, in workflow order.
    pub const ALL: [Self; 4] = [Self::Broker, Self::Castle, Self::Merchant, Self::Warehouse];

    /// Statuses listed in this role's inbox, or `None` for any status.
    #[must_use]
    pub fn inbox_statuses(self) -> Option<&'static [OrderStatus]> {
        match self {
            Self::Broker => None,
            Self::Castle => Some(&[
                OrderStatus::PendingCastleReview,
                OrderStatus::MerchantAmended,
            ]),
            Self::Merchant => Some(&[OrderStatus::PendingMerchantApproval]),
            Self::Warehouse => Some(&[OrderStatus::MerchantApproved]),
        }
    }

    /// Actions this role can take.
    #[must_use]
    pub fn actions(self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| action.role() == self)
            .collect()
    }

    /// Whether this role may amend order data it holds.
    #[must_use]
    pub fn can_edit(self) -> bool {
        !matches!(self, Self::Warehouse)
    }

    /// The role whose party holds an order in `status`.
    #[must_use]
    pub fn holding(status: OrderStatus) -> Self {
        match status {
            OrderStatus::NewDraft | OrderStatus::CastleAmended => Self::Broker,
            OrderStatus::PendingCastleReview | OrderStatus::MerchantAmended => Self::Castle,
            OrderStatus::PendingMerchantApproval => Self::Merchant,
            OrderStatus::MerchantApproved => Self::Warehouse,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Broker => write!(f, "broker"),
            Self::Castle => write!(f, "castle"),
            Self::Merchant => write!(f, "merchant"),
            Self::Warehouse => write!(f, "warehouse"),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_input(format!("unknown role: {s}")))
    }
}

/// A lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Broker hands a draft to a castle.
    SendToCastle,
    /// Castle hands the order back to the broker.
    ReturnToBroker,
    /// Castle forwards the order to a merchant.
    SendToMerchant,
    /// Merchant approves and hands the order to a warehouse.
    Approve,
    /// Merchant sends the order back to the castle with a reason.
    ReturnToCastle,
}

impl Action {
    /// Every action.
    pub const ALL: [Self; 5] = [
        Self::SendToCastle,
        Self::ReturnToBroker,
        Self::SendToMerchant,
        Self::Approve,
        Self::ReturnToCastle,
    ];

    /// The role allowed to take this action.
    #[must_use]
    pub fn role(self) -> Role {
        match self {
            Self::SendToCastle => Role::Broker,
            Self::ReturnToBroker | Self::SendToMerchant => Role::Castle,
            Self::Approve | Self::ReturnToCastle => Role::Merchant,
        }
    }

    /// Statuses the order must be in.
    #[must_use]
    pub fn allowed_from(self) -> &'static [OrderStatus] {
        match self {
            Self::SendToCastle => &[OrderStatus::NewDraft, OrderStatus::CastleAmended],
            Self::ReturnToBroker => &[OrderStatus::PendingCastleReview],
            Self::SendToMerchant => &[
                OrderStatus::PendingCastleReview,
                OrderStatus::MerchantAmended,
            ],
            Self::Approve | Self::ReturnToCastle => &[OrderStatus::PendingMerchantApproval],
        }
    }

    /// Status the order ends up in.
    #[must_use]
    pub fn target_status(self) -> OrderStatus {
        match self {
            Self::SendToCastle => OrderStatus::PendingCastleReview,
            Self::ReturnToBroker => OrderStatus::CastleAmended,
            Self::SendToMerchant => OrderStatus::PendingMerchantApproval,
            Self::Approve => OrderStatus::MerchantApproved,
            Self::ReturnToCastle => OrderStatus::MerchantAmended,
        }
    }

    /// Role of the party receiving the order.
    #[must_use]
    pub fn target_role(self) -> Role {
        match self {
            Self::SendToCastle | Self::ReturnToCastle => Role::Castle,
            Self::ReturnToBroker => Role::Broker,
            Self::SendToMerchant => Role::Merchant,
            Self::Approve => Role::Warehouse,
        }
    }

    /// Whether the action needs a written reason.
    #[must_use]
    pub fn requires_reason(self) -> bool {
        matches!(self, Self::ReturnToCastle)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendToCastle => write!(f, "send_to_castle"),
            Self::ReturnToBroker => write!(f, "return_to_broker"),
            Self::SendToMerchant => write!(f, "send_to_merchant"),
            Self::Approve => write!(f, "approve"),
            Self::ReturnToCastle => write!(f, "return_to_castle"),
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|action| action.to_string() == normalized)
            .ok_or_else(|| Error::invalid_input(format!("unknown action: {s}")))
    }
}

/// A checked transition, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The action taken.
    pub action: Action,
    /// Status after the transition.
    pub status: OrderStatus,
    /// Holder after the transition.
    pub holder: String,
}

/// Check that `actor_id` may take `action` on `order`, handing it to
/// `target_id`.
///
/// # Errors
///
/// Returns [`Error::NotHolder`] if the actor does not hold the order,
/// [`Error::TransitionRefused`] if the status does not allow the action, and
/// [`Error::InvalidInput`] if the target is blank or a required reason is
/// missing.
pub fn plan_transition(
    order: &Order,
    action: Action,
    actor_id: &str,
    target_id: &str,
    reason: Option<&str>,
) -> Result<Transition> {
    if !order.is_held_by(actor_id) {
        return Err(Error::NotHolder {
            cle: order.cle.clone(),
            holder: order.current_holder.clone(),
            actor: actor_id.to_string(),
        });
    }

    if !action.allowed_from().contains(&order.status) {
        return Err(Error::TransitionRefused {
            cle: order.cle.clone(),
            action,
            status: order.status,
        });
    }

    let target_id = target_id.trim();
    if target_id.is_empty() {
        return Err(Error::invalid_input(format!(
            "{action} needs a target {} id",
            action.target_role()
        )));
    }

    if action.requires_reason() && reason.map_or(true, |r| r.trim().is_empty()) {
        return Err(Error::invalid_input(format!("{action} needs a reason")));
    }

    Ok(Transition {
        action,
        status: action.target_status(),
        holder: target_id.to_string(),
    })
}

/// Check that `modifier_id` may replace the data of `order`.
///
/// # Errors
///
/// Returns [`Error::NotHolder`] if the modifier does not hold the order and
/// [`Error::OrderLocked`] if the role holding it in its current status is
/// view-only.
pub fn check_amendment(order: &Order, modifier_id: &str) -> Result<()> {
    if !order.is_held_by(modifier_id) {
        return Err(Error::NotHolder {
            cle: order.cle.clone(),
            holder: order.current_holder.clone(),
            actor: modifier_id.to_string(),
        });
    }

    if !Role::holding(order.status).can_edit() {
        return Err(Error::OrderLocked {
            cle: order.cle.clone(),
            status: order.status,
        });
    }
    Ok(())
}
