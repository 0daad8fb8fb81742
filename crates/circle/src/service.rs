//! Order management.
//!
//! [`OrderService`] ties storage, validation and the workflow table together.
//! Both front ends go through it; neither touches [`Storage`] directly.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::order::{
    generate_cle, CircleData, Order, OrderStatus, OrderWithHistory, MERCHANT_RETURN_REASON_FIELD,
};
use crate::storage::{Storage, StorageStats};
use crate::validation::{CircleValidator, ReferenceData, RuleSet, ValidationReport};
use crate::workflow::{check_amendment, plan_transition, Action, Role};

/// Order operations shared by the CLI and the HTTP API.
#[derive(Debug)]
pub struct OrderService {
    storage: Storage,
    validator: CircleValidator,
}

impl OrderService {
    /// Create a service from its parts.
    #[must_use]
    pub fn new(storage: Storage, validator: CircleValidator) -> Self {
        Self { storage, validator }
    }

    /// Open the database, rule file and reference data named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, or the rule file
    /// or reference data is malformed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let rules = RuleSet::load(&config.rules_path())?;
        let reference = ReferenceData::load(&config.reference_dir())?;

        info!(
            rules = rules.len(),
            reference_codes = reference.code_count(),
            products = reference.product_count(),
            "Order service ready"
        );
        Ok(Self::new(storage, CircleValidator::new(rules, Arc::new(reference))))
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The validator in use.
    #[must_use]
    pub fn validator(&self) -> &CircleValidator {
        &self.validator
    }

    /// Validate `data` without touching storage.
    #[must_use]
    pub fn validate(&self, data: &CircleData) -> ValidationReport {
        self.validator.validate(data)
    }

    /// Create a draft order held by `broker_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the data fails the rules,
    /// [`Error::InvalidInput`] for a blank actor, or a storage error.
    pub fn create_order(&self, data: CircleData, creator_id: &str, broker_id: &str) -> Result<Order> {
        require_id("creator", creator_id)?;
        require_id("broker", broker_id)?;
        self.check(&data)?;

        let now = Utc::now();
        let cle = generate_cle(&data, creator_id, broker_id, now);
        let mut order = Order::new_draft(cle, data, creator_id, broker_id);
        order.created_at = now;
        order.updated_at = now;

        self.storage.insert_order(&order)?;
        info!(cle = %order.cle, creator = creator_id, broker = broker_id, "Order created");
        Ok(order)
    }

    /// Get an order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`] if no order has this key.
    pub fn get_order(&self, cle: &str) -> Result<Order> {
        self.storage
            .get_order(cle)?
            .ok_or_else(|| Error::order_not_found(cle))
    }

    /// Get an order with its audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`] if no order has this key.
    pub fn order_with_history(&self, cle: &str) -> Result<OrderWithHistory> {
        let order = self.get_order(cle)?;
        let history = self.storage.history(cle)?;
        Ok(OrderWithHistory { order, history })
    }

    /// Replace an order's data. Only the holder may do this, and not once
    /// the order has reached the warehouse.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`], [`Error::NotHolder`],
    /// [`Error::OrderLocked`] or [`Error::Validation`], or a storage error.
    pub fn update_order(&self, cle: &str, data: CircleData, modifier_id: &str) -> Result<Order> {
        let order = self.get_order(cle)?;
        check_amendment(&order, modifier_id)?;
        self.check(&data)?;

        self.storage.update_data(cle, &data, modifier_id)?;
        info!(cle, modifier = modifier_id, "Order amended");
        self.get_order(cle)
    }

    /// Apply a workflow action, handing the order to `target_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OrderNotFound`], [`Error::NotHolder`],
    /// [`Error::TransitionRefused`] or [`Error::InvalidInput`], or a storage
    /// error. A return with a reason changes the data, so it can also fail
    /// with [`Error::Validation`].
    pub fn transition(
        &self,
        cle: &str,
        action: Action,
        actor_id: &str,
        target_id: &str,
        reason: Option<&str>,
    ) -> Result<Order> {
        let order = self.get_order(cle)?;
        let transition = plan_transition(&order, action, actor_id, target_id, reason)?;

        let data = match reason.map(str::trim) {
            Some(reason) if action.requires_reason() => {
                let mut data = order.data;
                data.insert(MERCHANT_RETURN_REASON_FIELD.to_string(), reason.into());
                Some(data)
            }
            _ => None,
        };
        if let Some(data) = &data {
            self.check(data)?;
        }

        self.storage.update_status(
            cle,
            transition.status,
            &transition.holder,
            actor_id,
            &action.to_string(),
            data.as_ref(),
        )?;
        info!(
            cle,
            %action,
            actor = actor_id,
            holder = %transition.holder,
            status = %transition.status,
            "Order transitioned"
        );
        self.get_order(cle)
    }

    /// Orders held by `holder`, optionally with one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn orders_for_holder(&self, holder: &str, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        self.storage.orders_for_holder(holder, status)
    }

    /// Orders a role's party should see.
    ///
    /// A broker sees what they hold and what they created, newest first.
    /// Other roles see what they hold in the statuses that need their
    /// attention, most recently changed first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn inbox(&self, role: Role, actor_id: &str) -> Result<Vec<Order>> {
        let Some(statuses) = role.inbox_statuses() else {
            let mut seen = HashSet::new();
            let mut orders: Vec<Order> = self
                .storage
                .orders_for_holder(actor_id, None)?
                .into_iter()
                .chain(self.storage.orders_created_by(actor_id)?)
                .filter(|order| seen.insert(order.cle.clone()))
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            return Ok(orders);
        };

        let orders = self
            .storage
            .orders_for_holder(actor_id, None)?
            .into_iter()
            .filter(|order| statuses.contains(&order.status))
            .collect();
        Ok(orders)
    }

    /// Storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    fn check(&self, data: &CircleData) -> Result<()> {
        let report = self.validator.validate(data);
        if report.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(report))
        }
    }
}

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(Error::invalid_input(format!("{what} id cannot be empty")))
    } else {
        Ok(())
    }
}
