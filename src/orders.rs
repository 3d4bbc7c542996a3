//! Order records supplied by the order-management backend.
//!
//! Orders are read-only to everything in this crate. The workflow keeps its own
//! copy for the lifetime of one panel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Item name to assigned unit count. Ordered so summaries are stable.
pub type ItemCounts = BTreeMap<String, u32>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer: String,
    pub phone: String,
    pub address: String,
    pub email: String,
    pub product: String,
    pub quantity: u32,
    #[serde(default)]
    pub discount: String,
    #[serde(default)]
    pub source: String,
    pub assigned_items: ItemCounts,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {order_id} has no assigned items")]
    NoAssignedItems { order_id: String },
    #[error("order {order_id} assigns zero units of {item}")]
    ZeroQuantity { order_id: String, item: String },
    #[error("order is missing an id")]
    MissingId,
}

impl Order {
    /// Checks the shape guarantees the workflow relies on.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.id.trim().is_empty() {
            return Err(OrderError::MissingId);
        }
        if self.assigned_items.is_empty() {
            return Err(OrderError::NoAssignedItems {
                order_id: self.id.clone(),
            });
        }
        if let Some((item, _)) = self.assigned_items.iter().find(|(_, qty)| **qty == 0) {
            return Err(OrderError::ZeroQuantity {
                order_id: self.id.clone(),
                item: item.clone(),
            });
        }
        Ok(())
    }

    /// "3 Shampoos, 1 Conditioner" - what the agent is expected to deliver.
    pub fn assigned_items_summary(&self) -> String {
        self.assigned_items
            .iter()
            .map(|(item, qty)| {
                let plural = if *qty > 1 { "s" } else { "" };
                format!("{qty} {item}{plural}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn total_assigned_units(&self) -> u32 {
        self.assigned_items.values().sum()
    }
}

/// How close an active order is to breaching its confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlaUrgency {
    Critical,
    Warning,
    Comfortable,
}

/// Remaining time on an order shown in the pressure-orders view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaCountdown {
    pub remaining_seconds: u64,
}

impl SlaCountdown {
    pub fn new(remaining_seconds: u64) -> Self {
        Self { remaining_seconds }
    }

    pub fn urgency(&self) -> SlaUrgency {
        match self.remaining_seconds {
            0..300 => SlaUrgency::Critical,
            300..600 => SlaUrgency::Warning,
            _ => SlaUrgency::Comfortable,
        }
    }
}

impl std::fmt::Display for SlaCountdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mins = self.remaining_seconds / 60;
        let secs = self.remaining_seconds % 60;
        write!(f, "{mins}:{secs:02}")
    }
}

#[cfg(test)]
pub(crate) fn sample_order() -> Order {
    Order {
        id: "FHG345".to_string(),
        customer: "Janet Ibrahim".to_string(),
        phone: "08012345678".to_string(),
        address: "Victoria Island, Lagos".to_string(),
        email: "janet@example.com".to_string(),
        product: "Shampoo".to_string(),
        quantity: 3,
        discount: "10%".to_string(),
        source: "WhatsApp".to_string(),
        assigned_items: BTreeMap::from([("Shampoo".to_string(), 3)]),
    }
}
