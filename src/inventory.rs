//! Stock held by an agent, as last synced from the warehouse.
//!
//! Read-only: the agent never edits these numbers, they only decide whether
//! an assignment can be accepted at step 1.

use serde::{Deserialize, Serialize};

use crate::orders::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Low,
    Watch,
    Good,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockThresholds {
    pub low: u32,
    pub watch: u32,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self { low: 5, watch: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub item: String,
    pub stock_with_agent: u32,
    pub delivered: u32,
}

impl StockLine {
    pub fn remaining(&self) -> u32 {
        self.stock_with_agent.saturating_sub(self.delivered)
    }

    pub fn level(&self, thresholds: &StockThresholds) -> StockLevel {
        let remaining = self.remaining();
        if remaining <= thresholds.low {
            StockLevel::Low
        } else if remaining <= thresholds.watch {
            StockLevel::Watch
        } else {
            StockLevel::Good
        }
    }
}

/// Items the agent is short of for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub item: String,
    pub assigned: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub lines: Vec<StockLine>,
}

impl InventorySnapshot {
    pub fn new(lines: Vec<StockLine>) -> Self {
        Self { lines }
    }

    pub fn line(&self, item: &str) -> Option<&StockLine> {
        self.lines.iter().find(|line| line.item == item)
    }

    /// Items whose remaining stock cannot cover the order's assignment.
    pub fn shortfalls(&self, order: &Order) -> Vec<Shortfall> {
        order
            .assigned_items
            .iter()
            .filter_map(|(item, assigned)| {
                let available = self.line(item).map(StockLine::remaining).unwrap_or(0);
                (available < *assigned).then(|| Shortfall {
                    item: item.clone(),
                    assigned: *assigned,
                    available,
                })
            })
            .collect()
    }

    pub fn can_fulfil(&self, order: &Order) -> bool {
        self.shortfalls(order).is_empty()
    }

    pub fn low_stock(&self, thresholds: &StockThresholds) -> Vec<&StockLine> {
        self.lines
            .iter()
            .filter(|line| line.level(thresholds) == StockLevel::Low)
            .collect()
    }
}
