//! Dual verification: what was assigned versus what the agent says was delivered.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::orders::ItemCounts;
use crate::strikes::{Severity, Violation, ViolationKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("{item}: delivered {delivered} but only {assigned} assigned")]
    ExceedsAssigned {
        item: String,
        assigned: u32,
        delivered: u32,
    },
    #[error("{item} was delivered but never assigned")]
    UnassignedItem { item: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemLine {
    pub item: String,
    pub assigned: u32,
    pub delivered: u32,
}

impl ItemLine {
    pub fn matched(&self) -> bool {
        self.assigned == self.delivered
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub lines: Vec<ItemLine>,
}

impl Reconciliation {
    pub fn is_match(&self) -> bool {
        self.lines.iter().all(ItemLine::matched)
    }

    pub fn mismatched(&self) -> impl Iterator<Item = &ItemLine> {
        self.lines.iter().filter(|line| !line.matched())
    }

    /// A short delivery with no declared reason is a strike.
    pub fn undeclared_mismatch(&self, reason: Option<&str>, on: NaiveDate) -> Option<Violation> {
        if self.is_match() || reason.is_some_and(|r| !r.trim().is_empty()) {
            return None;
        }

        let notes = self
            .mismatched()
            .map(|line| format!("{} {}/{}", line.item, line.delivered, line.assigned))
            .collect::<Vec<_>>()
            .join(", ");

        Some(Violation {
            kind: ViolationKind::UndeclaredMismatch,
            date: on,
            severity: Severity::Strike,
            notes: format!("Delivered wrong qty without reason: {notes}"),
        })
    }
}

/// Compare delivered quantities against the assignment. Items missing from
/// `delivered` count as zero.
pub fn reconcile(assigned: &ItemCounts, delivered: &ItemCounts) -> Result<Reconciliation, ReconciliationError> {
    if let Some(item) = delivered.keys().find(|item| !assigned.contains_key(*item)) {
        return Err(ReconciliationError::UnassignedItem { item: item.clone() });
    }

    let lines = assigned
        .iter()
        .map(|(item, &assigned)| {
            let delivered = delivered.get(item).copied().unwrap_or(0);
            if delivered > assigned {
                return Err(ReconciliationError::ExceedsAssigned {
                    item: item.clone(),
                    assigned,
                    delivered,
                });
            }
            Ok(ItemLine {
                item: item.clone(),
                assigned,
                delivered,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Reconciliation { lines })
}
