//! Collaborators that only write structured log lines.
//!
//! Used by the simulator binary and anywhere the panel runs without a backend.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::collaborators::*;
use crate::orders::Order;
use crate::workflow::{BonusAssessment, ProofKind, Step, StepRecord};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCollaborators;

#[async_trait]
impl Telephony for TracingCollaborators {
    async fn place_call(&self, phone: &str) -> Result<()> {
        info!(phone = %phone, "Dialing customer");
        Ok(())
    }
}

#[async_trait]
impl ProofUploads for TracingCollaborators {
    async fn record_upload(&self, order_id: &str, kind: ProofKind) -> Result<()> {
        info!(order_id = %order_id, kind = ?kind, "Proof upload requested");
        Ok(())
    }
}

#[async_trait]
impl InventoryAlerts for TracingCollaborators {
    async fn flag_stock_shortage(&self, order: &Order) -> Result<()> {
        warn!(
            order_id = %order.id,
            assigned = %order.assigned_items_summary(),
            "Inventory officer alerted to stock shortage"
        );
        Ok(())
    }
}

#[async_trait]
impl DeliveryLedger for TracingCollaborators {
    async fn record_step(&self, order_id: &str, step: Step, record: &StepRecord) -> Result<()> {
        info!(order_id = %order_id, step = step.number(), entry = %record, "Step logged");
        Ok(())
    }

    async fn mark_delivered(&self, order_id: &str, at: DateTime<Utc>) -> Result<()> {
        info!(order_id = %order_id, delivered_at = %at, "Order delivered");
        Ok(())
    }
}

#[async_trait]
impl BonusLedger for TracingCollaborators {
    async fn record_assessment(&self, order_id: &str, assessment: &BonusAssessment) -> Result<()> {
        info!(
            order_id = %order_id,
            eligible = assessment.eligible,
            elapsed_hours = assessment.elapsed_hours(),
            "Bonus assessment recorded"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for TracingCollaborators {
    async fn notify(&self, notification: Notification) -> Result<()> {
        if notification.is_destructive() {
            warn!(title = notification.title(), description = %notification.description(), "Notification");
        } else {
            info!(title = notification.title(), description = %notification.description(), "Notification");
        }
        Ok(())
    }
}
