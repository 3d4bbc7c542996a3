//! Collaborator seams for the delivery panel
//!
//! The workflow never talks to a device or a backend directly. Each capability
//! it needs is a trait here so the panel runtime can be driven against real
//! services, the logging implementation, or mocks in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use crate::orders::Order;
use crate::workflow::{BonusAssessment, ProofKind, Step, StepRecord};

/// Device dialer. Fire-and-forget: the call outcome is never observed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Telephony: Send + Sync {
    async fn place_call(&self, phone: &str) -> Result<()>;
}

/// File store for proof images. Only the upload request is recorded.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProofUploads: Send + Sync {
    async fn record_upload(&self, order_id: &str, kind: ProofKind) -> Result<()>;
}

/// Inventory officer / guarantor alerting.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InventoryAlerts: Send + Sync {
    async fn flag_stock_shortage(&self, order: &Order) -> Result<()>;
}

/// Order-management backend that persists step logs and the delivered signal.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeliveryLedger: Send + Sync {
    async fn record_step(&self, order_id: &str, step: Step, record: &StepRecord) -> Result<()>;

    async fn mark_delivered(&self, order_id: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Payroll / bonus accounting.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BonusLedger: Send + Sync {
    async fn record_assessment(&self, order_id: &str, assessment: &BonusAssessment) -> Result<()>;
}

/// User-facing messages raised by the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StepCompleted { order_id: String, message: String },
    StockShortageFlagged { order_id: String },
    InvalidOtp { order_id: String, expected_length: usize },
    BonusEarned { order_id: String, amount_naira: u32 },
    BonusBannerHidden { order_id: String },
    PanelClosed { order_id: String },
}

impl Notification {
    pub fn title(&self) -> &'static str {
        match self {
            Notification::StepCompleted { .. } => "Step Completed",
            Notification::StockShortageFlagged { .. } => "Inventory Issue",
            Notification::InvalidOtp { .. } => "Invalid OTP",
            Notification::BonusEarned { .. } => "Bonus Earned",
            Notification::BonusBannerHidden { .. } => "Bonus Banner Hidden",
            Notification::PanelClosed { .. } => "Panel Closed",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Notification::StepCompleted { message, .. } => message.clone(),
            Notification::StockShortageFlagged { .. } => {
                "Stock shortage flagged. Inventory Officer will be notified.".to_string()
            }
            Notification::InvalidOtp { expected_length, .. } => {
                format!("Please enter a valid {expected_length}-digit OTP")
            }
            Notification::BonusEarned { amount_naira, .. } => {
                format!("Your fast delivery just earned you \u{20a6}{amount_naira} extra.")
            }
            Notification::BonusBannerHidden { .. } => String::new(),
            Notification::PanelClosed { order_id } => format!("Order {order_id} panel closed"),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Notification::StockShortageFlagged { .. } | Notification::InvalidOtp { .. }
        )
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<()>;
}

/// Everything one panel instance needs from the outside world.
#[derive(Clone)]
pub struct Collaborators {
    pub telephony: Arc<dyn Telephony>,
    pub proofs: Arc<dyn ProofUploads>,
    pub inventory: Arc<dyn InventoryAlerts>,
    pub deliveries: Arc<dyn DeliveryLedger>,
    pub bonuses: Arc<dyn BonusLedger>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Uses one implementation for every seam.
    pub fn uniform<T>(inner: Arc<T>) -> Self
    where
        T: Telephony + ProofUploads + InventoryAlerts + DeliveryLedger + BonusLedger + Notifier + 'static,
    {
        Self {
            telephony: inner.clone(),
            proofs: inner.clone(),
            inventory: inner.clone(),
            deliveries: inner.clone(),
            bonuses: inner.clone(),
            notifier: inner,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
