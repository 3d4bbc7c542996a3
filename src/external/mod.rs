//! External collaborator abstractions
//!
//! Trait seams for every capability the delivery panel delegates: telephony,
//! proof storage, inventory alerting, order and payroll ledgers, and
//! user-facing notifications.

pub mod collaborators;
pub mod logging;

pub use collaborators::{
    BonusLedger, Collaborators, DeliveryLedger, InventoryAlerts, Notification, Notifier,
    ProofUploads, Telephony,
};
pub use logging::TracingCollaborators;
