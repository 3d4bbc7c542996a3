// da-desk Library - Delivery Agent Action Desk
// Exposes the delivery workflow, its panel runtime, and the agent dashboard rules

pub mod clock;
pub mod config;
pub mod external;
pub mod inventory;
pub mod orders;
pub mod panel;
pub mod performance;
pub mod reconciliation;
pub mod strikes;
pub mod telemetry;
pub mod workflow;

// Re-export key types for easy access
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{config, init_config, DaDeskConfig};
pub use external::{Collaborators, Notification, TracingCollaborators};
pub use inventory::{InventorySnapshot, StockLevel, StockLine};
pub use orders::{Order, OrderError, SlaCountdown, SlaUrgency};
pub use panel::{ActionPanel, PanelError, PanelPhase, PanelSignal};
pub use performance::{weekly_stats, PerformanceRules, WeeklyStats};
pub use reconciliation::{reconcile, Reconciliation, ReconciliationError};
pub use strikes::{Standing, StrikeAlert, StrikeLedger, Violation};
pub use telemetry::{create_panel_span, generate_correlation_id, init_telemetry};
pub use workflow::{
    DeliveryOutcome, Effect, ProofKind, Step, WorkflowAction, WorkflowError, WorkflowRules,
    WorkflowState, WorkflowStatus,
};
