// Core types for the delivery action workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orders::ItemCounts;

/// The five gates an order passes through, in unlock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Acknowledge,
    CallCustomer,
    OutForDelivery,
    UploadProofs,
    VerifyOtp,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Acknowledge,
        Step::CallCustomer,
        Step::OutForDelivery,
        Step::UploadProofs,
        Step::VerifyOtp,
    ];

    /// 1-based position shown to the agent.
    pub fn number(self) -> u8 {
        match self {
            Step::Acknowledge => 1,
            Step::CallCustomer => 2,
            Step::OutForDelivery => 3,
            Step::UploadProofs => 4,
            Step::VerifyOtp => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Step::ALL.iter().copied().find(|step| step.number() == number)
    }

    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Acknowledge => "Acknowledge Assignment",
            Step::CallCustomer => "Call Customer",
            Step::OutForDelivery => "Mark as Out for Delivery",
            Step::UploadProofs => "Upload Proofs",
            Step::VerifyOtp => "Enter OTP & Mark Delivered",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}: {}", self.number(), self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofKind {
    /// Photo proving the agent holds the assigned stock
    Assignment,
    /// WhatsApp screenshot, POS receipt or transfer alert
    Payment,
}

impl ProofKind {
    pub fn log_text(self) -> &'static str {
        match self {
            ProofKind::Assignment => "Assignment Proof Uploaded",
            ProofKind::Payment => "Payment Uploaded",
        }
    }
}

/// Agent actions, one per step's primary control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowAction {
    AcknowledgeAssignment { agree: bool },
    InitiateCustomerCall,
    MarkOutForDelivery,
    UploadProof { kind: ProofKind },
    /// Edits the OTP field; does not submit
    EnterOtp { input: String },
    SubmitOtp { code: String },
}

impl WorkflowAction {
    /// The step that must be active for this action to be accepted.
    pub fn step(&self) -> Step {
        match self {
            WorkflowAction::AcknowledgeAssignment { .. } => Step::Acknowledge,
            WorkflowAction::InitiateCustomerCall => Step::CallCustomer,
            WorkflowAction::MarkOutForDelivery => Step::OutForDelivery,
            WorkflowAction::UploadProof { .. } => Step::UploadProofs,
            WorkflowAction::EnterOtp { .. } | WorkflowAction::SubmitOtp { .. } => Step::VerifyOtp,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowAction::AcknowledgeAssignment { .. } => "acknowledge_assignment",
            WorkflowAction::InitiateCustomerCall => "initiate_customer_call",
            WorkflowAction::MarkOutForDelivery => "mark_out_for_delivery",
            WorkflowAction::UploadProof { .. } => "upload_proof",
            WorkflowAction::EnterOtp { .. } => "enter_otp",
            WorkflowAction::SubmitOtp { .. } => "submit_otp",
        }
    }
}

/// One immutable step-log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub action: String,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for StepRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.action, self.at.format("%H:%M:%S"))
    }
}

/// Result of the delivery-speed check made when the OTP is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAssessment {
    pub sla_started_at: DateTime<Utc>,
    pub delivered_at: DateTime<Utc>,
    pub elapsed_seconds: i64,
    pub eligible: bool,
}

impl BonusAssessment {
    pub fn elapsed(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.elapsed_seconds)
    }

    pub fn elapsed_hours(&self) -> f64 {
        self.elapsed_seconds as f64 / 3600.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "step", rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending(Step),
    /// Step 1 declined for lack of stock; waits on the inventory officer
    Blocked,
    Delivered,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowStatus::Pending(step) => write!(f, "pending at step {}", step.number()),
            WorkflowStatus::Blocked => write!(f, "blocked on stock shortage"),
            WorkflowStatus::Delivered => write!(f, "delivered"),
        }
    }
}

/// Side effects requested by a transition. The runtime executes them; the
/// transition itself never touches a collaborator or a timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StepLogged { step: Step, record: StepRecord },
    StockShortage { order_id: String, assigned_items: ItemCounts },
    PlaceCall { phone: String },
    ProofUploaded { order_id: String, kind: ProofKind },
    Delivered { order_id: String, at: DateTime<Utc> },
    BonusAssessed(BonusAssessment),
    ShowBonusBanner { amount_naira: u32, display_for: std::time::Duration },
    ScheduleAutoClose { after: std::time::Duration },
}

/// Tunables for one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRules {
    pub sla_window: chrono::Duration,
    pub otp_length: usize,
    pub bonus_banner: std::time::Duration,
    pub auto_close: std::time::Duration,
    pub sla_bonus_naira: u32,
}

impl Default for WorkflowRules {
    fn default() -> Self {
        Self {
            sla_window: chrono::Duration::hours(10),
            otp_length: 4,
            bonus_banner: std::time::Duration::from_secs(6),
            auto_close: std::time::Duration::from_secs(2),
            sla_bonus_naira: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid OTP: expected {expected} characters, got {actual}")]
    Validation { expected: usize, actual: usize },
    #[error("{action} requires step {step_number} but the workflow is {status}", step_number = .required.number())]
    PreconditionNotMet {
        action: &'static str,
        required: Step,
        status: WorkflowStatus,
    },
    #[error("order {order_id} is blocked on a stock shortage")]
    StockShortage { order_id: String },
}

/// Final outcome handed to order management and payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub order_id: String,
    pub status: WorkflowStatus,
    pub sla_started_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub bonus: Option<BonusAssessment>,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.status == WorkflowStatus::Delivered
    }

    pub fn bonus_eligible(&self) -> bool {
        self.bonus.as_ref().is_some_and(|b| b.eligible)
    }
}
