// Delivery Action Workflow - gated five-step flow for one order
//
// Transitions are pure; effects are carried out by the panel runtime.

pub mod state_machine;
pub mod types;

#[cfg(test)]
mod tests;

pub use state_machine::{Transition, WorkflowState};
pub use types::{
    BonusAssessment, DeliveryOutcome, Effect, ProofKind, Step, StepRecord, WorkflowAction,
    WorkflowError, WorkflowRules, WorkflowStatus,
};
