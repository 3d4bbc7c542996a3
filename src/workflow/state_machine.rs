// Gated five-step delivery workflow.
//
// Every action is a pure transition: the current state is never mutated, a new
// state plus the effects the runtime must carry out is returned instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::types::*;
use crate::orders::Order;

const ASSIGNMENT_ACCEPTED: &str = "Assignment Accepted";
const FLOW_BLOCKED: &str = "Not Enough Stock - Flow Blocked";
const CALL_INITIATED: &str = "Call Initiated";
const IN_TRANSIT: &str = "In Transit";
const ORDER_DELIVERED: &str = "OTP Verified - Order Delivered";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    order: Order,
    current_step: Step,
    blocked: bool,
    step_log: BTreeMap<Step, StepRecord>,
    proofs: Vec<ProofKind>,
    otp_input: String,
    sla_started_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    bonus: Option<BonusAssessment>,
}

/// A successful transition: the next state and what the runtime must do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: WorkflowState,
    pub effects: Vec<Effect>,
}

impl WorkflowState {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            current_step: Step::Acknowledge,
            blocked: false,
            step_log: BTreeMap::new(),
            proofs: Vec::new(),
            otp_input: String::new(),
            sla_started_at: None,
            delivered_at: None,
            bonus: None,
        }
    }

    /// Handle one agent action - main state transition logic
    pub fn apply(
        &self,
        action: &WorkflowAction,
        now: DateTime<Utc>,
        rules: &WorkflowRules,
    ) -> Result<Transition, WorkflowError> {
        self.guard(action)?;

        let mut next = self.clone();
        let mut effects = Vec::new();

        match action {
            WorkflowAction::AcknowledgeAssignment { agree: true } => {
                next.log_step(Step::Acknowledge, ASSIGNMENT_ACCEPTED, now, &mut effects);
                next.current_step = Step::CallCustomer;
            }

            WorkflowAction::AcknowledgeAssignment { agree: false } => {
                warn!(
                    order_id = %self.order.id,
                    assigned = %self.order.assigned_items_summary(),
                    "Agent declined assignment for lack of stock"
                );
                next.log_step(Step::Acknowledge, FLOW_BLOCKED, now, &mut effects);
                next.blocked = true;
                effects.push(Effect::StockShortage {
                    order_id: self.order.id.clone(),
                    assigned_items: self.order.assigned_items.clone(),
                });
            }

            WorkflowAction::InitiateCustomerCall => {
                effects.push(Effect::PlaceCall {
                    phone: self.order.phone.clone(),
                });
                next.log_step(Step::CallCustomer, CALL_INITIATED, now, &mut effects);
                next.current_step = Step::OutForDelivery;
            }

            WorkflowAction::MarkOutForDelivery => {
                next.log_step(Step::OutForDelivery, IN_TRANSIT, now, &mut effects);
                next.sla_started_at = Some(now);
                next.current_step = Step::UploadProofs;
            }

            WorkflowAction::UploadProof { kind } => {
                effects.push(Effect::ProofUploaded {
                    order_id: self.order.id.clone(),
                    kind: *kind,
                });
                next.log_step(Step::UploadProofs, kind.log_text(), now, &mut effects);
                next.proofs.push(*kind);
                // Payment proof is the only way to reach the OTP gate
                if *kind == ProofKind::Payment {
                    next.current_step = Step::VerifyOtp;
                }
            }

            WorkflowAction::EnterOtp { input } => {
                next.otp_input = input.chars().take(rules.otp_length).collect();
            }

            WorkflowAction::SubmitOtp { code } => {
                let actual = code.chars().count();
                if actual != rules.otp_length {
                    warn!(
                        order_id = %self.order.id,
                        length = actual,
                        "Rejected OTP with wrong length"
                    );
                    return Err(WorkflowError::Validation {
                        expected: rules.otp_length,
                        actual,
                    });
                }

                next.otp_input = code.clone();
                next.log_step(Step::VerifyOtp, ORDER_DELIVERED, now, &mut effects);
                next.delivered_at = Some(now);
                effects.push(Effect::Delivered {
                    order_id: self.order.id.clone(),
                    at: now,
                });

                if let Some(assessment) = next.assess_bonus(now, rules) {
                    if assessment.eligible {
                        effects.push(Effect::ShowBonusBanner {
                            amount_naira: rules.sla_bonus_naira,
                            display_for: rules.bonus_banner,
                        });
                    }
                    effects.push(Effect::BonusAssessed(assessment.clone()));
                    next.bonus = Some(assessment);
                }

                effects.push(Effect::ScheduleAutoClose {
                    after: rules.auto_close,
                });
            }
        }

        info!(
            order_id = %self.order.id,
            action = action.name(),
            from = %self.status(),
            to = %next.status(),
            effects = effects.len(),
            "Delivery workflow transition"
        );

        Ok(Transition {
            state: next,
            effects,
        })
    }

    /// Rejects actions whose step is not the active one.
    fn guard(&self, action: &WorkflowAction) -> Result<(), WorkflowError> {
        if self.blocked {
            return Err(WorkflowError::StockShortage {
                order_id: self.order.id.clone(),
            });
        }

        let required = action.step();
        if self.is_delivered() || required != self.current_step {
            return Err(WorkflowError::PreconditionNotMet {
                action: action.name(),
                required,
                status: self.status(),
            });
        }

        Ok(())
    }

    /// Writes a step's log entry once; later writes for the same step are kept
    /// out of the log.
    fn log_step(&mut self, step: Step, action: &str, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        if self.step_log.contains_key(&step) {
            return;
        }
        let record = StepRecord {
            action: action.to_string(),
            at: now,
        };
        self.step_log.insert(step, record.clone());
        effects.push(Effect::StepLogged { step, record });
    }

    fn assess_bonus(&self, now: DateTime<Utc>, rules: &WorkflowRules) -> Option<BonusAssessment> {
        let started = self.sla_started_at?;
        let elapsed = now.signed_duration_since(started);
        let backwards = elapsed < chrono::Duration::zero();
        if backwards {
            warn!(
                order_id = %self.order.id,
                elapsed_seconds = elapsed.num_seconds(),
                "Delivery timestamp precedes SLA start; bonus withheld"
            );
        }
        Some(BonusAssessment {
            sla_started_at: started,
            delivered_at: now,
            elapsed_seconds: elapsed.num_seconds(),
            eligible: !backwards && elapsed <= rules.sla_window,
        })
    }

    pub fn status(&self) -> WorkflowStatus {
        if self.is_delivered() {
            WorkflowStatus::Delivered
        } else if self.blocked {
            WorkflowStatus::Blocked
        } else {
            WorkflowStatus::Pending(self.current_step)
        }
    }

    /// True when `step`'s controls are interactable.
    pub fn is_step_active(&self, step: Step) -> bool {
        matches!(self.status(), WorkflowStatus::Pending(current) if current == step)
    }

    pub fn is_delivered(&self) -> bool {
        self.step_log.contains_key(&Step::VerifyOtp)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn step_log(&self) -> &BTreeMap<Step, StepRecord> {
        &self.step_log
    }

    pub fn log_entry(&self, step: Step) -> Option<&StepRecord> {
        self.step_log.get(&step)
    }

    pub fn proofs(&self) -> &[ProofKind] {
        &self.proofs
    }

    pub fn otp_input(&self) -> &str {
        &self.otp_input
    }

    pub fn sla_started_at(&self) -> Option<DateTime<Utc>> {
        self.sla_started_at
    }

    pub fn bonus(&self) -> Option<&BonusAssessment> {
        self.bonus.as_ref()
    }

    pub fn bonus_eligible(&self) -> bool {
        self.bonus.as_ref().is_some_and(|b| b.eligible)
    }

    /// Time left on the SLA window, clamped at zero. None before step 3.
    pub fn sla_remaining(&self, now: DateTime<Utc>, rules: &WorkflowRules) -> Option<chrono::Duration> {
        let started = self.sla_started_at?;
        let remaining = rules.sla_window - now.signed_duration_since(started);
        Some(remaining.max(chrono::Duration::zero()))
    }

    pub fn outcome(&self) -> DeliveryOutcome {
        DeliveryOutcome {
            order_id: self.order.id.clone(),
            status: self.status(),
            sla_started_at: self.sla_started_at,
            delivered_at: self.delivered_at,
            bonus: self.bonus.clone(),
        }
    }
}
