// Tests for the delivery workflow transitions

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::orders::sample_order;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 27, 8, 0, 0).unwrap()
}

fn step(state: &WorkflowState, action: WorkflowAction, at: DateTime<Utc>) -> Transition {
    state
        .apply(&action, at, &WorkflowRules::default())
        .expect("transition should be accepted")
}

/// Drives a fresh workflow up to the OTP gate; out-for-delivery happens at `start()`.
fn at_otp_gate() -> WorkflowState {
    let t0 = start();
    let state = WorkflowState::new(sample_order());
    let state = step(&state, WorkflowAction::AcknowledgeAssignment { agree: true }, t0).state;
    let state = step(&state, WorkflowAction::InitiateCustomerCall, t0).state;
    let state = step(&state, WorkflowAction::MarkOutForDelivery, t0).state;
    step(
        &state,
        WorkflowAction::UploadProof {
            kind: ProofKind::Payment,
        },
        t0 + Duration::minutes(30),
    )
    .state
}

#[test]
fn test_full_flow_within_window_earns_bonus() {
    let state = at_otp_gate();
    assert_eq!(state.status(), WorkflowStatus::Pending(Step::VerifyOtp));

    let delivered_at = start() + Duration::hours(4);
    let transition = step(
        &state,
        WorkflowAction::SubmitOtp {
            code: "1234".to_string(),
        },
        delivered_at,
    );

    let state = transition.state;
    assert_eq!(state.status(), WorkflowStatus::Delivered);
    assert!(state.bonus_eligible());
    assert_eq!(
        state.log_entry(Step::VerifyOtp).unwrap().action,
        "OTP Verified - Order Delivered"
    );

    assert!(transition.effects.contains(&Effect::Delivered {
        order_id: "FHG345".to_string(),
        at: delivered_at,
    }));
    assert!(transition.effects.iter().any(|e| matches!(
        e,
        Effect::ShowBonusBanner { amount_naira: 200, display_for } if display_for.as_secs() == 6
    )));
    assert!(matches!(
        transition.effects.last(),
        Some(Effect::ScheduleAutoClose { after }) if after.as_secs() == 2
    ));
}

#[test]
fn test_late_delivery_is_not_bonus_eligible() {
    let state = at_otp_gate();
    let transition = step(
        &state,
        WorkflowAction::SubmitOtp {
            code: "1234".to_string(),
        },
        start() + Duration::hours(11),
    );

    assert!(transition.state.is_delivered());
    assert!(!transition.state.bonus_eligible());
    assert_eq!(transition.state.bonus().unwrap().elapsed_seconds, 11 * 3600);
    assert!(!transition
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowBonusBanner { .. })));
}

#[test]
fn test_delivery_exactly_at_window_edge_is_eligible() {
    let state = at_otp_gate();
    let transition = step(
        &state,
        WorkflowAction::SubmitOtp {
            code: "0000".to_string(),
        },
        start() + Duration::hours(10),
    );

    assert!(transition.state.bonus_eligible());
}

#[test]
fn test_decline_blocks_flow() {
    let state = WorkflowState::new(sample_order());
    let transition = step(
        &state,
        WorkflowAction::AcknowledgeAssignment { agree: false },
        start(),
    );
    let blocked = transition.state;

    assert_eq!(blocked.status(), WorkflowStatus::Blocked);
    assert_eq!(blocked.current_step(), Step::Acknowledge);
    assert!(blocked
        .log_entry(Step::Acknowledge)
        .unwrap()
        .action
        .contains("Flow Blocked"));
    assert!(transition
        .effects
        .iter()
        .any(|e| matches!(e, Effect::StockShortage { order_id, .. } if order_id == "FHG345")));

    // Nothing is reachable afterwards, not even a second acknowledgement
    let rules = WorkflowRules::default();
    for action in [
        WorkflowAction::AcknowledgeAssignment { agree: true },
        WorkflowAction::InitiateCustomerCall,
        WorkflowAction::MarkOutForDelivery,
    ] {
        assert!(matches!(
            blocked.apply(&action, start(), &rules),
            Err(WorkflowError::StockShortage { .. })
        ));
    }
}

#[test]
fn test_short_otp_is_rejected_without_state_change() {
    let state = at_otp_gate();
    let result = state.apply(
        &WorkflowAction::SubmitOtp {
            code: "12".to_string(),
        },
        start() + Duration::hours(1),
        &WorkflowRules::default(),
    );

    assert_eq!(
        result,
        Err(WorkflowError::Validation {
            expected: 4,
            actual: 2
        })
    );
    assert!(state.log_entry(Step::VerifyOtp).is_none());
    assert_eq!(state.current_step(), Step::VerifyOtp);
}

#[test]
fn test_every_wrong_length_otp_is_rejected() {
    let state = at_otp_gate();
    let rules = WorkflowRules::default();

    for (code, actual) in [("", 0), ("123", 3), ("12345", 5), ("١٢٣٤٥", 5)] {
        let result = state.apply(
            &WorkflowAction::SubmitOtp {
                code: code.to_string(),
            },
            start() + Duration::hours(1),
            &rules,
        );
        assert_eq!(
            result,
            Err(WorkflowError::Validation { expected: 4, actual }),
            "code {code:?}"
        );
    }
    assert!(state.log_entry(Step::VerifyOtp).is_none());
    assert_eq!(state.status(), WorkflowStatus::Pending(Step::VerifyOtp));
}

#[test]
fn test_clock_running_backwards_earns_no_bonus() {
    let state = at_otp_gate();
    let delivered = step(
        &state,
        WorkflowAction::SubmitOtp {
            code: "1234".to_string(),
        },
        start() - Duration::hours(5),
    );

    let bonus = delivered.state.bonus().unwrap();
    assert_eq!(bonus.elapsed_seconds, -5 * 3600);
    assert!(!bonus.eligible);
    assert!(!delivered
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowBonusBanner { .. })));
}

#[test]
fn test_otp_length_counts_characters_not_bytes() {
    let state = at_otp_gate();
    let result = state.apply(
        &WorkflowAction::SubmitOtp {
            code: "١٢٣٤".to_string(),
        },
        start(),
        &WorkflowRules::default(),
    );

    assert!(result.is_ok());
}

#[test]
fn test_actions_out_of_order_are_rejected() {
    let rules = WorkflowRules::default();
    let state = WorkflowState::new(sample_order());

    let result = state.apply(&WorkflowAction::MarkOutForDelivery, start(), &rules);
    assert_eq!(
        result,
        Err(WorkflowError::PreconditionNotMet {
            action: "mark_out_for_delivery",
            required: Step::OutForDelivery,
            status: WorkflowStatus::Pending(Step::Acknowledge),
        })
    );

    let submit = WorkflowAction::SubmitOtp {
        code: "1234".to_string(),
    };
    assert!(state.apply(&submit, start(), &rules).is_err());
}

#[test]
fn test_sla_start_set_once_when_out_for_delivery() {
    let t0 = start();
    let state = WorkflowState::new(sample_order());
    let state = step(&state, WorkflowAction::AcknowledgeAssignment { agree: true }, t0).state;
    let state = step(&state, WorkflowAction::InitiateCustomerCall, t0).state;
    assert_eq!(state.sla_started_at(), None);

    let out_at = t0 + Duration::minutes(15);
    let state = step(&state, WorkflowAction::MarkOutForDelivery, out_at).state;
    assert_eq!(state.sla_started_at(), Some(out_at));

    // Step 3 is no longer active, so the start cannot move
    let again = state.apply(
        &WorkflowAction::MarkOutForDelivery,
        out_at + Duration::hours(1),
        &WorkflowRules::default(),
    );
    assert!(again.is_err());
    assert_eq!(
        state.sla_remaining(out_at + Duration::hours(3), &WorkflowRules::default()),
        Some(Duration::hours(7))
    );
}

#[test]
fn test_assignment_proof_does_not_unlock_otp() {
    let t0 = start();
    let state = WorkflowState::new(sample_order());
    let state = step(&state, WorkflowAction::AcknowledgeAssignment { agree: true }, t0).state;
    let state = step(&state, WorkflowAction::InitiateCustomerCall, t0).state;
    let state = step(&state, WorkflowAction::MarkOutForDelivery, t0).state;

    let state = step(
        &state,
        WorkflowAction::UploadProof {
            kind: ProofKind::Assignment,
        },
        t0,
    )
    .state;
    assert_eq!(state.current_step(), Step::UploadProofs);
    assert!(!state.is_step_active(Step::VerifyOtp));

    let state = step(
        &state,
        WorkflowAction::UploadProof {
            kind: ProofKind::Payment,
        },
        t0 + Duration::minutes(5),
    )
    .state;
    assert_eq!(state.current_step(), Step::VerifyOtp);
    assert_eq!(state.proofs(), &[ProofKind::Assignment, ProofKind::Payment]);
    // First entry for step 4 stays put
    assert_eq!(
        state.log_entry(Step::UploadProofs).unwrap().action,
        "Assignment Proof Uploaded"
    );
}

#[test]
fn test_call_effect_targets_order_phone() {
    let t0 = start();
    let state = WorkflowState::new(sample_order());
    let state = step(&state, WorkflowAction::AcknowledgeAssignment { agree: true }, t0).state;
    let transition = step(&state, WorkflowAction::InitiateCustomerCall, t0);

    assert_eq!(
        transition.effects[0],
        Effect::PlaceCall {
            phone: "08012345678".to_string()
        }
    );
    assert_eq!(
        transition.state.log_entry(Step::CallCustomer).unwrap().to_string(),
        "Call Initiated @ 08:00:00"
    );
}

#[test]
fn test_otp_entry_only_while_step_five_active() {
    let rules = WorkflowRules::default();
    let early = WorkflowState::new(sample_order());
    assert!(early
        .apply(
            &WorkflowAction::EnterOtp {
                input: "12".to_string()
            },
            start(),
            &rules
        )
        .is_err());

    let state = at_otp_gate();
    let state = step(
        &state,
        WorkflowAction::EnterOtp {
            input: "123456".to_string(),
        },
        start(),
    )
    .state;
    assert_eq!(state.otp_input(), "1234");
}

#[test]
fn test_delivered_workflow_is_terminal() {
    let state = at_otp_gate();
    let delivered = step(
        &state,
        WorkflowAction::SubmitOtp {
            code: "9876".to_string(),
        },
        start() + Duration::hours(2),
    )
    .state;

    let rules = WorkflowRules::default();
    let result = delivered.apply(
        &WorkflowAction::EnterOtp {
            input: "1111".to_string(),
        },
        start(),
        &rules,
    );
    assert!(matches!(
        result,
        Err(WorkflowError::PreconditionNotMet {
            status: WorkflowStatus::Delivered,
            ..
        })
    ));

    let outcome = delivered.outcome();
    assert!(outcome.is_delivered());
    assert!(outcome.bonus_eligible());
    assert_eq!(outcome.delivered_at, Some(start() + Duration::hours(2)));
}

#[test]
fn test_step_numbering() {
    assert_eq!(Step::from_number(4), Some(Step::UploadProofs));
    assert_eq!(Step::VerifyOtp.next(), None);
    assert_eq!(Step::Acknowledge.to_string(), "Step 1: Acknowledge Assignment");
}
