// Delivery Action Panel - runtime for one order's workflow
//
// Owns the workflow state, executes transition effects against collaborators,
// and schedules the delayed banner/auto-close effects. Everything runs on the
// host's event loop; timer firings come back as `PanelSignal`s.

pub mod lifecycle;
pub mod timers;

use anyhow::Result;
use statig::prelude::*;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn, Instrument};

use crate::clock::Clock;
use crate::external::{Collaborators, Notification};
use crate::orders::{Order, OrderError};
use crate::telemetry::{create_panel_span, generate_correlation_id};
use crate::workflow::{
    DeliveryOutcome, Effect, ProofKind, Step, WorkflowAction, WorkflowError, WorkflowRules,
    WorkflowState, WorkflowStatus,
};

pub use lifecycle::{phase_of, CloseReason, PanelEvent, PanelLifecycle, PanelPhase};
pub use timers::{PanelSignal, ScheduledTask};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("panel for order {order_id} is closed")]
    Closed { order_id: String },
    #[error("order rejected: {0}")]
    InvalidOrder(#[from] OrderError),
}

pub struct ActionPanel {
    state: WorkflowState,
    rules: WorkflowRules,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    lifecycle: StateMachine<PanelLifecycle>,
    correlation_id: String,
    span: tracing::Span,
    signals_tx: mpsc::UnboundedSender<PanelSignal>,
    signals_rx: mpsc::UnboundedReceiver<PanelSignal>,
    bonus_banner: Option<ScheduledTask>,
    auto_close: Option<ScheduledTask>,
    banner_visible: bool,
}

impl std::fmt::Debug for ActionPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPanel")
            .field("order_id", &self.state.order().id)
            .field("status", &self.state.status())
            .field("phase", &self.phase())
            .field("correlation_id", &self.correlation_id)
            .field("bonus_banner", &self.banner_visible)
            .field("auto_close", &self.auto_close.is_some())
            .finish()
    }
}

impl ActionPanel {
    /// Open a panel for `order`. A fresh workflow run starts at step 1.
    pub fn open(
        order: Order,
        rules: WorkflowRules,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PanelError> {
        order.validate()?;

        let correlation_id = generate_correlation_id();
        let span = create_panel_span(&order.id, &correlation_id);
        let lifecycle = PanelLifecycle::new(order.id.clone()).state_machine();
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        span.in_scope(|| {
            info!(
                order_id = %order.id,
                customer = %order.customer,
                expected = %order.assigned_items_summary(),
                "Delivery panel opened"
            );
        });

        Ok(Self {
            state: WorkflowState::new(order),
            rules,
            collaborators,
            clock,
            lifecycle,
            correlation_id,
            span,
            signals_tx,
            signals_rx,
            bonus_banner: None,
            auto_close: None,
            banner_visible: false,
        })
    }

    pub async fn acknowledge_assignment(&mut self, agree: bool) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::AcknowledgeAssignment { agree }).await
    }

    pub async fn call_customer(&mut self) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::InitiateCustomerCall).await
    }

    pub async fn mark_out_for_delivery(&mut self) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::MarkOutForDelivery).await
    }

    pub async fn upload_proof(&mut self, kind: ProofKind) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::UploadProof { kind }).await
    }

    pub async fn enter_otp(&mut self, input: &str) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::EnterOtp {
            input: input.to_string(),
        })
        .await
    }

    /// Submit whatever is currently in the OTP field.
    pub async fn submit_otp(&mut self) -> Result<WorkflowStatus, PanelError> {
        let code = self.state.otp_input().to_string();
        self.submit_otp_code(&code).await
    }

    pub async fn submit_otp_code(&mut self, code: &str) -> Result<WorkflowStatus, PanelError> {
        self.dispatch(WorkflowAction::SubmitOtp {
            code: code.to_string(),
        })
        .await
    }

    /// Apply one action and carry out its effects.
    pub async fn dispatch(&mut self, action: WorkflowAction) -> Result<WorkflowStatus, PanelError> {
        let span = self.span.clone();
        async {
            if self.phase() == PanelPhase::Closed {
                warn!(action = action.name(), "Action on closed panel");
                return Err(PanelError::Closed {
                    order_id: self.state.order().id.clone(),
                });
            }

            let now = self.clock.now();
            match self.state.apply(&action, now, &self.rules) {
                Ok(transition) => {
                    self.state = transition.state;
                    for effect in transition.effects {
                        self.execute(effect).await;
                    }
                    Ok(self.state.status())
                }
                Err(err) => {
                    warn!(action = action.name(), error = %err, "Workflow action rejected");
                    if let WorkflowError::Validation { expected, .. } = err {
                        self.notify(Notification::InvalidOtp {
                            order_id: self.state.order().id.clone(),
                            expected_length: expected,
                        })
                        .await;
                    }
                    Err(err.into())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&mut self, effect: Effect) {
        let order_id = self.state.order().id.clone();
        debug!(effect = ?effect, "Executing workflow effect");

        match effect {
            Effect::StepLogged { step, record } => {
                let result = self.collaborators.deliveries.record_step(&order_id, step, &record).await;
                report("delivery_ledger", result);
                if !self.state.is_blocked() {
                    self.notify(Notification::StepCompleted {
                        order_id,
                        message: record.to_string(),
                    })
                    .await;
                }
            }
            Effect::StockShortage { .. } => {
                let result = self.collaborators.inventory.flag_stock_shortage(self.state.order()).await;
                report("inventory_alerts", result);
                self.notify(Notification::StockShortageFlagged { order_id }).await;
            }
            Effect::PlaceCall { phone } => {
                let result = self.collaborators.telephony.place_call(&phone).await;
                report("telephony", result);
            }
            Effect::ProofUploaded { order_id, kind } => {
                let result = self.collaborators.proofs.record_upload(&order_id, kind).await;
                report("proof_uploads", result);
            }
            Effect::Delivered { order_id, at } => {
                let result = self.collaborators.deliveries.mark_delivered(&order_id, at).await;
                report("delivery_ledger", result);
                self.lifecycle.handle(&PanelEvent::OtpAccepted);
            }
            Effect::BonusAssessed(assessment) => {
                let result = self.collaborators.bonuses.record_assessment(&order_id, &assessment).await;
                report("bonus_ledger", result);
            }
            Effect::ShowBonusBanner {
                amount_naira,
                display_for,
            } => {
                self.notify(Notification::BonusEarned {
                    order_id,
                    amount_naira,
                })
                .await;
                self.banner_visible = true;
                self.bonus_banner = Some(ScheduledTask::schedule(
                    display_for,
                    PanelSignal::BonusBannerExpired,
                    self.signals_tx.clone(),
                ));
            }
            Effect::ScheduleAutoClose { after } => {
                self.auto_close = Some(ScheduledTask::schedule(
                    after,
                    PanelSignal::AutoCloseElapsed,
                    self.signals_tx.clone(),
                ));
            }
        }
    }

    /// Wait for the next scheduled effect to come due. None when nothing is pending.
    ///
    /// The timer that fired is no longer pending once returned, whether or not
    /// the signal is passed on to `handle_signal`.
    pub async fn next_signal(&mut self) -> Option<PanelSignal> {
        while self.has_pending_timers() {
            let signal = self.signals_rx.recv().await?;
            let slot = match signal {
                PanelSignal::BonusBannerExpired => &mut self.bonus_banner,
                PanelSignal::AutoCloseElapsed => &mut self.auto_close,
            };
            // A cancelled task may still have sent before it was aborted
            if slot.take().is_some() {
                return Some(signal);
            }
        }
        None
    }

    pub async fn handle_signal(&mut self, signal: PanelSignal) {
        let order_id = self.state.order().id.clone();
        match signal {
            PanelSignal::BonusBannerExpired => {
                self.bonus_banner = None;
                if std::mem::take(&mut self.banner_visible) {
                    self.notify(Notification::BonusBannerHidden { order_id }).await;
                }
            }
            PanelSignal::AutoCloseElapsed => {
                self.auto_close = None;
                let before = self.phase();
                self.lifecycle.handle(&PanelEvent::AutoCloseElapsed);
                if before != PanelPhase::Closed && self.phase() == PanelPhase::Closed {
                    self.notify(Notification::PanelClosed { order_id }).await;
                }
            }
        }
    }

    /// Drain scheduled effects until none are pending.
    pub async fn settle(&mut self) {
        while let Some(signal) = self.next_signal().await {
            self.handle_signal(signal).await;
        }
    }

    /// Operator closes the panel. The pending auto-close is cancelled; a bonus
    /// banner already showing runs out its display time.
    pub async fn close(&mut self) {
        if let Some(task) = self.auto_close.take() {
            task.cancel();
        }
        let before = self.phase();
        self.lifecycle.handle(&PanelEvent::CloseRequested);
        if before != PanelPhase::Closed {
            let order_id = self.state.order().id.clone();
            self.notify(Notification::PanelClosed { order_id }).await;
        }
    }

    async fn notify(&self, notification: Notification) {
        let result = self.collaborators.notifier.notify(notification).await;
        report("notifier", result);
    }

    fn has_pending_timers(&self) -> bool {
        self.bonus_banner.is_some() || self.auto_close.is_some()
    }

    pub fn phase(&self) -> PanelPhase {
        phase_of(self.lifecycle.state())
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.lifecycle.close_reason
    }

    pub fn is_bonus_banner_visible(&self) -> bool {
        self.banner_visible
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn status(&self) -> WorkflowStatus {
        self.state.status()
    }

    pub fn is_step_active(&self, step: Step) -> bool {
        self.phase() != PanelPhase::Closed && self.state.is_step_active(step)
    }

    pub fn outcome(&self) -> DeliveryOutcome {
        self.state.outcome()
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

impl Drop for ActionPanel {
    fn drop(&mut self) {
        // ScheduledTask aborts on drop; this only records the teardown
        let _entered = self.span.enter();
        debug!(pending_timers = self.has_pending_timers(), "Delivery panel torn down");
    }
}

/// Collaborators are fire-and-forget: failures are logged, never propagated.
fn report(collaborator: &str, result: Result<()>) {
    if let Err(e) = result {
        warn!(collaborator = collaborator, error = %e, "Collaborator call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::external::collaborators::*;
    use crate::orders::sample_order;
    use chrono::{Duration, TimeZone, Utc};
    use mockall::predicate::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 27, 8, 0, 0).unwrap()))
    }

    struct Mocks {
        telephony: MockTelephony,
        proofs: MockProofUploads,
        inventory: MockInventoryAlerts,
        deliveries: MockDeliveryLedger,
        bonuses: MockBonusLedger,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn permissive() -> Self {
            let mut deliveries = MockDeliveryLedger::new();
            deliveries.expect_record_step().returning(|_, _, _| Ok(()));
            deliveries.expect_mark_delivered().returning(|_, _| Ok(()));
            let mut notifier = MockNotifier::new();
            notifier.expect_notify().returning(|_| Ok(()));
            let mut proofs = MockProofUploads::new();
            proofs.expect_record_upload().returning(|_, _| Ok(()));
            let mut telephony = MockTelephony::new();
            telephony.expect_place_call().returning(|_| Ok(()));
            let mut bonuses = MockBonusLedger::new();
            bonuses.expect_record_assessment().returning(|_, _| Ok(()));

            Self {
                telephony,
                proofs,
                inventory: MockInventoryAlerts::new(),
                deliveries,
                bonuses,
                notifier,
            }
        }

        fn into_collaborators(self) -> Collaborators {
            Collaborators {
                telephony: Arc::new(self.telephony),
                proofs: Arc::new(self.proofs),
                inventory: Arc::new(self.inventory),
                deliveries: Arc::new(self.deliveries),
                bonuses: Arc::new(self.bonuses),
                notifier: Arc::new(self.notifier),
            }
        }
    }

    #[tokio::test]
    async fn test_call_dials_order_phone() {
        let mut mocks = Mocks::permissive();
        mocks.telephony = MockTelephony::new();
        mocks
            .telephony
            .expect_place_call()
            .with(eq("08012345678"))
            .times(1)
            .returning(|_| Ok(()));

        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            mocks.into_collaborators(),
            clock(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        let status = panel.call_customer().await.unwrap();
        assert_eq!(status, WorkflowStatus::Pending(Step::OutForDelivery));
    }

    #[tokio::test]
    async fn test_decline_alerts_inventory_officer() {
        let mut mocks = Mocks::permissive();
        mocks
            .inventory
            .expect_flag_stock_shortage()
            .withf(|order: &Order| order.id == "FHG345")
            .times(1)
            .returning(|_| Ok(()));

        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            mocks.into_collaborators(),
            clock(),
        )
        .unwrap();

        let status = panel.acknowledge_assignment(false).await.unwrap();
        assert_eq!(status, WorkflowStatus::Blocked);
        assert!(!panel.is_step_active(Step::CallCustomer));
        assert!(matches!(
            panel.call_customer().await,
            Err(PanelError::Workflow(WorkflowError::StockShortage { .. }))
        ));
    }

    #[tokio::test]
    async fn test_collaborator_failure_does_not_roll_back() {
        let mut mocks = Mocks::permissive();
        mocks.telephony = MockTelephony::new();
        mocks
            .telephony
            .expect_place_call()
            .returning(|_| Err(anyhow::anyhow!("dialer unavailable")));

        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            mocks.into_collaborators(),
            clock(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        panel.call_customer().await.unwrap();
        assert!(panel.state().log_entry(Step::CallCustomer).is_some());
    }

    #[tokio::test]
    async fn test_invalid_otp_notifies_agent() {
        let mut mocks = Mocks::permissive();
        mocks.notifier = MockNotifier::new();
        mocks
            .notifier
            .expect_notify()
            .withf(|n: &Notification| matches!(n, Notification::InvalidOtp { expected_length: 4, .. }))
            .times(1)
            .returning(|_| Ok(()));
        mocks.notifier.expect_notify().returning(|_| Ok(()));

        let clock = clock();
        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            mocks.into_collaborators(),
            clock.clone(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        panel.call_customer().await.unwrap();
        panel.mark_out_for_delivery().await.unwrap();
        panel.upload_proof(ProofKind::Payment).await.unwrap();
        clock.advance(Duration::hours(1));

        panel.enter_otp("12").await.unwrap();
        let result = panel.submit_otp().await;
        assert!(matches!(
            result,
            Err(PanelError::Workflow(WorkflowError::Validation { .. }))
        ));
        assert_eq!(panel.status(), WorkflowStatus::Pending(Step::VerifyOtp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_schedules_banner_and_auto_close() {
        let mut mocks = Mocks::permissive();
        mocks.bonuses = MockBonusLedger::new();
        mocks
            .bonuses
            .expect_record_assessment()
            .withf(|id: &str, a: &crate::workflow::BonusAssessment| id == "FHG345" && a.eligible)
            .times(1)
            .returning(|_, _| Ok(()));

        let clock = clock();
        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            mocks.into_collaborators(),
            clock.clone(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        panel.call_customer().await.unwrap();
        panel.mark_out_for_delivery().await.unwrap();
        panel.upload_proof(ProofKind::Payment).await.unwrap();
        clock.advance(Duration::hours(3));
        panel.submit_otp_code("1234").await.unwrap();

        assert_eq!(panel.phase(), PanelPhase::Closing);
        assert!(panel.is_bonus_banner_visible());

        assert_eq!(panel.next_signal().await, Some(PanelSignal::AutoCloseElapsed));
        panel.handle_signal(PanelSignal::AutoCloseElapsed).await;
        assert_eq!(panel.phase(), PanelPhase::Closed);
        assert_eq!(panel.close_reason(), Some(CloseReason::AutoClose));

        // Banner outlives the dialog
        assert!(panel.is_bonus_banner_visible());
        panel.settle().await;
        assert!(!panel.is_bonus_banner_visible());
        assert_eq!(panel.next_signal().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operator_close_cancels_auto_close() {
        let clock = clock();
        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            Mocks::permissive().into_collaborators(),
            clock.clone(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        panel.call_customer().await.unwrap();
        panel.mark_out_for_delivery().await.unwrap();
        panel.upload_proof(ProofKind::Payment).await.unwrap();
        clock.advance(Duration::hours(12));
        panel.submit_otp_code("1234").await.unwrap();
        assert!(!panel.is_bonus_banner_visible());

        panel.close().await;
        assert_eq!(panel.close_reason(), Some(CloseReason::Operator));
        assert_eq!(panel.next_signal().await, None);

        assert!(matches!(
            panel.enter_otp("1111").await,
            Err(PanelError::Closed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhandled_signal_is_not_pending_anymore() {
        let clock = clock();
        let mut panel = ActionPanel::open(
            sample_order(),
            WorkflowRules::default(),
            Mocks::permissive().into_collaborators(),
            clock.clone(),
        )
        .unwrap();

        panel.acknowledge_assignment(true).await.unwrap();
        panel.call_customer().await.unwrap();
        panel.mark_out_for_delivery().await.unwrap();
        panel.upload_proof(ProofKind::Payment).await.unwrap();
        clock.advance(Duration::hours(11));
        panel.submit_otp_code("1234").await.unwrap();

        // Host drops the auto-close signal without handling it
        assert_eq!(panel.next_signal().await, Some(PanelSignal::AutoCloseElapsed));

        let next = tokio::time::timeout(std::time::Duration::from_secs(60), panel.next_signal()).await;
        assert_eq!(next, Ok(None));
        assert_eq!(panel.phase(), PanelPhase::Closing);
    }

    #[test]
    fn test_open_rejects_invalid_order() {
        let mut order = sample_order();
        order.assigned_items.clear();

        let result = ActionPanel::open(
            order,
            WorkflowRules::default(),
            Mocks::permissive().into_collaborators(),
            clock(),
        );
        assert!(matches!(result, Err(PanelError::InvalidOrder(_))));
    }
}
