use serde::{Deserialize, Serialize};
use statig::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PanelEvent {
    /// OTP accepted; the panel closes itself after a short delay
    OtpAccepted,
    AutoCloseElapsed,
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Operator,
    AutoClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelPhase {
    Open,
    Closing,
    Closed,
}

/// Visibility lifecycle of one delivery panel.
#[derive(Debug, Default)]
pub struct PanelLifecycle {
    pub order_id: String,
    pub close_reason: Option<CloseReason>,
}

impl PanelLifecycle {
    pub fn new(order_id: String) -> Self {
        Self {
            order_id,
            ..Default::default()
        }
    }
}

#[state_machine(initial = "State::open()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl PanelLifecycle {
    #[state]
    fn open(&mut self, event: &PanelEvent) -> Outcome<State> {
        match event {
            PanelEvent::OtpAccepted => {
                tracing::info!(order_id = %self.order_id, "Panel will close after delivery");
                Transition(State::closing())
            }
            PanelEvent::CloseRequested => {
                self.close_reason = Some(CloseReason::Operator);
                tracing::info!(order_id = %self.order_id, "Panel closed by operator");
                Transition(State::closed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn closing(&mut self, event: &PanelEvent) -> Outcome<State> {
        match event {
            PanelEvent::AutoCloseElapsed => {
                self.close_reason = Some(CloseReason::AutoClose);
                tracing::info!(order_id = %self.order_id, "Panel auto-closed");
                Transition(State::closed())
            }
            PanelEvent::CloseRequested => {
                self.close_reason = Some(CloseReason::Operator);
                tracing::info!(order_id = %self.order_id, "Panel closed by operator before auto-close");
                Transition(State::closed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn closed(&mut self, event: &PanelEvent) -> Outcome<State> {
        tracing::debug!(order_id = %self.order_id, event = ?event, "Ignoring event on closed panel");
        Handled
    }
}

pub fn phase_of(state: &State) -> PanelPhase {
    match state {
        State::Open { .. } => PanelPhase::Open,
        State::Closing { .. } => PanelPhase::Closing,
        State::Closed { .. } => PanelPhase::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_then_auto_close() {
        let mut sm = PanelLifecycle::new("FHG345".to_string()).state_machine();
        assert_eq!(phase_of(sm.state()), PanelPhase::Open);

        sm.handle(&PanelEvent::OtpAccepted);
        assert_eq!(phase_of(sm.state()), PanelPhase::Closing);

        sm.handle(&PanelEvent::AutoCloseElapsed);
        assert_eq!(phase_of(sm.state()), PanelPhase::Closed);
        assert_eq!(sm.close_reason, Some(CloseReason::AutoClose));
    }

    #[test]
    fn test_auto_close_ignored_while_open() {
        let mut sm = PanelLifecycle::new("FHG345".to_string()).state_machine();

        sm.handle(&PanelEvent::AutoCloseElapsed);
        assert_eq!(phase_of(sm.state()), PanelPhase::Open);

        sm.handle(&PanelEvent::CloseRequested);
        assert_eq!(phase_of(sm.state()), PanelPhase::Closed);
        assert_eq!(sm.close_reason, Some(CloseReason::Operator));

        // Closed is terminal
        sm.handle(&PanelEvent::OtpAccepted);
        assert_eq!(phase_of(sm.state()), PanelPhase::Closed);
    }
}
