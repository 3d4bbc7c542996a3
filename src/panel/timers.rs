// Delayed panel effects owned by one panel instance

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Delivered to the host when a scheduled effect comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSignal {
    BonusBannerExpired,
    AutoCloseElapsed,
}

/// A sleep-then-signal task. Aborted when cancelled or dropped, so a torn-down
/// panel never receives a late signal.
#[derive(Debug)]
pub struct ScheduledTask {
    signal: PanelSignal,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    pub fn schedule(after: Duration, signal: PanelSignal, tx: UnboundedSender<PanelSignal>) -> Self {
        debug!(signal = ?signal, after_ms = after.as_millis() as u64, "Scheduling panel signal");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the panel was torn down
            let _ = tx.send(signal);
        });
        Self { signal, handle }
    }

    pub fn signal(&self) -> PanelSignal {
        self.signal
    }

    pub fn cancel(self) {
        debug!(signal = ?self.signal, "Cancelling panel signal");
        self.handle.abort();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
