//! Background reminder service bound to a [`DataLayer`].

use crate::config::ReminderConfig;
use crate::data::DataLayer;
use crate::error::Result;
use crate::reminders::reconciler::Reconciler;
use crate::reminders::report::PassReport;
use crate::reminders::scheduler::{ReconciliationScheduler, SchedulerHandle};
use crate::reminders::store::ReminderStore;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Keeps the platform's reminders in line with the data layer's snapshots
/// for as long as it runs.
pub struct ReminderService {
    handle: SchedulerHandle,
    reports: mpsc::UnboundedReceiver<PassReport>,
}

impl ReminderService {
    /// Subscribe to `data` and start the reconciliation scheduler.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(data: &DataLayer, store: Arc<dyn ReminderStore>, config: &ReminderConfig) -> Self {
        let (report_tx, reports) = mpsc::unbounded_channel();
        let handle = ReconciliationScheduler::new(Reconciler::new(store, config.clone()), config)
            .with_report_channel(report_tx)
            .run(data.subscribe(), data.subscribe_sessions());
        Self { handle, reports }
    }

    /// Ask for a pass without a data change (e.g. app returned to foreground).
    pub fn nudge(&self) -> Result<()> {
        self.handle.nudge()
    }

    /// Wait for the next finished pass.
    pub async fn next_report(&mut self) -> Option<PassReport> {
        self.reports.recv().await
    }

    /// Next finished pass, if one is already waiting.
    pub fn try_next_report(&mut self) -> Option<PassReport> {
        self.reports.try_recv().ok()
    }

    /// Stop the scheduler once any in-flight pass completes.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
