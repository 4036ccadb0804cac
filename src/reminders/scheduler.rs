//! Debounced reconciliation loop.
//!
//! Spawns a tokio task that watches the data layer's snapshot stream and the
//! session signals. Bursts of snapshot changes are coalesced into one pass
//! that runs once the debounce window has elapsed without another change.
//! Passes never overlap: a change that arrives mid-pass only marks the gate
//! dirty, and the timer is re-armed after the pass finishes.

use crate::config::ReminderConfig;
use crate::error::{PetCareError, Result};
use crate::model::DataSnapshot;
use crate::reminders::reconciler::Reconciler;
use crate::reminders::report::PassReport;
use crate::reminders::store::StoreError;
use crate::session::SessionSignal;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Control messages for a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Treat as a data change: re-arm the debounce timer with the latest snapshot.
    Nudge,
    /// Stop after any in-flight pass completes.
    Shutdown,
}

/// Handle to a running [`ReconciliationScheduler`].
pub struct SchedulerHandle {
    command_tx: mpsc::UnboundedSender<SchedulerCommand>,
    join: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request a pass even though no data changed (retries soft failures).
    pub fn nudge(&self) -> Result<()> {
        self.command_tx
            .send(SchedulerCommand::Nudge)
            .map_err(|_| PetCareError::Channel("reminder scheduler stopped".to_owned()))
    }

    /// Stop the scheduler and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.command_tx.send(SchedulerCommand::Shutdown);
        self.join
            .await
            .map_err(|e| PetCareError::Channel(format!("reminder scheduler task failed: {e}")))
    }

    /// `true` once the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Single-slot pass bookkeeping.
#[derive(Debug, Default)]
struct PassGate {
    /// A pass is running.
    in_flight: bool,
    /// Data changed while a pass was running.
    dirty: bool,
    /// When the armed debounce timer fires.
    deadline: Option<Instant>,
    /// Session ended mid-pass; cancel everything once the pass is done.
    cancel_all_pending: bool,
}

impl PassGate {
    fn on_change(&mut self, debounce: Duration) {
        if self.in_flight {
            self.dirty = true;
        } else {
            self.deadline = Some(Instant::now() + debounce);
        }
    }

    fn disarm(&mut self) {
        self.deadline = None;
        self.dirty = false;
    }

    fn on_pass_finished(&mut self, debounce: Duration) {
        self.in_flight = false;
        if std::mem::take(&mut self.dirty) {
            self.deadline = Some(Instant::now() + debounce);
        }
    }
}

/// Runs the [`Reconciler`] at most once per burst of data changes.
pub struct ReconciliationScheduler {
    reconciler: Arc<Reconciler>,
    debounce: Duration,
    resync_interval: Option<Duration>,
    report_tx: Option<mpsc::UnboundedSender<PassReport>>,
}

impl ReconciliationScheduler {
    pub fn new(reconciler: Reconciler, config: &ReminderConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            debounce: config.debounce(),
            resync_interval: config.resync_interval(),
            report_tx: None,
        }
    }

    /// Forward every finished pass report to `report_tx`.
    pub fn with_report_channel(mut self, report_tx: mpsc::UnboundedSender<PassReport>) -> Self {
        self.report_tx = Some(report_tx);
        self
    }

    /// Start the scheduler background loop.
    ///
    /// A snapshot already present in `snapshots` arms the timer immediately.
    pub fn run(
        self,
        mut snapshots: watch::Receiver<Option<DataSnapshot>>,
        mut sessions: broadcast::Receiver<SessionSignal>,
    ) -> SchedulerHandle {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();

        let join = tokio::spawn(async move {
            info!(
                debounce_ms = self.debounce.as_millis() as u64,
                "reminder scheduler started"
            );
            let (done_tx, mut done_rx) = mpsc::unbounded_channel::<PassReport>();
            let mut gate = PassGate::default();
            let mut snapshots_open = true;
            let mut sessions_open = true;
            let mut resync = self.resync_interval.map(|period| {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                interval
            });

            if snapshots.borrow_and_update().is_some() {
                gate.on_change(self.debounce);
            }

            loop {
                let deadline = gate.deadline;
                tokio::select! {
                    biased;

                    command = command_rx.recv() => match command {
                        Some(SchedulerCommand::Nudge) => {
                            debug!("reconciliation nudged");
                            gate.on_change(self.debounce);
                        }
                        Some(SchedulerCommand::Shutdown) | None => break,
                    },

                    signal = sessions.recv(), if sessions_open => match signal {
                        Ok(SessionSignal::Ended) => self.on_session_ended(&mut gate).await,
                        Ok(SessionSignal::Started { owner }) => {
                            info!(%owner, "session started");
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "missed session signals, resetting reminders");
                            self.on_session_ended(&mut gate).await;
                            if snapshots.borrow().is_some() {
                                gate.on_change(self.debounce);
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => sessions_open = false,
                    },

                    changed = snapshots.changed(), if snapshots_open => match changed {
                        Ok(()) => {
                            if snapshots.borrow_and_update().is_some() {
                                gate.on_change(self.debounce);
                            } else {
                                gate.disarm();
                            }
                        }
                        Err(_) => {
                            debug!("snapshot stream closed");
                            snapshots_open = false;
                        }
                    },

                    Some(report) = done_rx.recv() => {
                        self.finish_pass(report, &mut gate).await;
                    }

                    () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                        if deadline.is_some() && !gate.in_flight =>
                    {
                        gate.deadline = None;
                        let latest = snapshots.borrow().clone();
                        match latest {
                            Some(snapshot) => {
                                gate.in_flight = true;
                                self.spawn_pass(snapshot, done_tx.clone());
                            }
                            None => debug!("no active snapshot, skipping pass"),
                        }
                    }

                    () = next_tick(&mut resync), if resync.is_some() => {
                        gate.on_change(self.debounce);
                    }
                }
            }

            if gate.in_flight {
                if let Some(report) = done_rx.recv().await {
                    self.finish_pass(report, &mut gate).await;
                }
            }
            info!("reminder scheduler stopped");
        });

        SchedulerHandle { command_tx, join }
    }

    fn spawn_pass(&self, snapshot: DataSnapshot, done_tx: mpsc::UnboundedSender<PassReport>) {
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            let started_at = Utc::now();
            let pass = tokio::spawn(async move { reconciler.reconcile(&snapshot).await });
            let report = match pass.await {
                Ok(report) => report,
                Err(e) => {
                    error!("reconciliation pass failed: {e}");
                    PassReport::aborted(
                        started_at,
                        StoreError::Unavailable(format!("reconciliation pass panicked: {e}")),
                    )
                }
            };
            let _ = done_tx.send(report);
        });
    }

    async fn finish_pass(&self, report: PassReport, gate: &mut PassGate) {
        gate.on_pass_finished(self.debounce);
        if std::mem::take(&mut gate.cancel_all_pending) {
            let _ = self.reconciler.cancel_all().await;
        }
        if let Some(tx) = &self.report_tx {
            if tx.send(report).is_err() {
                debug!("report channel closed");
            }
        }
    }

    async fn on_session_ended(&self, gate: &mut PassGate) {
        gate.disarm();
        if gate.in_flight {
            gate.cancel_all_pending = true;
        } else {
            let _ = self.reconciler.cancel_all().await;
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
