//! Brings the platform's scheduled reminders in line with one data snapshot.
//!
//! A pass is idempotent: running it twice on an unchanged snapshot performs no
//! adapter mutations the second time. For every appointment that wants a
//! reminder whose fire time is still ahead, exactly one reminder exists after a
//! successful pass, firing 24 hours before the appointment. Every other
//! reminder tagged as an appointment reminder is canceled.

use crate::config::ReminderConfig;
use crate::model::{Appointment, DataSnapshot};
use crate::reminders::report::{FailureReason, PassReport, ReminderOutcome};
use crate::reminders::store::{ReminderDraft, ReminderRequest, ReminderStore, StoreError};
use crate::reminders::trigger::compute_trigger_instant;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An appointment that needs a (re)schedule in this pass.
struct PendingSchedule<'a> {
    appointment: &'a Appointment,
    trigger_at: DateTime<Utc>,
    /// Outstanding reminder with a stale trigger, replaced cancel-first.
    stale: Option<ReminderRequest>,
}

/// Reminder reconciler. The sole writer of the [`ReminderStore`].
pub struct Reconciler {
    store: Arc<dyn ReminderStore>,
    config: ReminderConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ReminderStore>, config: ReminderConfig) -> Self {
        Self { store, config }
    }

    /// Run one pass against the current wall clock.
    pub async fn reconcile(&self, snapshot: &DataSnapshot) -> PassReport {
        self.reconcile_at(snapshot, Utc::now()).await
    }

    /// Run one pass as if the current time were `now`.
    pub async fn reconcile_at(&self, snapshot: &DataSnapshot, now: DateTime<Utc>) -> PassReport {
        let desired = desired_triggers(&snapshot.appointments, now);
        let desired_by_id: HashMap<&str, Option<DateTime<Utc>>> = desired
            .iter()
            .map(|(apt, trigger)| (apt.id.as_str(), *trigger))
            .collect();

        let outstanding = match self.store.list_outstanding().await {
            Ok(list) => list,
            Err(e) => {
                warn!("cannot list outstanding reminders, skipping pass: {e}");
                return PassReport::aborted(now, e);
            }
        };

        let mut report = PassReport::new(now);
        let mut by_appointment: BTreeMap<String, Vec<ReminderRequest>> = BTreeMap::new();
        for request in outstanding {
            by_appointment
                .entry(request.appointment_id.clone())
                .or_default()
                .push(request);
        }

        // Deleted, disabled, completed, already-missed and invalid appointments.
        let unwanted: Vec<String> = by_appointment
            .keys()
            .filter(|id| desired_by_id.get(id.as_str()).copied().flatten().is_none())
            .cloned()
            .collect();
        for appointment_id in unwanted {
            let requests = by_appointment.remove(&appointment_id).unwrap_or_default();
            let outcome = match self.cancel_each(&requests).await {
                Ok(()) => ReminderOutcome::Canceled,
                Err(e) => ReminderOutcome::Failed(FailureReason::Cancel(e)),
            };
            debug!(appointment_id = %appointment_id, "reminder no longer wanted: {outcome:?}");
            report.record(&appointment_id, outcome);
        }

        let mut settled: HashSet<String> = HashSet::new();
        let mut canonical: HashMap<String, ReminderRequest> = HashMap::new();
        for (appointment_id, mut requests) in by_appointment {
            if requests.len() > 1 {
                let wanted = desired_by_id.get(appointment_id.as_str()).copied().flatten();
                let keep = canonical_index(&requests, wanted, self.config.tolerance());
                let survivor = requests.swap_remove(keep);
                warn!(
                    appointment_id = %appointment_id,
                    extra = requests.len(),
                    "duplicate reminders for one appointment"
                );
                if let Err(e) = self.cancel_each(&requests).await {
                    report.record(
                        &appointment_id,
                        ReminderOutcome::Failed(FailureReason::Cancel(e)),
                    );
                    settled.insert(appointment_id);
                    continue;
                }
                report.duplicates_removed += requests.len();
                canonical.insert(appointment_id, survivor);
            } else if let Some(only) = requests.pop() {
                canonical.insert(appointment_id, only);
            }
        }

        let mut pending = Vec::new();
        for &(appointment, wanted) in &desired {
            let Some(trigger_at) = wanted else { continue };
            if settled.contains(&appointment.id) {
                continue;
            }
            match canonical.remove(&appointment.id) {
                Some(existing) if self.matches(&existing, trigger_at) => {
                    report.record(&appointment.id, ReminderOutcome::Unchanged);
                }
                stale => pending.push(PendingSchedule {
                    appointment,
                    trigger_at,
                    stale,
                }),
            }
        }

        if !pending.is_empty() {
            self.apply_schedules(pending, snapshot, &mut report).await;
        }

        info!("reminder pass: {}", report.summary());
        report
    }

    /// Cancel every outstanding appointment reminder, regardless of data.
    ///
    /// Used when the session ends: the outstanding reminders may belong to a
    /// different account than any snapshot still in memory.
    pub async fn cancel_all(&self) -> Result<(), StoreError> {
        match self.store.cancel_all().await {
            Ok(()) => {
                info!("canceled all appointment reminders");
                Ok(())
            }
            Err(e) => {
                warn!("cannot cancel all appointment reminders: {e}");
                Err(e)
            }
        }
    }

    async fn apply_schedules(
        &self,
        pending: Vec<PendingSchedule<'_>>,
        snapshot: &DataSnapshot,
        report: &mut PassReport,
    ) {
        let granted = self.store.ensure_permission().await;
        if !granted {
            warn!(
                waiting = pending.len(),
                "notification permission not granted, reminders not scheduled"
            );
            report.permission_denied = true;
        }

        let pet_names: HashMap<&str, &str> = snapshot
            .pets
            .iter()
            .map(|p| (p.id.as_str(), p.name.as_str()))
            .collect();

        for item in pending {
            let appointment_id = item.appointment.id.as_str();
            let rescheduling = item.stale.is_some();

            // Cancel first so at most one reminder is ever outstanding.
            if let Some(stale) = &item.stale {
                if let Err(e) = self.store.cancel(&stale.identifier).await {
                    warn!(appointment_id, "cannot cancel stale reminder: {e}");
                    report.record(
                        appointment_id,
                        ReminderOutcome::Failed(FailureReason::Cancel(e)),
                    );
                    continue;
                }
            }

            if !granted {
                report.record(
                    appointment_id,
                    ReminderOutcome::Failed(FailureReason::PermissionDenied),
                );
                continue;
            }

            let pet_name = pet_names
                .get(item.appointment.pet_id.as_str())
                .copied()
                .unwrap_or_default();
            let draft = ReminderDraft::new(
                appointment_id,
                pet_name,
                item.appointment.kind,
                item.trigger_at,
                &self.config,
            );

            let outcome = match self.store.schedule(draft).await {
                Ok(identifier) if rescheduling => ReminderOutcome::Rescheduled {
                    identifier,
                    trigger_at: item.trigger_at,
                },
                Ok(identifier) => ReminderOutcome::Scheduled {
                    identifier,
                    trigger_at: item.trigger_at,
                },
                Err(StoreError::PermissionDenied) => {
                    report.permission_denied = true;
                    ReminderOutcome::Failed(FailureReason::PermissionDenied)
                }
                Err(e) => {
                    warn!(appointment_id, "cannot schedule reminder: {e}");
                    ReminderOutcome::Failed(FailureReason::Schedule(e))
                }
            };
            debug!(appointment_id, "reminder: {outcome:?}");
            report.record(appointment_id, outcome);
        }
    }

    /// Cancel every request, attempting all of them; returns the first failure.
    async fn cancel_each(&self, requests: &[ReminderRequest]) -> Result<(), StoreError> {
        let mut first_error = None;
        for request in requests {
            if let Err(e) = self.store.cancel(&request.identifier).await {
                warn!(
                    identifier = %request.identifier,
                    appointment_id = %request.appointment_id,
                    "cannot cancel reminder: {e}"
                );
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn matches(&self, existing: &ReminderRequest, trigger_at: DateTime<Utc>) -> bool {
        within(existing.trigger_at, trigger_at, self.config.tolerance())
    }
}

/// Desired trigger per appointment, first occurrence of each id only.
fn desired_triggers(
    appointments: &[Appointment],
    now: DateTime<Utc>,
) -> Vec<(&Appointment, Option<DateTime<Utc>>)> {
    let mut seen = HashSet::new();
    appointments
        .iter()
        .filter(|apt| seen.insert(apt.id.as_str()))
        .map(|apt| {
            let trigger = if apt.wants_reminder() {
                compute_trigger_instant(&apt.date_time, now)
            } else {
                None
            };
            (apt, trigger)
        })
        .collect()
}

/// Which of several reminders for one appointment survives: the first one
/// that already matches the wanted trigger, otherwise the first listed.
fn canonical_index(
    requests: &[ReminderRequest],
    wanted: Option<DateTime<Utc>>,
    tolerance: Duration,
) -> usize {
    wanted
        .and_then(|w| {
            requests
                .iter()
                .position(|r| within(r.trigger_at, w, tolerance))
        })
        .unwrap_or(0)
}

fn within(actual: Option<DateTime<Utc>>, wanted: DateTime<Utc>, tolerance: Duration) -> bool {
    actual.is_some_and(|at| (at - wanted).abs() <= tolerance)
}
