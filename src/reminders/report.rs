//! Per-pass reconciliation report.
//!
//! A [`PassReport`] is the only thing a reconciliation pass hands back to the
//! host. Adapter failures end up here instead of propagating as errors.

use crate::reminders::store::StoreError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Why an appointment's reminder could not be brought in line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Notification permission is not granted; retried on a later pass.
    PermissionDenied,
    /// Canceling an outstanding reminder failed.
    Cancel(StoreError),
    /// Scheduling a new reminder failed.
    Schedule(StoreError),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::Cancel(e) => write!(f, "cancel failed: {e}"),
            Self::Schedule(e) => write!(f, "schedule failed: {e}"),
        }
    }
}

/// What a pass did for one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// A reminder was created where none existed.
    Scheduled {
        identifier: String,
        trigger_at: DateTime<Utc>,
    },
    /// A reminder with a stale fire time was replaced.
    Rescheduled {
        identifier: String,
        trigger_at: DateTime<Utc>,
    },
    /// Every outstanding reminder for the appointment was removed.
    Canceled,
    /// The outstanding reminder already matched.
    Unchanged,
    Failed(FailureReason),
}

/// Outcome for one appointment id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentOutcome {
    pub appointment_id: String,
    pub outcome: ReminderOutcome,
}

/// Outcome counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassCounts {
    pub scheduled: usize,
    pub rescheduled: usize,
    pub canceled: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl fmt::Display for PassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scheduled={} rescheduled={} canceled={} unchanged={} failed={}",
            self.scheduled, self.rescheduled, self.canceled, self.unchanged, self.failed
        )
    }
}

/// Result of one reconciliation pass.
///
/// Appointments that neither want nor have a reminder are not listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<AppointmentOutcome>,
    /// Extra reminders removed because one appointment had several.
    pub duplicates_removed: usize,
    /// Scheduling was skipped because permission is not granted.
    pub permission_denied: bool,
    /// Set when the outstanding reminders could not be listed; nothing else
    /// was attempted.
    pub aborted: Option<StoreError>,
}

impl PassReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            outcomes: Vec::new(),
            duplicates_removed: 0,
            permission_denied: false,
            aborted: None,
        }
    }

    pub(crate) fn aborted(started_at: DateTime<Utc>, error: StoreError) -> Self {
        Self {
            aborted: Some(error),
            ..Self::new(started_at)
        }
    }

    pub(crate) fn record(&mut self, appointment_id: &str, outcome: ReminderOutcome) {
        self.outcomes.push(AppointmentOutcome {
            appointment_id: appointment_id.to_owned(),
            outcome,
        });
    }

    /// Outcome recorded for `appointment_id`, if any.
    pub fn outcome_for(&self, appointment_id: &str) -> Option<&ReminderOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.appointment_id == appointment_id)
            .map(|o| &o.outcome)
    }

    pub fn counts(&self) -> PassCounts {
        let mut counts = PassCounts::default();
        for entry in &self.outcomes {
            match entry.outcome {
                ReminderOutcome::Scheduled { .. } => counts.scheduled += 1,
                ReminderOutcome::Rescheduled { .. } => counts.rescheduled += 1,
                ReminderOutcome::Canceled => counts.canceled += 1,
                ReminderOutcome::Unchanged => counts.unchanged += 1,
                ReminderOutcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    /// `true` when the pass ran to completion without any failure.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.counts().failed == 0
    }

    /// One-line summary for logs and status displays.
    pub fn summary(&self) -> String {
        if let Some(err) = &self.aborted {
            return format!("reconciliation aborted: {err}");
        }
        let mut line = self.counts().to_string();
        if self.duplicates_removed > 0 {
            line.push_str(&format!(" duplicates_removed={}", self.duplicates_removed));
        }
        if self.permission_denied {
            line.push_str(" (notification permission denied)");
        }
        line
    }
}
