//! In-process [`ReminderStore`] backed by a plain vector.
//!
//! Mirrors the platform scheduler closely enough to drive the reconciler in
//! the demo host and in tests: identifiers are assigned on schedule,
//! notifications from other features can coexist, and every call is logged.
//! Faults can be injected per appointment or identifier.

use crate::reminders::store::{
    REMINDER_KIND, ReminderDraft, ReminderRequest, ReminderStore, StoreError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Mutex;

/// A notification as the platform scheduler holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformNotification {
    pub identifier: String,
    /// Data payload tag; only [`REMINDER_KIND`] entries are appointment reminders.
    pub kind: String,
    pub appointment_id: Option<String>,
    pub title: String,
    pub body: String,
    pub trigger_at: Option<DateTime<Utc>>,
}

impl PlatformNotification {
    fn as_reminder(&self) -> Option<ReminderRequest> {
        if self.kind != REMINDER_KIND {
            return None;
        }
        let appointment_id = self.appointment_id.as_ref().filter(|id| !id.is_empty())?;
        Some(ReminderRequest {
            identifier: self.identifier.clone(),
            appointment_id: appointment_id.clone(),
            trigger_at: self.trigger_at,
        })
    }
}

/// One adapter call, as recorded by [`InMemoryReminderStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Schedule {
        appointment_id: String,
        trigger_at: DateTime<Utc>,
    },
    Cancel {
        identifier: String,
    },
    CancelAll,
    EnsurePermission,
}

impl StoreCall {
    /// `true` for calls that change the scheduled set.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            StoreCall::Schedule { .. } | StoreCall::Cancel { .. } | StoreCall::CancelAll
        )
    }
}

#[derive(Debug)]
struct Inner {
    notifications: Vec<PlatformNotification>,
    calls: Vec<StoreCall>,
    next_id: u64,
    permission_granted: bool,
    fail_listing: bool,
    fail_schedule_for: HashSet<String>,
    fail_cancel_for: HashSet<String>,
}

/// In-memory reminder scheduler with a call log and fault injection.
#[derive(Debug)]
pub struct InMemoryReminderStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryReminderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReminderStore {
    /// Empty scheduler with notification permission granted.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                notifications: Vec::new(),
                calls: Vec::new(),
                next_id: 1,
                permission_granted: true,
                fail_listing: false,
                fail_schedule_for: HashSet::new(),
                fail_cancel_for: HashSet::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Grant or revoke notification permission.
    pub fn set_permission(&self, granted: bool) {
        self.lock().permission_granted = granted;
    }

    /// Make `list_outstanding` fail until cleared.
    pub fn set_fail_listing(&self, fail: bool) {
        self.lock().fail_listing = fail;
    }

    /// Make scheduling fail for one appointment until faults are cleared.
    pub fn fail_schedule_for(&self, appointment_id: impl Into<String>) {
        self.lock().fail_schedule_for.insert(appointment_id.into());
    }

    /// Make canceling fail for one identifier until faults are cleared.
    pub fn fail_cancel_for(&self, identifier: impl Into<String>) {
        self.lock().fail_cancel_for.insert(identifier.into());
    }

    /// Remove all injected faults (permission is left as is).
    pub fn clear_faults(&self) {
        let mut inner = self.lock();
        inner.fail_listing = false;
        inner.fail_schedule_for.clear();
        inner.fail_cancel_for.clear();
    }

    /// Insert a notification directly, bypassing the reconciler (pre-existing
    /// platform state, other features' notifications, crash leftovers).
    pub fn insert_raw(&self, notification: PlatformNotification) {
        self.lock().notifications.push(notification);
    }

    /// Appointment reminders currently held, without logging a call.
    pub fn outstanding(&self) -> Vec<ReminderRequest> {
        self.lock()
            .notifications
            .iter()
            .filter_map(PlatformNotification::as_reminder)
            .collect()
    }

    /// Every notification currently held, reminders or not.
    pub fn notifications(&self) -> Vec<PlatformNotification> {
        self.lock().notifications.clone()
    }

    /// Recorded calls, oldest first.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Recorded calls that changed the scheduled set.
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

#[async_trait]
impl ReminderStore for InMemoryReminderStore {
    async fn list_outstanding(&self) -> Result<Vec<ReminderRequest>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::List);
        if inner.fail_listing {
            return Err(StoreError::Unavailable("listing failed".to_owned()));
        }
        Ok(inner
            .notifications
            .iter()
            .filter_map(PlatformNotification::as_reminder)
            .collect())
    }

    async fn schedule(&self, draft: ReminderDraft) -> Result<String, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Schedule {
            appointment_id: draft.appointment_id.clone(),
            trigger_at: draft.trigger_at,
        });
        if !inner.permission_granted {
            return Err(StoreError::PermissionDenied);
        }
        if inner.fail_schedule_for.contains(&draft.appointment_id) {
            return Err(StoreError::SchedulingFailed(format!(
                "rejected reminder for {}",
                draft.appointment_id
            )));
        }
        let identifier = format!("reminder-{}", inner.next_id);
        inner.next_id += 1;
        inner.notifications.push(PlatformNotification {
            identifier: identifier.clone(),
            kind: REMINDER_KIND.to_owned(),
            appointment_id: Some(draft.appointment_id),
            title: draft.title,
            body: draft.body,
            trigger_at: Some(draft.trigger_at),
        });
        Ok(identifier)
    }

    async fn cancel(&self, identifier: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Cancel {
            identifier: identifier.to_owned(),
        });
        if inner.fail_cancel_for.contains(identifier) {
            return Err(StoreError::Unavailable(format!("cannot cancel {identifier}")));
        }
        inner.notifications.retain(|n| n.identifier != identifier);
        Ok(())
    }

    async fn cancel_all(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::CancelAll);
        inner.notifications.retain(|n| n.kind != REMINDER_KIND);
        Ok(())
    }

    async fn ensure_permission(&self) -> bool {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::EnsurePermission);
        inner.permission_granted
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::ReminderConfig;
    use crate::model::AppointmentType;
    use chrono::TimeZone;

    fn draft(appointment_id: &str) -> ReminderDraft {
        ReminderDraft::new(
            appointment_id,
            "Max",
            AppointmentType::Vaccine,
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap(),
            &ReminderConfig::default(),
        )
    }

    #[tokio::test]
    async fn schedule_assigns_identifiers_and_lists_back() {
        let store = InMemoryReminderStore::new();
        let first = store.schedule(draft("a1")).await.unwrap();
        let second = store.schedule(draft("a2")).await.unwrap();
        assert_ne!(first, second);

        let listed = store.list_outstanding().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].appointment_id, "a1");
    }

    #[tokio::test]
    async fn foreign_notifications_are_invisible_and_survive_cancel_all() {
        let store = InMemoryReminderStore::new();
        store.insert_raw(PlatformNotification {
            identifier: "other".into(),
            kind: "daily-tip".into(),
            appointment_id: None,
            title: "Tip".into(),
            body: "Brush your dog".into(),
            trigger_at: None,
        });
        store.schedule(draft("a1")).await.unwrap();

        assert_eq!(store.list_outstanding().await.unwrap().len(), 1);
        store.cancel_all().await.unwrap();
        assert!(store.outstanding().is_empty());
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn cancel_unknown_identifier_is_ok() {
        let store = InMemoryReminderStore::new();
        assert!(store.cancel("missing").await.is_ok());
    }

    #[tokio::test]
    async fn denied_permission_rejects_schedule() {
        let store = InMemoryReminderStore::new();
        store.set_permission(false);
        assert!(!store.ensure_permission().await);
        assert_eq!(
            store.schedule(draft("a1")).await,
            Err(StoreError::PermissionDenied)
        );
        assert!(store.outstanding().is_empty());
    }

    #[tokio::test]
    async fn injected_faults_apply_until_cleared() {
        let store = InMemoryReminderStore::new();
        store.set_fail_listing(true);
        store.fail_schedule_for("a1");
        assert!(store.list_outstanding().await.is_err());
        assert!(matches!(
            store.schedule(draft("a1")).await,
            Err(StoreError::SchedulingFailed(_))
        ));

        store.clear_faults();
        assert!(store.list_outstanding().await.is_ok());
        assert!(store.schedule(draft("a1")).await.is_ok());
    }

    #[tokio::test]
    async fn call_log_separates_mutations() {
        let store = InMemoryReminderStore::new();
        store.list_outstanding().await.unwrap();
        let id = store.schedule(draft("a1")).await.unwrap();
        store.cancel(&id).await.unwrap();

        assert_eq!(store.calls().len(), 3);
        assert_eq!(store.mutations().len(), 2);
        store.clear_calls();
        assert!(store.calls().is_empty());
    }
}
