//! Contract for the platform's local notification scheduler.
//!
//! The reconciler is the only caller of a [`ReminderStore`]; nothing else in
//! the app schedules or cancels appointment reminders.

use crate::config::ReminderConfig;
use crate::model::AppointmentType;
use crate::reminders::trigger::REMINDER_LEAD_HOURS;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Tag carried in the data payload of every appointment reminder.
///
/// Platform notifications without this tag belong to someone else and are
/// never listed or canceled through this contract.
pub const REMINDER_KIND: &str = "appointment-reminder-24h";

/// Reminder scheduler adapter failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The user has not granted notification permission.
    #[error("notification permission denied")]
    PermissionDenied,
    /// The platform rejected a schedule request.
    #[error("scheduling failed: {0}")]
    SchedulingFailed(String),
    /// Transient platform failure while listing or canceling.
    #[error("reminder scheduler unavailable: {0}")]
    Unavailable(String),
}

/// An outstanding reminder as reported by the platform scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderRequest {
    /// Handle assigned by the platform at schedule time.
    pub identifier: String,
    /// Appointment this reminder belongs to.
    pub appointment_id: String,
    /// Next fire time. `None` when the platform cannot report it, which the
    /// reconciler treats as a mismatch.
    pub trigger_at: Option<DateTime<Utc>>,
}

/// Everything needed to schedule one reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderDraft {
    pub appointment_id: String,
    pub title: String,
    pub body: String,
    pub trigger_at: DateTime<Utc>,
    /// Platform notification channel (Android); ignored elsewhere.
    pub channel_id: String,
}

impl ReminderDraft {
    /// Build the reminder for one appointment.
    ///
    /// `pet_name` may be blank (unknown or orphaned pet); the body then falls
    /// back to a generic sentence.
    pub fn new(
        appointment_id: impl Into<String>,
        pet_name: &str,
        kind: AppointmentType,
        trigger_at: DateTime<Utc>,
        config: &ReminderConfig,
    ) -> Self {
        Self {
            appointment_id: appointment_id.into(),
            title: config.title.clone(),
            body: reminder_body(pet_name, kind),
            trigger_at,
            channel_id: config.channel_id.clone(),
        }
    }
}

/// Notification body for an appointment reminder.
pub fn reminder_body(pet_name: &str, kind: AppointmentType) -> String {
    let pet_name = pet_name.trim();
    if pet_name.is_empty() {
        format!("You have an appointment in {REMINDER_LEAD_HOURS} hours.")
    } else {
        format!("{pet_name} has a {kind} appointment in {REMINDER_LEAD_HOURS} hours.")
    }
}

/// Reminder scheduler contract. Platform adapters only need to implement this trait.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// All outstanding appointment reminders (only those tagged [`REMINDER_KIND`]).
    async fn list_outstanding(&self) -> Result<Vec<ReminderRequest>, StoreError>;

    /// Schedule a reminder and return its platform identifier.
    async fn schedule(&self, draft: ReminderDraft) -> Result<String, StoreError>;

    /// Cancel one reminder. An unknown identifier is not an error.
    async fn cancel(&self, identifier: &str) -> Result<(), StoreError>;

    /// Cancel every outstanding appointment reminder.
    async fn cancel_all(&self) -> Result<(), StoreError>;

    /// Check (and if needed request) notification permission.
    ///
    /// Platform failures during the check count as "not granted".
    async fn ensure_permission(&self) -> bool;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    #[test]
    fn body_names_pet_and_type() {
        assert_eq!(
            reminder_body("Max", AppointmentType::VetVisit),
            "Max has a Vet Visit appointment in 24 hours."
        );
    }

    #[test]
    fn blank_pet_name_uses_generic_body() {
        assert_eq!(
            reminder_body("   ", AppointmentType::Vaccine),
            "You have an appointment in 24 hours."
        );
        assert_eq!(
            reminder_body("", AppointmentType::Other),
            "You have an appointment in 24 hours."
        );
    }

    #[test]
    fn draft_takes_title_and_channel_from_config() {
        let config = ReminderConfig::default();
        let trigger_at = Utc.with_ymd_and_hms(2026, 3, 14, 14, 30, 0).unwrap();
        let draft = ReminderDraft::new("a1", "Luna", AppointmentType::Grooming, trigger_at, &config);
        assert_eq!(draft.title, "Upcoming appointment");
        assert_eq!(draft.channel_id, "appointment-reminders");
        assert_eq!(draft.body, "Luna has a Grooming appointment in 24 hours.");
        assert_eq!(draft.trigger_at, trigger_at);
    }

    #[test]
    fn store_errors_render() {
        assert_eq!(
            StoreError::PermissionDenied.to_string(),
            "notification permission denied"
        );
        assert!(
            StoreError::Unavailable("busy".into())
                .to_string()
                .contains("busy")
        );
    }
}
