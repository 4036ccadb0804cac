//! Appointment reminder reconciliation.
//!
//! Nothing outside this module schedules or cancels reminders. The
//! scheduler feeds snapshots to the reconciler, which talks to the platform
//! through a [`store::ReminderStore`].

pub mod memory;
pub mod reconciler;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod trigger;

pub use reconciler::Reconciler;
pub use report::{PassReport, ReminderOutcome};
pub use scheduler::{ReconciliationScheduler, SchedulerHandle};
pub use store::{ReminderStore, StoreError};
