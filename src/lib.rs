//! PetCare: pet and appointment data with 24-hour appointment reminders.
//!
//! The crate owns the signed-in user's pets and appointments and keeps the
//! platform's local notification scheduler in line with them:
//!
//! - **Data layer** ([`data::DataLayer`]): command methods plus a snapshot
//!   stream that republishes both collections after every change
//! - **Reconciler** ([`reminders::reconciler::Reconciler`]): diffs desired
//!   reminders against outstanding ones and applies the minimal changes
//! - **Scheduler** ([`reminders::scheduler::ReconciliationScheduler`]):
//!   debounces snapshot bursts and runs one pass at a time
//!
//! Platform integrations sit behind the [`data::store::DocumentStore`],
//! [`data::photos::BlobStore`] and [`reminders::store::ReminderStore`]
//! traits; in-memory implementations ship for tests and the demo host.

pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod petcare_dirs;
pub mod reminders;
pub mod service;
pub mod session;

pub use config::PetCareConfig;
pub use data::DataLayer;
pub use error::{PetCareError, Result};
pub use model::{Appointment, AppointmentType, DataSnapshot, OwnerId, Pet};
pub use reminders::report::PassReport;
pub use service::ReminderService;
pub use session::SessionSignal;
