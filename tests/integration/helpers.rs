//! Shared helpers for integration tests.

use petcare::config::{DataConfig, ReminderConfig};
use petcare::data::photos::InMemoryBlobStore;
use petcare::data::store::InMemoryDocumentStore;
use petcare::model::{NewAppointment, NewPet, Species};
use petcare::reminders::memory::InMemoryReminderStore;
use petcare::{AppointmentType, DataLayer, OwnerId, PassReport, ReminderService};
use std::sync::Arc;
use std::time::Duration;

/// A data layer wired to a running reminder service, all on in-memory adapters.
pub(crate) struct App {
    pub data: DataLayer,
    pub reminders: Arc<InMemoryReminderStore>,
    pub service: ReminderService,
}

/// Start an app with the starter pet seed disabled. Needs a tokio runtime.
pub(crate) fn app() -> App {
    app_with(ReminderConfig::default())
}

pub(crate) fn app_with(config: ReminderConfig) -> App {
    let reminders = Arc::new(InMemoryReminderStore::new());
    let data = DataLayer::new(
        Arc::new(InMemoryDocumentStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        DataConfig {
            seed_starter_pet: false,
        },
    );
    let service = ReminderService::start(&data, reminders.clone(), &config);
    App {
        data,
        reminders,
        service,
    }
}

/// Wait for the pass triggered by the last changes, then drain any followers.
/// Returns the latest report.
pub(crate) async fn settle(app: &mut App) -> PassReport {
    let mut last = app.service.next_report().await.expect("scheduler running");
    tokio::time::sleep(Duration::from_secs(2)).await;
    while let Some(report) = app.service.try_next_report() {
        last = report;
    }
    last
}

pub(crate) async fn sign_in(app: &App, owner: &str) {
    app.data
        .start_session(OwnerId::new(owner))
        .await
        .expect("start session");
}

pub(crate) fn dog(name: &str) -> NewPet {
    NewPet {
        name: name.to_owned(),
        species: Species::Dog,
        birth_date: "2020-06-01".to_owned(),
        ..NewPet::default()
    }
}

pub(crate) fn vaccine(pet_id: &str, date_time: &str) -> NewAppointment {
    NewAppointment {
        pet_id: pet_id.to_owned(),
        kind: AppointmentType::Vaccine,
        date_time: date_time.to_owned(),
        reminder_enabled: true,
        ..NewAppointment::default()
    }
}
