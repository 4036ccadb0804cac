//! End-to-end reminder behavior driven through the data layer.

use crate::helpers::{app, dog, settle, sign_in, vaccine};
use chrono::{TimeZone, Utc};
use petcare::model::AppointmentPatch;
use petcare::reminders::memory::StoreCall;
use petcare::reminders::report::ReminderOutcome;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn new_appointment_gets_one_reminder_a_day_ahead() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    let appointment_id = app
        .data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();

    let report = settle(&mut app).await;
    assert!(report.is_clean());
    assert!(matches!(
        report.outcome_for(&appointment_id),
        Some(ReminderOutcome::Scheduled { .. })
    ));

    let notifications = app.reminders.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].trigger_at,
        Some(Utc.with_ymd_and_hms(2030, 3, 14, 10, 0, 0).unwrap())
    );
    assert_eq!(notifications[0].title, "Upcoming appointment");
    assert_eq!(
        notifications[0].body,
        "Max has a Vaccine appointment in 24 hours."
    );
    assert_eq!(
        notifications[0].appointment_id.as_deref(),
        Some(appointment_id.as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn moving_an_appointment_swaps_its_reminder() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    let appointment_id = app
        .data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;
    let old = app.reminders.outstanding().remove(0).identifier;
    app.reminders.clear_calls();

    app.data
        .update_appointment(
            &appointment_id,
            AppointmentPatch {
                date_time: Some("2030-03-20T09:00".into()),
                ..AppointmentPatch::default()
            },
        )
        .await
        .unwrap();
    let report = settle(&mut app).await;

    assert!(matches!(
        report.outcome_for(&appointment_id),
        Some(ReminderOutcome::Rescheduled { .. })
    ));
    let mutations = app.reminders.mutations();
    assert_eq!(mutations.len(), 2);
    assert_eq!(mutations[0], StoreCall::Cancel { identifier: old });
    assert_eq!(
        mutations[1],
        StoreCall::Schedule {
            appointment_id: appointment_id.clone(),
            trigger_at: Utc.with_ymd_and_hms(2030, 3, 19, 9, 0, 0).unwrap(),
        }
    );
    assert_eq!(app.reminders.outstanding().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unchanged_data_causes_no_mutations() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    app.data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;
    app.reminders.clear_calls();

    app.data.refresh().await.unwrap();
    let report = settle(&mut app).await;
    assert_eq!(report.counts().unchanged, 1);
    assert!(app.reminders.mutations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn completing_or_deleting_pet_removes_reminders() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let max = app.data.add_pet(dog("Max"), None).await.unwrap();
    let luna = app.data.add_pet(dog("Luna"), None).await.unwrap();
    let checkup = app
        .data
        .add_appointment(vaccine(&max, "2030-03-15T10:00"))
        .await
        .unwrap();
    app.data
        .add_appointment(vaccine(&luna, "2030-04-01T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;
    assert_eq!(app.reminders.outstanding().len(), 2);

    app.data
        .update_appointment(
            &checkup,
            AppointmentPatch {
                is_completed: Some(true),
                ..AppointmentPatch::default()
            },
        )
        .await
        .unwrap();
    let report = settle(&mut app).await;
    assert_eq!(report.outcome_for(&checkup), Some(&ReminderOutcome::Canceled));
    assert_eq!(app.reminders.outstanding().len(), 1);

    app.data.delete_pet(&luna).await.unwrap();
    settle(&mut app).await;
    assert!(app.reminders.outstanding().is_empty());
}

#[tokio::test(start_paused = true)]
async fn appointment_within_a_day_gets_no_reminder() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    let soon = (Utc::now() + chrono::Duration::hours(3)).to_rfc3339();
    let appointment_id = app.data.add_appointment(vaccine(&pet_id, &soon)).await.unwrap();

    let report = settle(&mut app).await;
    assert_eq!(report.outcome_for(&appointment_id), None);
    assert!(app.reminders.outstanding().is_empty());
}

#[tokio::test(start_paused = true)]
async fn burst_of_edits_is_reconciled_once() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    settle(&mut app).await;
    app.reminders.clear_calls();

    for day in 10..13 {
        app.data
            .add_appointment(vaccine(&pet_id, &format!("2030-03-{day}T10:00")))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let report = settle(&mut app).await;

    assert_eq!(report.counts().scheduled, 3);
    let lists = app
        .reminders
        .calls()
        .into_iter()
        .filter(|c| *c == StoreCall::List)
        .count();
    assert_eq!(lists, 1);
}

#[tokio::test(start_paused = true)]
async fn denied_permission_is_retried_on_nudge() {
    let mut app = app();
    app.reminders.set_permission(false);
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    let appointment_id = app
        .data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();

    let denied = settle(&mut app).await;
    assert!(denied.permission_denied);
    assert!(app.reminders.outstanding().is_empty());

    app.reminders.set_permission(true);
    app.service.nudge().unwrap();
    let granted = settle(&mut app).await;
    assert!(matches!(
        granted.outcome_for(&appointment_id),
        Some(ReminderOutcome::Scheduled { .. })
    ));
}
