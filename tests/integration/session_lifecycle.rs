//! Sign-in / sign-out effects on outstanding reminders.

use crate::helpers::{app, dog, settle, sign_in, vaccine};
use petcare::OwnerId;
use petcare::reminders::memory::{PlatformNotification, StoreCall};
use std::time::Duration;

fn cancel_all_count(calls: &[StoreCall]) -> usize {
    calls.iter().filter(|c| **c == StoreCall::CancelAll).count()
}

#[tokio::test(start_paused = true)]
async fn sign_out_cancels_all_reminders_once() {
    let mut app = app();
    app.reminders.insert_raw(PlatformNotification {
        identifier: "tip-1".into(),
        kind: "daily-tip".into(),
        appointment_id: None,
        title: "Tip".into(),
        body: "Fresh water daily".into(),
        trigger_at: None,
    });
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    app.data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;
    assert_eq!(app.reminders.outstanding().len(), 1);

    app.data.end_session();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(cancel_all_count(&app.reminders.calls()), 1);
    assert!(app.reminders.outstanding().is_empty());
    assert_eq!(app.reminders.notifications().len(), 1, "foreign notification kept");
    assert!(app.service.try_next_report().is_none(), "no pass after sign-out");
}

#[tokio::test(start_paused = true)]
async fn sign_out_without_appointments_still_cancels() {
    let mut app = app();
    sign_in(&app, "u1").await;
    settle(&mut app).await;

    app.data.end_session();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(cancel_all_count(&app.reminders.calls()), 1);
}

#[tokio::test(start_paused = true)]
async fn switching_accounts_drops_previous_reminders() {
    let mut app = app();
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    app.data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;

    app.data.start_session(OwnerId::new("u2")).await.unwrap();
    let report = settle(&mut app).await;

    assert!(report.outcomes.is_empty());
    assert!(app.reminders.outstanding().is_empty());
    assert_eq!(cancel_all_count(&app.reminders.calls()), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_after_sign_out_is_clean() {
    let app = app();
    sign_in(&app, "u1").await;
    app.data.end_session();
    app.service.shutdown().await.unwrap();
}
