//! Config file loading through the public API.

use crate::helpers::{app_with, dog, settle, sign_in, vaccine};
use petcare::PetCareConfig;

#[test]
fn partial_file_keeps_defaults_for_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[reminders]\ntitle = \"Vet tomorrow\"\n\n[logging]\nfilter = \"petcare=debug\"\n",
    )
    .unwrap();

    let config = PetCareConfig::from_file(&path).unwrap();
    assert_eq!(config.reminders.title, "Vet tomorrow");
    assert_eq!(config.reminders.debounce_ms, 300);
    assert_eq!(config.reminders.channel_id, "appointment-reminders");
    assert!(config.data.seed_starter_pet);
    assert_eq!(config.logging.filter, "petcare=debug");
}

#[test]
fn malformed_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[reminders\n").unwrap();
    assert!(matches!(
        PetCareConfig::from_file(&path),
        Err(petcare::PetCareError::Config(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn configured_title_reaches_the_notification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = PetCareConfig::default();
    config.reminders.title = "Vet tomorrow".to_owned();
    config.save_to_file(&path).unwrap();

    let loaded = PetCareConfig::from_file(&path).unwrap();
    let mut app = app_with(loaded.reminders);
    sign_in(&app, "u1").await;
    let pet_id = app.data.add_pet(dog("Max"), None).await.unwrap();
    app.data
        .add_appointment(vaccine(&pet_id, "2030-03-15T10:00"))
        .await
        .unwrap();
    settle(&mut app).await;

    assert_eq!(app.reminders.notifications()[0].title, "Vet tomorrow");
}
