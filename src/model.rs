//! Pet and appointment documents as stored in the owner's collections.
//!
//! Field names follow the document store's camelCase layout so the types
//! deserialize straight from stored documents.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the signed-in account that owns the collections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of care appointment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentType {
    Vaccine,
    Medication,
    #[default]
    #[serde(rename = "Vet Visit")]
    VetVisit,
    Grooming,
    #[serde(other)]
    Other,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentType::Vaccine => "Vaccine",
            AppointmentType::Medication => "Medication",
            AppointmentType::VetVisit => "Vet Visit",
            AppointmentType::Grooming => "Grooming",
            AppointmentType::Other => "Other",
        };
        f.write_str(s)
    }
}

/// A scheduled care appointment for one pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    /// Owning pet. Not enforced referentially; orphans appear transiently.
    pub pet_id: String,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    /// Appointment time as stored text (RFC 3339, or naive local form read as UTC).
    pub date_time: String,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub notes: String,
}

impl Appointment {
    /// `true` when the owner wants a reminder and the appointment is still open.
    pub fn wants_reminder(&self) -> bool {
        self.reminder_enabled && !self.is_completed
    }
}

/// Parse a stored appointment time.
///
/// Accepts RFC 3339 with an offset, or `YYYY-MM-DDTHH:MM[:SS]` without one,
/// which is read as UTC.
pub fn parse_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Animal species offered by the pet form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    #[default]
    Dog,
    Cat,
    Bird,
    Rabbit,
    #[serde(other)]
    Other,
}

/// A pet document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub species: Species,
    #[serde(default)]
    pub breed: String,
    /// `YYYY-MM-DD`.
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub neutered: bool,
    #[serde(default)]
    pub notes: String,
    /// Blob storage path of the photo; empty when the pet has none.
    #[serde(default)]
    pub photo_path: String,
    /// Download URL resolved at runtime from `photo_path`. Never persisted.
    #[serde(skip)]
    pub photo_url: String,
}

/// Input for creating a pet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPet {
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub birth_date: String,
    pub neutered: bool,
    pub notes: String,
}

/// Partial pet update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetPatch {
    pub name: Option<String>,
    pub species: Option<Species>,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub neutered: Option<bool>,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
}

impl PetPatch {
    pub fn apply(&self, pet: &mut Pet) {
        if let Some(name) = &self.name {
            pet.name.clone_from(name);
        }
        if let Some(species) = self.species {
            pet.species = species;
        }
        if let Some(breed) = &self.breed {
            pet.breed.clone_from(breed);
        }
        if let Some(birth_date) = &self.birth_date {
            pet.birth_date.clone_from(birth_date);
        }
        if let Some(neutered) = self.neutered {
            pet.neutered = neutered;
        }
        if let Some(notes) = &self.notes {
            pet.notes.clone_from(notes);
        }
        if let Some(photo_path) = &self.photo_path {
            pet.photo_path.clone_from(photo_path);
        }
    }
}

/// Input for creating an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAppointment {
    pub pet_id: String,
    pub kind: AppointmentType,
    pub date_time: String,
    pub reminder_enabled: bool,
    pub is_completed: bool,
    pub notes: String,
}

/// Partial appointment update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    pub pet_id: Option<String>,
    pub kind: Option<AppointmentType>,
    pub date_time: Option<String>,
    pub reminder_enabled: Option<bool>,
    pub is_completed: Option<bool>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn apply(&self, appointment: &mut Appointment) {
        if let Some(pet_id) = &self.pet_id {
            appointment.pet_id.clone_from(pet_id);
        }
        if let Some(kind) = self.kind {
            appointment.kind = kind;
        }
        if let Some(date_time) = &self.date_time {
            appointment.date_time.clone_from(date_time);
        }
        if let Some(enabled) = self.reminder_enabled {
            appointment.reminder_enabled = enabled;
        }
        if let Some(completed) = self.is_completed {
            appointment.is_completed = completed;
        }
        if let Some(notes) = &self.notes {
            appointment.notes.clone_from(notes);
        }
    }
}

/// Full copy of both collections at one point in time.
///
/// Every delivery replaces the previous one; consumers never diff deltas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataSnapshot {
    pub appointments: Vec<Appointment>,
    pub pets: Vec<Pet>,
}

impl DataSnapshot {
    pub fn new(appointments: Vec<Appointment>, pets: Vec<Pet>) -> Self {
        Self { appointments, pets }
    }
}
