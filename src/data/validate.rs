//! Input checks applied before anything reaches the document store.
//!
//! Each function returns the cleaned value (trimmed text, normalized
//! timestamps) or [`PetCareError::Validation`] with a user-facing message.

use crate::error::{PetCareError, Result};
use crate::model::{AppointmentPatch, NewAppointment, NewPet, PetPatch, parse_date_time};
use chrono::{NaiveDate, SecondsFormat};

/// Shortest accepted pet name, after trimming.
pub const MIN_PET_NAME_CHARS: usize = 2;

fn invalid(message: &str) -> PetCareError {
    PetCareError::Validation(message.to_owned())
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.chars().count() < MIN_PET_NAME_CHARS {
        return Err(invalid("Please enter a name (min 2 characters)."));
    }
    Ok(name.to_owned())
}

fn clean_birth_date(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("Please enter a birth date (YYYY-MM-DD)."));
    }
    let shaped = raw.len() == 10
        && raw
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !shaped || NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_err() {
        return Err(invalid("Birth date must be in YYYY-MM-DD format."));
    }
    Ok(raw.to_owned())
}

/// Parse and normalize to `YYYY-MM-DDTHH:MM:SS.mmmZ`.
fn clean_date_time(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("Please enter date & time (YYYY-MM-DDTHH:mm)."));
    }
    parse_date_time(raw)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| invalid("Date & time must be in YYYY-MM-DDTHH:mm format."))
}

fn clean_pet_id(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(invalid("Please select a pet."));
    }
    Ok(raw.to_owned())
}

pub fn new_pet(pet: NewPet) -> Result<NewPet> {
    Ok(NewPet {
        name: clean_name(&pet.name)?,
        birth_date: clean_birth_date(&pet.birth_date)?,
        breed: pet.breed.trim().to_owned(),
        notes: pet.notes.trim().to_owned(),
        ..pet
    })
}

/// Checks only the fields present in the patch.
pub fn pet_patch(patch: PetPatch) -> Result<PetPatch> {
    Ok(PetPatch {
        name: patch.name.as_deref().map(clean_name).transpose()?,
        birth_date: patch.birth_date.as_deref().map(clean_birth_date).transpose()?,
        breed: patch.breed.map(|b| b.trim().to_owned()),
        notes: patch.notes.map(|n| n.trim().to_owned()),
        ..patch
    })
}

pub fn new_appointment(appointment: NewAppointment) -> Result<NewAppointment> {
    Ok(NewAppointment {
        pet_id: clean_pet_id(&appointment.pet_id)?,
        date_time: clean_date_time(&appointment.date_time)?,
        notes: appointment.notes.trim().to_owned(),
        ..appointment
    })
}

pub fn appointment_patch(patch: AppointmentPatch) -> Result<AppointmentPatch> {
    Ok(AppointmentPatch {
        pet_id: patch.pet_id.as_deref().map(clean_pet_id).transpose()?,
        date_time: patch.date_time.as_deref().map(clean_date_time).transpose()?,
        notes: patch.notes.map(|n| n.trim().to_owned()),
        ..patch
    })
}
