//! Contract for the owner-scoped document database.
//!
//! Every call is scoped to one [`OwnerId`]; collections of different owners
//! never mix.

use crate::error::{PetCareError, Result};
use crate::model::{
    Appointment, AppointmentPatch, NewAppointment, NewPet, OwnerId, Pet, PetPatch,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Pet and appointment collections of a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All pets of `owner`, newest first.
    async fn list_pets(&self, owner: &OwnerId) -> Result<Vec<Pet>>;

    async fn get_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<Option<Pet>>;

    /// Create a pet and return its id. `pet_id` forces a specific id
    /// (seed documents); otherwise the store assigns one.
    async fn create_pet(&self, owner: &OwnerId, pet: NewPet, pet_id: Option<&str>)
    -> Result<String>;

    async fn patch_pet(&self, owner: &OwnerId, pet_id: &str, patch: &PetPatch) -> Result<()>;

    /// Remove a pet. Removing a missing pet is not an error.
    async fn delete_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<()>;

    /// All appointments of `owner`, ordered by `dateTime`.
    async fn list_appointments(&self, owner: &OwnerId) -> Result<Vec<Appointment>>;

    async fn create_appointment(&self, owner: &OwnerId, appointment: NewAppointment)
    -> Result<String>;

    async fn patch_appointment(
        &self,
        owner: &OwnerId,
        appointment_id: &str,
        patch: &AppointmentPatch,
    ) -> Result<()>;

    /// Remove an appointment. Removing a missing appointment is not an error.
    async fn delete_appointment(&self, owner: &OwnerId, appointment_id: &str) -> Result<()>;

    /// Remove every appointment of one pet, returning how many went.
    async fn delete_appointments_for_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<usize>;
}

#[derive(Debug, Default)]
struct Collections {
    /// Pets with their creation sequence number.
    pets: Vec<(u64, Pet)>,
    appointments: Vec<Appointment>,
}

#[derive(Debug, Default)]
struct Inner {
    owners: HashMap<OwnerId, Collections>,
    next_seq: u64,
    unavailable: bool,
}

/// Document store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: Mutex<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`PetCareError::Store`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_owner<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut Collections, u64) -> Result<T>,
    ) -> Result<T> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(PetCareError::Store("document store unavailable".to_owned()));
        }
        inner.next_seq += 1;
        let seq = inner.next_seq;
        let collections = inner.owners.entry(owner.clone()).or_default();
        f(collections, seq)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_pets(&self, owner: &OwnerId) -> Result<Vec<Pet>> {
        self.with_owner(owner, |c, _| {
            let mut pets = c.pets.clone();
            pets.sort_by(|a, b| b.0.cmp(&a.0));
            Ok(pets.into_iter().map(|(_, pet)| pet).collect())
        })
    }

    async fn get_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<Option<Pet>> {
        self.with_owner(owner, |c, _| {
            Ok(c.pets.iter().find(|(_, p)| p.id == pet_id).map(|(_, p)| p.clone()))
        })
    }

    async fn create_pet(
        &self,
        owner: &OwnerId,
        pet: NewPet,
        pet_id: Option<&str>,
    ) -> Result<String> {
        self.with_owner(owner, |c, seq| {
            let id = pet_id.map_or_else(new_id, str::to_owned);
            if c.pets.iter().any(|(_, p)| p.id == id) {
                return Err(PetCareError::Store(format!("pet {id} already exists")));
            }
            c.pets.push((
                seq,
                Pet {
                    id: id.clone(),
                    name: pet.name,
                    species: pet.species,
                    breed: pet.breed,
                    birth_date: pet.birth_date,
                    neutered: pet.neutered,
                    notes: pet.notes,
                    photo_path: String::new(),
                    photo_url: String::new(),
                },
            ));
            Ok(id)
        })
    }

    async fn patch_pet(&self, owner: &OwnerId, pet_id: &str, patch: &PetPatch) -> Result<()> {
        self.with_owner(owner, |c, _| {
            let (_, pet) = c
                .pets
                .iter_mut()
                .find(|(_, p)| p.id == pet_id)
                .ok_or_else(|| PetCareError::NotFound(format!("pet {pet_id}")))?;
            patch.apply(pet);
            Ok(())
        })
    }

    async fn delete_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<()> {
        self.with_owner(owner, |c, _| {
            c.pets.retain(|(_, p)| p.id != pet_id);
            Ok(())
        })
    }

    async fn list_appointments(&self, owner: &OwnerId) -> Result<Vec<Appointment>> {
        self.with_owner(owner, |c, _| {
            let mut appointments = c.appointments.clone();
            appointments.sort_by(|a, b| a.date_time.cmp(&b.date_time));
            Ok(appointments)
        })
    }

    async fn create_appointment(
        &self,
        owner: &OwnerId,
        appointment: NewAppointment,
    ) -> Result<String> {
        self.with_owner(owner, |c, _| {
            let id = new_id();
            c.appointments.push(Appointment {
                id: id.clone(),
                pet_id: appointment.pet_id,
                kind: appointment.kind,
                date_time: appointment.date_time,
                reminder_enabled: appointment.reminder_enabled,
                is_completed: appointment.is_completed,
                notes: appointment.notes,
            });
            Ok(id)
        })
    }

    async fn patch_appointment(
        &self,
        owner: &OwnerId,
        appointment_id: &str,
        patch: &AppointmentPatch,
    ) -> Result<()> {
        self.with_owner(owner, |c, _| {
            let appointment = c
                .appointments
                .iter_mut()
                .find(|a| a.id == appointment_id)
                .ok_or_else(|| PetCareError::NotFound(format!("appointment {appointment_id}")))?;
            patch.apply(appointment);
            Ok(())
        })
    }

    async fn delete_appointment(&self, owner: &OwnerId, appointment_id: &str) -> Result<()> {
        self.with_owner(owner, |c, _| {
            c.appointments.retain(|a| a.id != appointment_id);
            Ok(())
        })
    }

    async fn delete_appointments_for_pet(&self, owner: &OwnerId, pet_id: &str) -> Result<usize> {
        self.with_owner(owner, |c, _| {
            let before = c.appointments.len();
            c.appointments.retain(|a| a.pet_id != pet_id);
            Ok(before - c.appointments.len())
        })
    }
}
