//! The data layer: sole owner of the signed-in user's pets and appointments.
//!
//! Screens and services never touch the document store directly. They issue
//! commands on [`DataLayer`] and read the full [`DataSnapshot`] it publishes
//! on a watch channel after every change. Session transitions are broadcast
//! as [`SessionSignal`]s.

pub mod photos;
pub mod store;
pub mod validate;

use crate::config::DataConfig;
use crate::error::{PetCareError, Result};
use crate::model::{
    AppointmentPatch, DataSnapshot, NewAppointment, NewPet, OwnerId, Pet, PetPatch, Species,
};
use crate::session::{SESSION_CHANNEL_CAPACITY, SessionSignal};
use photos::{BlobStore, PhotoUrlCache, photo_path};
use std::sync::{Arc, Mutex};
use store::DocumentStore;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Document id of the starter pet ensured at session start.
pub const STARTER_PET_ID: &str = "charlie";

fn starter_pet() -> NewPet {
    NewPet {
        name: "Charlie".to_owned(),
        species: Species::Dog,
        breed: "Beagle".to_owned(),
        birth_date: "2021-11-08".to_owned(),
        neutered: false,
        notes: String::new(),
    }
}

/// Single state owner for the signed-in user's data.
pub struct DataLayer {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    config: DataConfig,
    owner: Mutex<Option<OwnerId>>,
    photo_urls: Mutex<PhotoUrlCache>,
    snapshot_tx: watch::Sender<Option<DataSnapshot>>,
    session_tx: broadcast::Sender<SessionSignal>,
}

impl DataLayer {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        config: DataConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        let (session_tx, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            documents,
            blobs,
            config,
            owner: Mutex::new(None),
            photo_urls: Mutex::new(PhotoUrlCache::new()),
            snapshot_tx,
            session_tx,
        }
    }

    /// Snapshot stream. `None` while no session is active.
    pub fn subscribe(&self) -> watch::Receiver<Option<DataSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub fn subscribe_sessions(&self) -> broadcast::Receiver<SessionSignal> {
        self.session_tx.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Option<DataSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Owner of the active session.
    pub fn owner(&self) -> Option<OwnerId> {
        self.owner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn require_owner(&self) -> Result<OwnerId> {
        self.owner().ok_or(PetCareError::NotAuthenticated)
    }

    fn photo_cache(&self) -> std::sync::MutexGuard<'_, PhotoUrlCache> {
        self.photo_urls.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- session ---

    /// Sign `owner` in and publish their initial snapshot.
    ///
    /// Switching directly from another account ends that session first.
    pub async fn start_session(&self, owner: OwnerId) -> Result<()> {
        let previous = self
            .owner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(owner.clone());
        match previous {
            Some(prev) if prev == owner => {
                debug!(%owner, "session already active");
                return self.refresh().await;
            }
            Some(prev) => {
                info!(previous = %prev, "switching account, ending previous session");
                self.photo_cache().clear();
                self.snapshot_tx.send_replace(None);
                let _ = self.session_tx.send(SessionSignal::Ended);
            }
            None => {}
        }

        info!(%owner, "session started");
        if self.config.seed_starter_pet {
            if let Err(e) = self.ensure_starter_pet(&owner).await {
                warn!(%owner, error = %e, "could not seed starter pet");
            }
        }
        let _ = self.session_tx.send(SessionSignal::Started {
            owner: owner.clone(),
        });
        self.refresh().await
    }

    /// Sign out: drop all state and tell subscribers the session is over.
    pub fn end_session(&self) {
        let previous = self.owner.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(owner) = previous else {
            debug!("end_session without an active session");
            return;
        };
        self.photo_cache().clear();
        self.snapshot_tx.send_replace(None);
        let _ = self.session_tx.send(SessionSignal::Ended);
        info!(%owner, "session ended");
    }

    async fn ensure_starter_pet(&self, owner: &OwnerId) -> Result<()> {
        if self.documents.get_pet(owner, STARTER_PET_ID).await?.is_some() {
            return Ok(());
        }
        self.documents
            .create_pet(owner, starter_pet(), Some(STARTER_PET_ID))
            .await?;
        debug!(%owner, "starter pet created");
        Ok(())
    }

    // --- snapshot ---

    /// Reload both collections and publish a fresh snapshot.
    pub async fn refresh(&self) -> Result<()> {
        let owner = self.require_owner()?;
        let mut pets = self.documents.list_pets(&owner).await?;
        let appointments = self.documents.list_appointments(&owner).await?;
        self.resolve_photo_urls(&mut pets).await;

        if self.owner().as_ref() != Some(&owner) {
            debug!(%owner, "session changed during refresh, dropping snapshot");
            return Ok(());
        }
        debug!(
            pets = pets.len(),
            appointments = appointments.len(),
            "publishing snapshot"
        );
        self.snapshot_tx
            .send_replace(Some(DataSnapshot::new(appointments, pets)));
        Ok(())
    }

    async fn refresh_after_write(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "reload after write failed");
        }
    }

    async fn resolve_photo_urls(&self, pets: &mut [Pet]) {
        for pet in pets.iter_mut().filter(|p| !p.photo_path.is_empty()) {
            let claimed = {
                let mut cache = self.photo_cache();
                if let Some(url) = cache.get(&pet.photo_path) {
                    pet.photo_url = url.to_owned();
                    continue;
                }
                cache.mark_pending(&pet.photo_path)
            };
            if !claimed {
                continue;
            }
            match self.blobs.download_url(&pet.photo_path).await {
                Ok(url) => {
                    self.photo_cache().set(&pet.photo_path, url.clone());
                    pet.photo_url = url;
                }
                Err(e) => {
                    warn!(pet_id = %pet.id, error = %e, "photo url lookup failed");
                    self.photo_cache().invalidate(&pet.photo_path);
                }
            }
        }
    }

    // --- pets ---

    /// Create a pet, optionally uploading a photo from `local_photo`.
    pub async fn add_pet(&self, pet: NewPet, local_photo: Option<&str>) -> Result<String> {
        let owner = self.require_owner()?;
        let pet = validate::new_pet(pet)?;
        let pet_id = self.documents.create_pet(&owner, pet, None).await?;

        if let Some(local_uri) = local_photo {
            let path = self.upload_photo(&owner, &pet_id, local_uri).await?;
            let patch = PetPatch {
                photo_path: Some(path),
                ..PetPatch::default()
            };
            self.documents.patch_pet(&owner, &pet_id, &patch).await?;
        }

        info!(%pet_id, "pet added");
        self.refresh_after_write().await;
        Ok(pet_id)
    }

    pub async fn update_pet(
        &self,
        pet_id: &str,
        patch: PetPatch,
        local_photo: Option<&str>,
    ) -> Result<()> {
        let owner = self.require_owner()?;
        let mut patch = validate::pet_patch(patch)?;
        if let Some(local_uri) = local_photo {
            patch.photo_path = Some(self.upload_photo(&owner, pet_id, local_uri).await?);
        }
        self.documents.patch_pet(&owner, pet_id, &patch).await?;
        debug!(%pet_id, "pet updated");
        self.refresh_after_write().await;
        Ok(())
    }

    /// Delete a pet with its photo and every appointment that references it.
    pub async fn delete_pet(&self, pet_id: &str) -> Result<()> {
        let owner = self.require_owner()?;
        if let Some(pet) = self.documents.get_pet(&owner, pet_id).await? {
            if !pet.photo_path.is_empty() {
                self.blobs.delete_if_exists(&pet.photo_path).await?;
                self.photo_cache().invalidate(&pet.photo_path);
            }
        }
        let removed = self
            .documents
            .delete_appointments_for_pet(&owner, pet_id)
            .await?;
        self.documents.delete_pet(&owner, pet_id).await?;
        info!(%pet_id, appointments_removed = removed, "pet deleted");
        self.refresh_after_write().await;
        Ok(())
    }

    async fn upload_photo(&self, owner: &OwnerId, pet_id: &str, local_uri: &str) -> Result<String> {
        let path = photo_path(owner, pet_id, local_uri);
        self.blobs.upload(local_uri, &path).await?;
        self.photo_cache().invalidate(&path);
        Ok(path)
    }

    // --- appointments ---

    pub async fn add_appointment(&self, appointment: NewAppointment) -> Result<String> {
        let owner = self.require_owner()?;
        let appointment = validate::new_appointment(appointment)?;
        let appointment_id = self
            .documents
            .create_appointment(&owner, appointment)
            .await?;
        info!(%appointment_id, "appointment added");
        self.refresh_after_write().await;
        Ok(appointment_id)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: &str,
        patch: AppointmentPatch,
    ) -> Result<()> {
        let owner = self.require_owner()?;
        let patch = validate::appointment_patch(patch)?;
        self.documents
            .patch_appointment(&owner, appointment_id, &patch)
            .await?;
        debug!(%appointment_id, "appointment updated");
        self.refresh_after_write().await;
        Ok(())
    }

    pub async fn delete_appointment(&self, appointment_id: &str) -> Result<()> {
        let owner = self.require_owner()?;
        self.documents
            .delete_appointment(&owner, appointment_id)
            .await?;
        info!(%appointment_id, "appointment deleted");
        self.refresh_after_write().await;
        Ok(())
    }
}
