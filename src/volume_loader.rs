use crate::{error::VolumeError, volume::Volume};

use std::{collections::HashMap, sync::Arc};

/// Supplies volumes keyed by patient and study.
///
/// The engine only borrows what a source returns; decoding the underlying
/// files is the source's business.
pub trait VolumeSource {
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if nothing is known for the key.
    fn load_volume(&self, patient_id: &str, study_id: &str) -> Result<Arc<Volume>, VolumeError>;
}

/// Volumes already decoded and kept in memory.
#[derive(Default)]
pub struct VolumeCache {
    volumes: HashMap<(String, String), Arc<Volume>>,
}

impl VolumeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a volume, replacing any previous one for the same key.
    pub fn insert(
        &mut self,
        patient_id: impl Into<String>,
        study_id: impl Into<String>,
        volume: Volume,
    ) -> Arc<Volume> {
        let volume = Arc::new(volume);
        self.volumes
            .insert((patient_id.into(), study_id.into()), Arc::clone(&volume));
        volume
    }

    pub fn remove(&mut self, patient_id: &str, study_id: &str) -> Option<Arc<Volume>> {
        self.volumes
            .remove(&(patient_id.to_owned(), study_id.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

impl VolumeSource for VolumeCache {
    fn load_volume(&self, patient_id: &str, study_id: &str) -> Result<Arc<Volume>, VolumeError> {
        self.volumes
            .get(&(patient_id.to_owned(), study_id.to_owned()))
            .cloned()
            .ok_or_else(|| VolumeError::NotFound(format!("patient {patient_id}, study {study_id}")))
    }
}
