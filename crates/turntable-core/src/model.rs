//! Model library - uploaded models, their saved view settings, and the
//! current selection

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::component::SceneComponent;
use crate::settings::{CameraPatch, CanvasPatch};
use crate::store::{BlobStore, StoreError};

/// Padding factor used when fitting a model into the viewport
pub const FIT_PADDING: f64 = 1.1;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Invalid model data for key {0}")]
    InvalidModelData(String),
    #[error("Invalid thumbnail for key {0}")]
    InvalidThumbnail(String),
    #[error("Model not found: {0}")]
    NotFound(ModelId),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// View settings saved with a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<CanvasPatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    /// Blob key of the geometry bytes
    pub data_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_key: Option<String>,
    #[serde(default)]
    pub settings: ModelSettings,
    /// Component tree saved with this model
    #[serde(default)]
    pub components: Vec<SceneComponent>,
}

impl Model {
    /// Saved camera zoom, if any
    pub fn saved_zoom(&self) -> Option<f64> {
        self.settings.camera.as_ref().and_then(|c| c.zoom)
    }
}

/// Input for `ModelLibrary::upload`
#[derive(Debug, Clone, Default)]
pub struct NewModel {
    pub name: String,
    pub data: Vec<u8>,
    pub thumbnail: Option<Vec<u8>>,
    pub settings: ModelSettings,
}

/// Partial update for a stored model
#[derive(Debug, Clone, Default)]
pub struct ModelUpdate {
    pub name: Option<String>,
    pub settings: Option<ModelSettings>,
    pub components: Option<Vec<SceneComponent>>,
}

/// Zoom that fits an object of `size` into a `viewport` of (width, height)
/// under an orthographic camera
pub fn fit_zoom(size: [f64; 3], viewport: (f64, f64), padding: f64) -> Option<f64> {
    let (width, height) = viewport;
    let max_dim = size.iter().copied().fold(0.0_f64, f64::max);
    if max_dim <= 0.0 || width <= 0.0 || height <= 0.0 || padding <= 0.0 {
        return None;
    }
    let aspect = width / height;
    Some((width / (max_dim * aspect * padding)).min(height / (max_dim * padding)))
}

fn remove_blobs(model: &Model, store: &mut dyn BlobStore) -> Result<(), StoreError> {
    store.remove(&model.data_key)?;
    if let Some(key) = &model.thumbnail_key {
        store.remove(key)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelLibrary {
    #[serde(default)]
    models: Vec<Model>,
    #[serde(default)]
    selected: Option<ModelId>,
}

impl ModelLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a model's bytes and add it to the library.
    ///
    /// The new model becomes selected when it is first in its upload batch or
    /// nothing is selected yet.
    pub fn upload(
        &mut self,
        model: NewModel,
        first_in_batch: bool,
        store: &mut dyn BlobStore,
    ) -> Result<ModelId, ModelError> {
        let id = ModelId::generate();
        let data_key = format!("model_{}", id);
        store.put(&data_key, model.data)?;

        let thumbnail_key = match model.thumbnail {
            Some(bytes) => {
                let key = format!("thumb_{}", id);
                store.put(&key, bytes)?;
                Some(key)
            }
            None => None,
        };

        info!(id = %id, name = %model.name, "Added model");
        self.models.push(Model {
            id: id.clone(),
            name: model.name,
            data_key,
            thumbnail_key,
            settings: model.settings,
            components: Vec::new(),
        });

        if first_in_batch || self.selected.is_none() {
            self.selected = Some(id.clone());
        }
        Ok(id)
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn get(&self, id: &ModelId) -> Option<&Model> {
        self.models.iter().find(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn selected_id(&self) -> Option<&ModelId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Model> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: &ModelId) -> Result<&Model, ModelError> {
        let index = self
            .models
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| ModelError::NotFound(id.clone()))?;
        self.selected = Some(id.clone());
        debug!(id = %id, "Selected model");
        Ok(&self.models[index])
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn update(&mut self, id: &ModelId, update: ModelUpdate) -> Result<(), ModelError> {
        let model = self
            .models
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| ModelError::NotFound(id.clone()))?;

        if let Some(name) = update.name {
            model.name = name;
        }
        if let Some(settings) = update.settings {
            model.settings = settings;
        }
        if let Some(components) = update.components {
            model.components = components;
        }
        debug!(id = %id, "Updated model");
        Ok(())
    }

    /// Delete a model and its blobs. Returns false if the id is unknown.
    pub fn delete(&mut self, id: &ModelId, store: &mut dyn BlobStore) -> Result<bool, ModelError> {
        let Some(index) = self.models.iter().position(|m| &m.id == id) else {
            return Ok(false);
        };
        remove_blobs(&self.models[index], store)?;
        let model = self.models.remove(index);

        if self.selected.as_ref() == Some(id) {
            self.selected = self.models.first().map(|m| m.id.clone());
        }
        info!(id = %id, name = %model.name, "Deleted model");
        Ok(true)
    }

    /// Delete every model and its blobs. If a blob can't be removed, that
    /// model and every later one stay in the library.
    pub fn reset(&mut self, store: &mut dyn BlobStore) -> Result<(), ModelError> {
        let mut removed = 0;
        let result = self.models.iter().try_for_each(|model| {
            remove_blobs(model, store)?;
            removed += 1;
            Ok::<_, StoreError>(())
        });
        self.models.drain(..removed);
        if self
            .selected
            .as_ref()
            .is_some_and(|id| !self.models.iter().any(|m| &m.id == id))
        {
            self.selected = self.models.first().map(|m| m.id.clone());
        }
        result?;
        info!("Reset model library");
        Ok(())
    }

    pub fn model_data(&self, data_key: &str, store: &dyn BlobStore) -> Result<Vec<u8>, ModelError> {
        match store.get(data_key)? {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(ModelError::InvalidModelData(data_key.to_string())),
        }
    }

    pub fn thumbnail(&self, thumbnail_key: &str, store: &dyn BlobStore) -> Result<Vec<u8>, ModelError> {
        match store.get(thumbnail_key)? {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(ModelError::InvalidThumbnail(thumbnail_key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBlobStore, StickyBlobStore};

    fn new_model(name: &str) -> NewModel {
        NewModel {
            name: name.to_string(),
            data: b"glTF".to_vec(),
            thumbnail: Some(vec![1, 2]),
            settings: ModelSettings::default(),
        }
    }

    #[test]
    fn test_upload_selection() {
        let mut store = MemoryBlobStore::new();
        let mut library = ModelLibrary::new();

        let a = library.upload(new_model("a"), false, &mut store).unwrap();
        assert_eq!(library.selected_id(), Some(&a));

        // Not first in batch and something is selected
        let b = library.upload(new_model("b"), false, &mut store).unwrap();
        assert_eq!(library.selected_id(), Some(&a));

        // First of a new batch takes the selection
        let c = library.upload(new_model("c"), true, &mut store).unwrap();
        assert_eq!(library.selected_id(), Some(&c));

        let model = library.get(&b).unwrap();
        assert_eq!(model.data_key, format!("model_{}", b));
        assert_eq!(model.thumbnail_key.as_deref(), Some(format!("thumb_{}", b).as_str()));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn test_delete_reselects_first() {
        let mut store = MemoryBlobStore::new();
        let mut library = ModelLibrary::new();
        let a = library.upload(new_model("a"), true, &mut store).unwrap();
        let b = library.upload(new_model("b"), true, &mut store).unwrap();

        assert!(library.delete(&b, &mut store).unwrap());
        assert_eq!(library.selected_id(), Some(&a));
        assert_eq!(store.len(), 2);

        assert!(library.delete(&a, &mut store).unwrap());
        assert_eq!(library.selected_id(), None);
        assert!(store.is_empty());
        assert!(!library.delete(&a, &mut store).unwrap());
    }

    #[test]
    fn test_update_and_saved_zoom() {
        let mut store = MemoryBlobStore::new();
        let mut library = ModelLibrary::new();
        let id = library.upload(new_model("a"), true, &mut store).unwrap();
        assert_eq!(library.get(&id).unwrap().saved_zoom(), None);

        library
            .update(
                &id,
                ModelUpdate {
                    name: Some("renamed".to_string()),
                    settings: Some(ModelSettings {
                        camera: Some(CameraPatch::zoom(3.5)),
                        canvas: None,
                    }),
                    components: None,
                },
            )
            .unwrap();

        let model = library.get(&id).unwrap();
        assert_eq!(model.name, "renamed");
        assert_eq!(model.saved_zoom(), Some(3.5));

        let missing = ModelId("nope".to_string());
        assert!(matches!(
            library.update(&missing, ModelUpdate::default()),
            Err(ModelError::NotFound(_))
        ));
        assert!(matches!(library.select(&missing), Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_blob_accessors_and_reset() {
        let mut store = MemoryBlobStore::new();
        let mut library = ModelLibrary::new();
        let id = library.upload(new_model("a"), true, &mut store).unwrap();
        let model = library.get(&id).unwrap().clone();

        assert_eq!(library.model_data(&model.data_key, &store).unwrap(), b"glTF".to_vec());
        assert!(matches!(
            library.model_data("model_missing", &store),
            Err(ModelError::InvalidModelData(_))
        ));
        assert!(matches!(
            library.thumbnail("thumb_missing", &store),
            Err(ModelError::InvalidThumbnail(_))
        ));

        library.reset(&mut store).unwrap();
        assert!(library.is_empty());
        assert!(library.selected().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_failed_blob_removal_keeps_models() {
        let mut store = StickyBlobStore {
            inner: MemoryBlobStore::new(),
            sticky_key: String::new(),
        };
        let mut library = ModelLibrary::new();
        let a = library.upload(new_model("a"), true, &mut store).unwrap();
        let b = library.upload(new_model("b"), false, &mut store).unwrap();
        store.sticky_key = format!("thumb_{}", b);

        assert!(library.delete(&b, &mut store).is_err());
        assert_eq!(library.len(), 2);

        // "a" goes, "b" stays with its remaining blobs and takes the selection
        assert!(library.reset(&mut store).is_err());
        assert_eq!(library.len(), 1);
        assert!(library.get(&a).is_none());
        assert_eq!(library.selected_id(), Some(&b));
        assert!(store.contains(&format!("thumb_{}", b)));
    }

    #[test]
    fn test_fit_zoom() {
        // Square viewport: limited by the larger dimension
        let zoom = fit_zoom([10.0, 4.0, 2.0], (800.0, 800.0), FIT_PADDING).unwrap();
        assert!((zoom - 800.0 / 11.0).abs() < 1e-9);

        // Wide viewport: width term divides by aspect, so height governs
        let wide = fit_zoom([10.0, 10.0, 10.0], (1600.0, 800.0), 1.0).unwrap();
        assert!((wide - 80.0).abs() < 1e-9);

        assert_eq!(fit_zoom([0.0, 0.0, 0.0], (100.0, 100.0), 1.1), None);
    }
}
