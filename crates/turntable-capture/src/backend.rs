//! Interfaces to the renderer and model source driven during capture

use thiserror::Error;
use tracing::debug;
use turntable_core::{ModelError, ModelId, ModelLibrary};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Frame capture failed: {0}")]
    Capture(String),
}

/// The live camera and renderer.
///
/// Calls are synchronous; `capture_frame` returns the last rendered frame
/// as PNG bytes.
pub trait Renderer {
    fn position(&self) -> [f64; 3];
    fn set_position(&mut self, position: [f64; 3]);
    fn zoom(&self) -> f64;
    fn set_zoom(&mut self, zoom: f64);
    fn look_at(&mut self, target: [f64; 3]);
    fn update_projection(&mut self);
    fn render(&mut self) -> Result<(), RenderError>;
    fn capture_frame(&mut self) -> Result<Vec<u8>, RenderError>;

    /// Enable or disable user camera input (orbit, pan, zoom)
    fn set_controls_enabled(&mut self, _enabled: bool) {}
}

/// What the orchestrator needs to know about a model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRef {
    pub id: ModelId,
    pub name: String,
    /// Saved camera zoom
    pub zoom: Option<f64>,
}

/// Source of the model list and owner of the current selection.
///
/// Selecting a model is expected to load its geometry and saved view.
pub trait ModelProvider {
    fn models(&self) -> Vec<ModelRef>;
    fn select(&mut self, id: &ModelId) -> Result<(), ModelError>;
    fn current_selection(&self) -> Option<ModelRef>;

    fn clear_selection(&mut self) {}
}

fn model_ref(model: &turntable_core::Model) -> ModelRef {
    ModelRef {
        id: model.id.clone(),
        name: model.name.clone(),
        zoom: model.saved_zoom(),
    }
}

impl ModelProvider for ModelLibrary {
    fn models(&self) -> Vec<ModelRef> {
        ModelLibrary::models(self).iter().map(model_ref).collect()
    }

    fn select(&mut self, id: &ModelId) -> Result<(), ModelError> {
        ModelLibrary::select(self, id)?;
        Ok(())
    }

    fn current_selection(&self) -> Option<ModelRef> {
        self.selected().map(model_ref)
    }

    fn clear_selection(&mut self) {
        debug!("Cleared model selection");
        ModelLibrary::clear_selection(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turntable_core::{CameraPatch, MemoryBlobStore, ModelSettings, NewModel};

    #[test]
    fn test_library_as_provider() {
        let mut store = MemoryBlobStore::new();
        let mut library = ModelLibrary::new();
        let a = library
            .upload(
                NewModel {
                    name: "a".to_string(),
                    data: vec![1],
                    thumbnail: None,
                    settings: ModelSettings {
                        camera: Some(CameraPatch::zoom(4.0)),
                        canvas: None,
                    },
                },
                true,
                &mut store,
            )
            .unwrap();
        let b = library
            .upload(
                NewModel {
                    name: "b".to_string(),
                    data: vec![2],
                    ..Default::default()
                },
                false,
                &mut store,
            )
            .unwrap();

        let provider: &mut dyn ModelProvider = &mut library;
        let refs = provider.models();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].zoom, Some(4.0));
        assert_eq!(refs[1].zoom, None);

        provider.select(&b).unwrap();
        assert_eq!(provider.current_selection().map(|m| m.id), Some(b));
        provider.clear_selection();
        assert!(provider.current_selection().is_none());
        provider.select(&a).unwrap();
        assert_eq!(provider.current_selection().map(|m| m.name), Some("a".to_string()));
    }
}
